//! Balance checks ahead of reservations.
//!
//! The core never talks to the chain. A taker flow first plans under the
//! read lock, then asks the [`BalanceOracle`] whether the holder can fund
//! the plan (no lock held), and only then takes the write lock to reserve.
//!
//! Between the balance check and `reserve` the book can move: orders may
//! fill, cancel or be reserved by someone else. `reserve` re-validates
//! every leg against the book as it is at that moment, so a stale plan is
//! rejected rather than over-reserving. Balances are not re-checked; the
//! on-chain settlement is the final authority on funds.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use venuebook_types::{
    Address, Amount, AssetId, Notional, OrderSide, Price, Quantity, ReservationTicket, Result,
    TradePlan, VenuebookError,
};

use crate::pipeline::SharedEngine;

/// Read-only view of on-chain balances.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Quote-currency balance of `address`.
    async fn balance_of(&self, address: &Address) -> Result<Amount>;

    /// Base-asset balance of `address` for `asset`.
    async fn asset_balance_of(&self, address: &Address, asset: &AssetId) -> Result<Amount>;
}

/// In-memory balances, for tests and offline replays.
#[derive(Debug, Default)]
pub struct FixedBalances {
    quote: RwLock<HashMap<Address, Amount>>,
    assets: RwLock<HashMap<(Address, AssetId), Amount>>,
}

impl FixedBalances {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// `Io` if the balance table is poisoned.
    pub fn set_balance(&self, address: Address, amount: Amount) -> Result<()> {
        self.quote
            .write()
            .map_err(|_| poisoned())?
            .insert(address, amount);
        Ok(())
    }

    /// # Errors
    ///
    /// `Io` if the balance table is poisoned.
    pub fn set_asset_balance(
        &self,
        address: Address,
        asset: AssetId,
        amount: Amount,
    ) -> Result<()> {
        self.assets
            .write()
            .map_err(|_| poisoned())?
            .insert((address, asset), amount);
        Ok(())
    }
}

fn poisoned() -> VenuebookError {
    VenuebookError::Io("balance table poisoned".into())
}

#[async_trait]
impl BalanceOracle for FixedBalances {
    async fn balance_of(&self, address: &Address) -> Result<Amount> {
        let quote = self.quote.read().map_err(|_| poisoned())?;
        Ok(quote.get(address).copied().unwrap_or(Amount::ZERO))
    }

    async fn asset_balance_of(&self, address: &Address, asset: &AssetId) -> Result<Amount> {
        let assets = self.assets.read().map_err(|_| poisoned())?;
        Ok(assets
            .get(&(address.clone(), asset.clone()))
            .copied()
            .unwrap_or(Amount::ZERO))
    }
}

/// Taker-facing flow: plan, check funds, reserve.
pub struct TradeDesk<O> {
    engine: SharedEngine,
    oracle: O,
}

impl<O: BalanceOracle> TradeDesk<O> {
    pub fn new(engine: SharedEngine, oracle: O) -> Self {
        Self { engine, oracle }
    }

    #[must_use]
    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Plan without reserving.
    ///
    /// # Errors
    ///
    /// `ArithmeticOverflow` from the matcher.
    pub async fn quote(
        &self,
        asset: &AssetId,
        side: OrderSide,
        quantity: Quantity,
        limit_price: Price,
    ) -> Result<Option<TradePlan>> {
        self.engine
            .read()
            .await
            .plan_trade(asset, side, quantity, limit_price)
    }

    /// Plan, verify `holder` can fund it, then reserve.
    ///
    /// Returns `Ok(None)` when there is no liquidity within the limit.
    ///
    /// # Errors
    ///
    /// - `InsufficientBalance` if the holder cannot fund the plan. A buyer
    ///   needs `total_quote` in quote currency, a seller `total_base` of
    ///   the asset.
    /// - Any `reserve` error if the book moved since planning.
    pub async fn plan_and_reserve(
        &self,
        holder: &Address,
        asset: &AssetId,
        side: OrderSide,
        quantity: Quantity,
        limit_price: Price,
    ) -> Result<Option<ReservationTicket>> {
        let Some(plan) = self.quote(asset, side, quantity, limit_price).await? else {
            return Ok(None);
        };

        let (needed, available) = match side {
            OrderSide::Buy => (plan.total_quote, self.oracle.balance_of(holder).await?),
            OrderSide::Sell => (
                Notional::from(plan.total_base),
                self.oracle.asset_balance_of(holder, asset).await?,
            ),
        };
        if Notional::from(available) < needed {
            tracing::warn!(
                holder = %holder,
                needed = %needed,
                available = %available,
                "Reservation refused: insufficient balance"
            );
            return Err(VenuebookError::InsufficientBalance { needed, available });
        }

        let ticket = self.engine.write().await.reserve(plan, holder)?;
        Ok(Some(ticket))
    }
}
