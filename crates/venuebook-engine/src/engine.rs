//! # Venue Engine
//!
//! One explicit context per process (or per test) holding the order store,
//! the reservation ledger and the configuration. All mutation goes through
//! `&mut self`; hosting code serializes writers by wrapping the engine in a
//! [`SharedEngine`](crate::pipeline::SharedEngine).

use chrono::{DateTime, Utc};
use venuebook_core::{HoldView, LoadReport, OrderStore, ReservationLedger, aggregator, matcher};
use venuebook_types::{
    Address, AssetId, BookSnapshot, ChainEvent, EngineConfig, Order, OrderId, OrderSide, Price,
    PriceLevelDelta, Quantity, ReleasedLevel, ReservationTicket, Result, TradePlan,
    VenuebookError,
};

/// Order store + reservation ledger + configuration.
#[derive(Debug)]
pub struct VenueEngine {
    config: EngineConfig,
    store: OrderStore,
    ledger: ReservationLedger,
}

impl VenueEngine {
    /// Create an empty engine.
    ///
    /// # Errors
    ///
    /// `Configuration` if the config fails validation.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: OrderStore::new(),
            ledger: ReservationLedger::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    #[must_use]
    pub fn ledger(&self) -> &ReservationLedger {
        &self.ledger
    }

    // =================================================================
    // Chain events (writer side)
    // =================================================================

    /// Apply one confirmed chain fact and return the touched level.
    ///
    /// Fills reconcile the ledger: the taker's holds are consumed and
    /// leftover holds are trimmed to the new remaining quantity. A fully
    /// filled or cancelled order loses all its holds.
    ///
    /// # Errors
    ///
    /// Whatever the store reports: `DuplicateOrder` / `InvalidOrder` on
    /// creation, `OrderNotFound` / `InvalidFill` on fills, `OrderNotFound`
    /// on cancels. Failed events change nothing.
    pub fn apply_chain_event(&mut self, event: &ChainEvent) -> Result<PriceLevelDelta> {
        match event {
            ChainEvent::OrderCreated { order_id, .. } => {
                let order = event
                    .to_order()
                    .ok_or_else(|| VenuebookError::InvalidOrder {
                        order_id: order_id.clone(),
                        reason: "creation event carries no order".into(),
                    })?;
                self.store.insert_order(order)
            }
            ChainEvent::OrderFilled {
                order_id,
                fill_quantity,
                taker,
                ..
            } => {
                let fill = self.store.apply_fill(order_id, *fill_quantity)?;
                if fill.completed {
                    self.ledger.release_order(order_id);
                } else {
                    self.ledger.consume_fill(
                        order_id,
                        taker.as_ref(),
                        *fill_quantity,
                        fill.remaining,
                    );
                }
                Ok(fill.delta)
            }
            ChainEvent::OrderCancelled { order_id, .. } => {
                let (_, delta) = self.store.remove_order(order_id)?;
                self.ledger.release_order(order_id);
                Ok(delta)
            }
        }
    }

    /// Replace the book with an on-chain snapshot of active orders.
    /// Existing holds are dropped.
    pub fn load_active_orders(&mut self, orders: impl IntoIterator<Item = Order>) -> LoadReport {
        self.ledger.clear();
        self.store.load(orders)
    }

    // =================================================================
    // Takers
    // =================================================================

    /// Plan a taker trade against the current book, holds excluded.
    ///
    /// # Errors
    ///
    /// `ArithmeticOverflow` if the notional total is unrepresentable.
    pub fn plan_trade(
        &self,
        asset: &AssetId,
        side: OrderSide,
        quantity: Quantity,
        limit_price: Price,
    ) -> Result<Option<TradePlan>> {
        matcher::plan_trade(&self.store, &self.ledger, asset, side, quantity, limit_price)
    }

    /// Hold `plan` for the configured duration starting now.
    ///
    /// # Errors
    ///
    /// See [`ReservationLedger::reserve`].
    pub fn reserve(&mut self, plan: TradePlan, holder: &Address) -> Result<ReservationTicket> {
        self.reserve_at(plan, holder, Utc::now())
    }

    /// [`Self::reserve`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`ReservationLedger::reserve`].
    pub fn reserve_at(
        &mut self,
        plan: TradePlan,
        holder: &Address,
        now: DateTime<Utc>,
    ) -> Result<ReservationTicket> {
        let hold = self.config.hold_duration();
        let ticket = self.ledger.reserve(&self.store, plan, holder, hold, now)?;
        tracing::info!(
            reservation = %ticket.reservation_id,
            holder = %holder,
            asset = %ticket.plan.asset,
            legs = ticket.plan.len(),
            "Reservation accepted"
        );
        Ok(ticket)
    }

    /// Release holds that expired before `now`.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<ReleasedLevel> {
        self.ledger.sweep_expired(&self.store, now)
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn get_book(&self, asset: &AssetId) -> BookSnapshot {
        aggregator::snapshot(&self.store, asset)
    }

    #[must_use]
    pub fn get_book_depth(&self, asset: &AssetId, depth: usize) -> BookSnapshot {
        aggregator::snapshot_depth(&self.store, asset, depth)
    }

    #[must_use]
    pub fn currently_held(&self, order_id: &OrderId) -> Quantity {
        self.ledger.currently_held(order_id)
    }

    #[must_use]
    pub fn price_level_size(&self, asset: &AssetId, price: Price, side: OrderSide) -> Quantity {
        self.store.price_level_size(asset, price, side)
    }

    /// Level depth a new taker would see (holds subtracted).
    #[must_use]
    pub fn available_level_size(&self, asset: &AssetId, price: Price, side: OrderSide) -> Quantity {
        self.ledger
            .available_level_size(&self.store, asset, price, side)
    }
}
