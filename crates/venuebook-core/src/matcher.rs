//! # Matcher
//!
//! Greedy price-time planning for a taker against the opposite side of one
//! asset's book. Planning is read-only: it never mutates the store or the
//! ledger, so it can run under a shared lock.
//!
//! ## Algorithm
//!
//! ```text
//! remaining = quantity
//! for level in opposite side, best price first:
//!     if level.price violates the limit: stop
//!     for order in level, oldest first:
//!         available = remaining_qty(order) - held(order)
//!         if available == 0: skip
//!         fill = min(remaining, available)
//!         remaining -= fill
//!         if remaining == 0: stop
//! ```
//!
//! The limit check happens once per level: levels are sorted, so the first
//! level past the limit ends the walk.

use venuebook_types::{
    AssetId, Notional, OrderSide, PlannedFill, Price, Quantity, Result, TradePlan, VenuebookError,
};

use crate::order_store::OrderStore;
use crate::reservation::HoldView;

/// Plan a buy of `quantity` paying at most `max_price`, against asks.
///
/// # Errors
///
/// `ArithmeticOverflow` if the notional total leaves the representable range.
pub fn plan_buy<H: HoldView + ?Sized>(
    store: &OrderStore,
    holds: &H,
    asset: &AssetId,
    quantity: Quantity,
    max_price: Price,
) -> Result<Option<TradePlan>> {
    plan_trade(store, holds, asset, OrderSide::Buy, quantity, max_price)
}

/// Plan a sell of `quantity` receiving at least `min_price`, against bids.
///
/// # Errors
///
/// `ArithmeticOverflow` if the notional total leaves the representable range.
pub fn plan_sell<H: HoldView + ?Sized>(
    store: &OrderStore,
    holds: &H,
    asset: &AssetId,
    quantity: Quantity,
    min_price: Price,
) -> Result<Option<TradePlan>> {
    plan_trade(store, holds, asset, OrderSide::Sell, quantity, min_price)
}

/// Walk the side opposite to `side` and build a plan.
///
/// Returns `Ok(None)` when nothing can be filled (no liquidity, nothing
/// within the limit, everything held, or a zero request). A partial plan
/// reports the uncovered part in `unfilled`.
///
/// # Errors
///
/// `ArithmeticOverflow` if the notional total leaves the representable range.
pub fn plan_trade<H: HoldView + ?Sized>(
    store: &OrderStore,
    holds: &H,
    asset: &AssetId,
    side: OrderSide,
    quantity: Quantity,
    limit_price: Price,
) -> Result<Option<TradePlan>> {
    if quantity.is_zero() {
        return Ok(None);
    }
    let Some(book) = store.book(asset) else {
        return Ok(None);
    };

    let mut remaining = quantity;
    let mut fills = Vec::new();
    let mut total_quote = Notional::ZERO;

    'levels: for level in book.levels(side.opposite()) {
        let beyond_limit = match side {
            OrderSide::Buy => level.price > limit_price,
            OrderSide::Sell => level.price < limit_price,
        };
        if beyond_limit {
            break;
        }

        for order in &level.orders {
            let available = holds.available(order);
            if available.is_zero() {
                continue;
            }
            let fill = remaining.min(available);
            total_quote = total_quote
                .checked_add(fill.full_mul(order.price))
                .ok_or(VenuebookError::ArithmeticOverflow {
                    context: "summing plan notional",
                })?;
            remaining = remaining.saturating_sub(fill);
            fills.push(PlannedFill {
                order_id: order.id.clone(),
                quantity: fill,
                price: order.price,
            });
            if remaining.is_zero() {
                break 'levels;
            }
        }
    }

    if fills.is_empty() {
        tracing::debug!(asset = %asset, side = %side, qty = %quantity, "No liquidity");
        return Ok(None);
    }

    let total_base = quantity.saturating_sub(remaining);
    tracing::debug!(
        asset = %asset,
        side = %side,
        legs = fills.len(),
        base = %total_base,
        quote = %total_quote,
        unfilled = %remaining,
        "Trade planned"
    );

    Ok(Some(TradePlan {
        asset: asset.clone(),
        side,
        fills,
        total_quote,
        total_base,
        requested: quantity,
        unfilled: remaining,
    }))
}
