//! Book projections handed to subscribers.
//!
//! Every mutating operation returns enough information to build an
//! incremental update, so the broadcast layer never has to re-aggregate the
//! whole book after a single event.

use serde::{Deserialize, Serialize};

use crate::{AssetId, OrderSide, Price, Quantity};

/// Aggregate size of one price level after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevelDelta {
    pub asset: AssetId,
    pub side: OrderSide,
    pub price: Price,
    /// Σ `(quantity - filled)` of resting orders at this level.
    pub size: Quantity,
}

/// A price level touched by an expiry sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasedLevel {
    pub asset: AssetId,
    pub side: OrderSide,
    pub price: Price,
    /// Book depth at the level (reservations ignored).
    pub size: Quantity,
    /// Depth still available to new takers after the sweep.
    pub available: Quantity,
    /// Quantity released back at this level by the sweep.
    pub released: Quantity,
}

/// One row of an aggregated book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEntry {
    pub price: Price,
    pub size: Quantity,
}

/// Price-level view of one asset's book. Both sides are best-first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub bids: Vec<LevelEntry>,
    pub asks: Vec<LevelEntry>,
}

impl BookSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<&LevelEntry> {
        self.bids.first()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<&LevelEntry> {
        self.asks.first()
    }

    /// Sum of sizes on one side.
    #[must_use]
    pub fn side_total(&self, side: OrderSide) -> Quantity {
        let levels = match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        };
        levels
            .iter()
            .fold(Quantity::ZERO, |acc, l| acc.saturating_add(l.size))
    }
}
