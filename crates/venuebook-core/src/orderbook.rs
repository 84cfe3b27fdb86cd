//! The order book for a single asset.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<Price>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<Price, PriceLevel>` -- lowest price first
//!
//! Within a level orders keep their arrival order, so iterating levels
//! front to back yields strict price-then-time priority without ever
//! re-sorting. Empty levels are dropped; the book itself is never dropped.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use venuebook_types::{AssetId, Order, OrderId, OrderSide, Price, Quantity};

use crate::price_level::PriceLevel;

/// The order book for a single asset.
#[derive(Debug)]
pub struct OrderBook {
    /// The asset this book serves.
    pub asset: AssetId,
    /// Buy side: highest price first (`Reverse` key).
    bids: BTreeMap<Reverse<Price>, PriceLevel>,
    /// Sell side: lowest price first.
    asks: BTreeMap<Price, PriceLevel>,
}

impl OrderBook {
    /// Create a new empty order book for the given asset.
    #[must_use]
    pub fn new(asset: AssetId) -> Self {
        Self {
            asset,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    // =================================================================
    // Mutation (driven by OrderStore only)
    // =================================================================

    /// Append an order behind all existing orders at its price.
    pub(crate) fn push(&mut self, order: Order) {
        let price = order.price;
        match order.side {
            OrderSide::Buy => self
                .bids
                .entry(Reverse(price))
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(order),
            OrderSide::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(order),
        }
    }

    /// Remove an order, dropping its level if it becomes empty.
    pub(crate) fn remove(&mut self, side: OrderSide, price: Price, order_id: &OrderId) -> Option<Order> {
        match side {
            OrderSide::Buy => {
                let level = self.bids.get_mut(&Reverse(price))?;
                let order = level.remove_order(order_id)?;
                if level.is_empty() {
                    self.bids.remove(&Reverse(price));
                }
                Some(order)
            }
            OrderSide::Sell => {
                let level = self.asks.get_mut(&price)?;
                let order = level.remove_order(order_id)?;
                if level.is_empty() {
                    self.asks.remove(&price);
                }
                Some(order)
            }
        }
    }

    pub(crate) fn level_mut(&mut self, side: OrderSide, price: Price) -> Option<&mut PriceLevel> {
        match side {
            OrderSide::Buy => self.bids.get_mut(&Reverse(price)),
            OrderSide::Sell => self.asks.get_mut(&price),
        }
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn level(&self, side: OrderSide, price: Price) -> Option<&PriceLevel> {
        match side {
            OrderSide::Buy => self.bids.get(&Reverse(price)),
            OrderSide::Sell => self.asks.get(&price),
        }
    }

    /// Σ `(quantity - filled)` at one exact price, zero if the level is empty.
    #[must_use]
    pub fn level_size(&self, side: OrderSide, price: Price) -> Quantity {
        self.level(side, price)
            .map_or(Quantity::ZERO, PriceLevel::total_remaining)
    }

    /// Best (highest) bid price, or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best (lowest) ask price, or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Spread = best_ask - best_bid. `None` if either side is empty or the
    /// book is crossed.
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => ask.checked_sub(bid),
            _ => None,
        }
    }

    /// Total number of orders on both sides.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.bids.values().map(PriceLevel::len).sum::<usize>()
            + self.asks.values().map(PriceLevel::len).sum::<usize>()
    }

    /// Number of distinct bid price levels.
    #[must_use]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask price levels.
    #[must_use]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    // =================================================================
    // Iteration (for the matcher and aggregator)
    // =================================================================

    /// Iterate bid levels from best (highest) to worst.
    pub fn bid_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.bids.values()
    }

    /// Iterate ask levels from best (lowest) to worst.
    pub fn ask_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.asks.values()
    }

    /// Levels of one side, best first.
    pub fn levels(&self, side: OrderSide) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match side {
            OrderSide::Buy => Box::new(self.bid_levels()),
            OrderSide::Sell => Box::new(self.ask_levels()),
        }
    }

    /// Every resting order of one side in priority order.
    pub fn orders(&self, side: OrderSide) -> impl Iterator<Item = &Order> {
        self.levels(side).flat_map(|level| level.orders.iter())
    }
}
