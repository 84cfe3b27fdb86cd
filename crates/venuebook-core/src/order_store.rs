//! # Order Store
//!
//! Owns every resting order, grouped per asset into an [`OrderBook`], and
//! keeps an id index so fills and cancels never scan the books.
//!
//! The store is the only place `filled` is mutated. Each mutation returns a
//! [`PriceLevelDelta`] describing the touched level after the change, which
//! the broadcast layer forwards as-is.

use std::collections::{HashMap, HashSet};

use venuebook_types::{
    AssetId, Order, OrderId, OrderSide, Price, PriceLevelDelta, Quantity, Result, VenuebookError,
};

use crate::orderbook::OrderBook;

/// Where a resting order lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLocation {
    pub asset: AssetId,
    pub side: OrderSide,
    pub price: Price,
}

/// Outcome of [`OrderStore::apply_fill`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillResult {
    /// Level size after the fill (and removal, if completed).
    pub delta: PriceLevelDelta,
    /// `quantity - filled` after the fill.
    pub remaining: Quantity,
    /// `true` when the fill completed the order and it left the book.
    pub completed: bool,
}

/// Outcome of [`OrderStore::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// All resting orders across all assets.
#[derive(Debug, Default)]
pub struct OrderStore {
    books: HashMap<AssetId, OrderBook>,
    index: HashMap<OrderId, OrderLocation>,
    /// Ids that were cancelled or completely filled. Ids are never reused.
    retired: HashSet<OrderId>,
    next_sequence: u64,
}

impl OrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =================================================================
    // Mutations
    // =================================================================

    /// Add a resting order behind every order already at its price.
    ///
    /// `filled` may be non-zero when loading an on-chain snapshot, but must
    /// be strictly below `quantity`.
    ///
    /// # Errors
    ///
    /// - `DuplicateOrder` if the id is resting, or has already been cancelled
    ///   or completely filled.
    /// - `InvalidOrder` for a zero quantity or an already-filled order.
    pub fn insert_order(&mut self, mut order: Order) -> Result<PriceLevelDelta> {
        if self.index.contains_key(&order.id) || self.retired.contains(&order.id) {
            return Err(VenuebookError::DuplicateOrder(order.id));
        }
        if order.quantity.is_zero() {
            return Err(VenuebookError::InvalidOrder {
                order_id: order.id,
                reason: "quantity must be positive".into(),
            });
        }
        if order.is_filled() {
            return Err(VenuebookError::InvalidOrder {
                order_id: order.id,
                reason: format!("filled {} is not below quantity {}", order.filled, order.quantity),
            });
        }

        order.sequence = self.next_sequence;
        self.next_sequence += 1;

        let location = OrderLocation {
            asset: order.asset.clone(),
            side: order.side,
            price: order.price,
        };

        tracing::debug!(
            order = %order.id,
            asset = %order.asset,
            side = %order.side,
            price = %order.price,
            qty = %order.quantity,
            "Order inserted"
        );

        self.index.insert(order.id.clone(), location.clone());
        let book = self
            .books
            .entry(location.asset.clone())
            .or_insert_with(|| OrderBook::new(location.asset.clone()));
        book.push(order);

        Ok(self.delta_for(&location))
    }

    /// Record a confirmed fill. Removes the order once fully filled.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if the order is not resting.
    /// - `InvalidFill` if `filled + fill > quantity`; the order is untouched.
    pub fn apply_fill(&mut self, order_id: &OrderId, fill: Quantity) -> Result<FillResult> {
        let location = self.location_or_not_found(order_id)?;
        let order = self
            .books
            .get_mut(&location.asset)
            .and_then(|book| book.level_mut(location.side, location.price))
            .and_then(|level| level.get_mut(order_id))
            .ok_or_else(|| VenuebookError::OrderNotFound(order_id.clone()))?;

        let remaining = order.remaining();
        if fill > remaining {
            return Err(VenuebookError::InvalidFill {
                order_id: order_id.clone(),
                fill,
                remaining,
            });
        }

        order.filled = order.filled.saturating_add(fill);
        let remaining = order.remaining();
        let completed = order.is_filled();

        tracing::debug!(
            order = %order_id,
            fill = %fill,
            remaining = %remaining,
            "Fill applied"
        );

        if completed {
            self.detach(order_id, &location);
        }

        Ok(FillResult {
            delta: self.delta_for(&location),
            remaining,
            completed,
        })
    }

    /// Cancel a resting order.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` if the order is not resting (e.g. already cancelled).
    pub fn remove_order(&mut self, order_id: &OrderId) -> Result<(Order, PriceLevelDelta)> {
        let location = self.location_or_not_found(order_id)?;
        let order = self
            .detach(order_id, &location)
            .ok_or_else(|| VenuebookError::OrderNotFound(order_id.clone()))?;

        tracing::debug!(order = %order_id, asset = %location.asset, "Order removed");

        Ok((order, self.delta_for(&location)))
    }

    /// Replace the whole store with a snapshot of active orders.
    ///
    /// Orders are inserted in the given order; invalid ones are skipped.
    /// The snapshot is authoritative, so previously retired ids are forgotten.
    pub fn load(&mut self, orders: impl IntoIterator<Item = Order>) -> LoadReport {
        self.clear();
        let mut report = LoadReport::default();
        for order in orders {
            let order_id = order.id.clone();
            match self.insert_order(order) {
                Ok(_) => report.loaded += 1,
                Err(err) => {
                    tracing::warn!(order = %order_id, error = %err, "Skipping order in snapshot");
                    report.skipped += 1;
                }
            }
        }
        tracing::info!(
            loaded = report.loaded,
            skipped = report.skipped,
            assets = self.books.len(),
            "Active orders loaded"
        );
        report
    }

    /// Drop every order and every retired id. Sequence numbering continues.
    pub fn clear(&mut self) {
        self.books.clear();
        self.index.clear();
        self.retired.clear();
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Σ `(quantity - filled)` at one exact price and side. Holds are not
    /// subtracted.
    #[must_use]
    pub fn price_level_size(&self, asset: &AssetId, price: Price, side: OrderSide) -> Quantity {
        self.books
            .get(asset)
            .map_or(Quantity::ZERO, |book| book.level_size(side, price))
    }

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        let location = self.index.get(order_id)?;
        self.books
            .get(&location.asset)?
            .level(location.side, location.price)?
            .get(order_id)
    }

    /// `quantity - filled`, or `None` if the order is not resting.
    #[must_use]
    pub fn remaining(&self, order_id: &OrderId) -> Option<Quantity> {
        self.get(order_id).map(Order::remaining)
    }

    #[must_use]
    pub fn location(&self, order_id: &OrderId) -> Option<&OrderLocation> {
        self.index.get(order_id)
    }

    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// `true` once the order was cancelled or completely filled.
    #[must_use]
    pub fn is_retired(&self, order_id: &OrderId) -> bool {
        self.retired.contains(order_id)
    }

    #[must_use]
    pub fn book(&self, asset: &AssetId) -> Option<&OrderBook> {
        self.books.get(asset)
    }

    /// Assets that have (or had) a book, in no particular order.
    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.books.keys()
    }

    /// Every resting order, book by book, bids before asks.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.books
            .values()
            .flat_map(|book| book.orders(OrderSide::Buy).chain(book.orders(OrderSide::Sell)))
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn location_or_not_found(&self, order_id: &OrderId) -> Result<OrderLocation> {
        self.index
            .get(order_id)
            .cloned()
            .ok_or_else(|| VenuebookError::OrderNotFound(order_id.clone()))
    }

    fn detach(&mut self, order_id: &OrderId, location: &OrderLocation) -> Option<Order> {
        self.index.remove(order_id);
        self.retired.insert(order_id.clone());
        self.books
            .get_mut(&location.asset)?
            .remove(location.side, location.price, order_id)
    }

    fn delta_for(&self, location: &OrderLocation) -> PriceLevelDelta {
        PriceLevelDelta {
            asset: location.asset.clone(),
            side: location.side,
            price: location.price,
            size: self.price_level_size(&location.asset, location.price, location.side),
        }
    }
}
