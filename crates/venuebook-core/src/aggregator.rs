//! Price-level aggregation of a book.
//!
//! Sizes are Σ `(quantity - filled)` per price; holds are ignored, so the
//! snapshot shows what is on chain rather than what a taker could get now.

use venuebook_types::{AssetId, BookSnapshot, LevelEntry, OrderSide};

use crate::order_store::OrderStore;
use crate::orderbook::OrderBook;

/// Full aggregated book for `asset`. Unknown assets yield empty sides.
#[must_use]
pub fn snapshot(store: &OrderStore, asset: &AssetId) -> BookSnapshot {
    snapshot_depth(store, asset, usize::MAX)
}

/// Aggregated book truncated to the best `depth` levels per side.
#[must_use]
pub fn snapshot_depth(store: &OrderStore, asset: &AssetId, depth: usize) -> BookSnapshot {
    let Some(book) = store.book(asset) else {
        return BookSnapshot::default();
    };
    BookSnapshot {
        bids: side_entries(book, OrderSide::Buy, depth),
        asks: side_entries(book, OrderSide::Sell, depth),
    }
}

fn side_entries(book: &OrderBook, side: OrderSide, depth: usize) -> Vec<LevelEntry> {
    book.levels(side)
        .map(|level| LevelEntry {
            price: level.price,
            size: level.total_remaining(),
        })
        .filter(|entry| !entry.size.is_zero())
        .take(depth)
        .collect()
}
