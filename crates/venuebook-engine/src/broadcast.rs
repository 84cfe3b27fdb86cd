//! Book updates pushed to subscribers.
//!
//! The engine never waits on subscribers: publishing is fire-and-forget and
//! a lagging receiver loses the oldest updates (tokio `broadcast` semantics).
//! Subscribers that fall behind should re-fetch a full snapshot.

use serde::Serialize;
use tokio::sync::broadcast;
use venuebook_types::{AssetId, BookSnapshot, PriceLevelDelta, ReleasedLevel};

/// One update for subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookUpdate {
    /// A single level changed after a chain event.
    Level(PriceLevelDelta),
    /// An expiry sweep returned held quantity to these levels.
    Released { levels: Vec<ReleasedLevel> },
    /// Full aggregated book of one asset.
    Snapshot { asset: AssetId, book: BookSnapshot },
}

/// Destination for book updates.
pub trait BroadcastSink: Send + Sync {
    fn publish(&self, update: BookUpdate);
}

/// Fan-out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: broadcast::Sender<BookUpdate>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BookUpdate> {
        self.tx.subscribe()
    }
}

impl BroadcastSink for ChannelSink {
    fn publish(&self, update: BookUpdate) {
        // Err only means nobody is listening right now.
        if self.tx.send(update).is_err() {
            tracing::trace!("Book update dropped: no subscribers");
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl BroadcastSink for NullSink {
    fn publish(&self, _update: BookUpdate) {}
}

#[cfg(test)]
mod tests {
    use venuebook_types::*;

    use super::*;

    fn delta() -> PriceLevelDelta {
        PriceLevelDelta {
            asset: AssetId::new("1"),
            side: OrderSide::Sell,
            price: Price::from_u64(100),
            size: Quantity::from_u64(7),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_updates() {
        let sink = ChannelSink::new(8);
        let mut rx = sink.subscribe();
        sink.publish(BookUpdate::Level(delta()));

        let update = rx.recv().await.unwrap();
        assert_eq!(update, BookUpdate::Level(delta()));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let sink = ChannelSink::new(8);
        sink.publish(BookUpdate::Level(delta()));
        NullSink.publish(BookUpdate::Level(delta()));

        // Updates published before subscribing are not replayed.
        let mut late = sink.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn snapshot_update_wire_shape() {
        let book = BookSnapshot {
            bids: vec![],
            asks: vec![LevelEntry {
                price: Price::from_u64(100),
                size: Quantity::from_u64(7),
            }],
        };
        let json = serde_json::to_value(BookUpdate::Snapshot {
            asset: AssetId::new("1"),
            book,
        })
        .unwrap();
        assert_eq!(json["type"], "snapshot");
        assert_eq!(json["asset"], "1");
        assert_eq!(json["book"]["asks"][0]["size"], "7");
    }

    #[test]
    fn level_update_wire_shape() {
        let json = serde_json::to_value(BookUpdate::Level(delta())).unwrap();
        assert_eq!(json["type"], "level");
        assert_eq!(json["side"], "sell");
        assert_eq!(json["size"], "7");
    }
}
