//! # Event Pipeline
//!
//! Hosts a [`VenueEngine`] inside tokio with a single logical writer.
//!
//! ```text
//! chain source ──mpsc──▶ event consumer ──write lock──▶ VenueEngine
//!                                                       ▲      │
//! interval ─────────────▶ sweeper ──────write lock──────┘      │
//!                                                              ▼
//! takers ───────────────────────────────read lock──▶ plan / get_book
//!                                                 BroadcastSink ◀── deltas
//! ```
//!
//! Every writer holds the write lock for exactly one engine operation, so
//! readers never see a half-applied mutation. Events are applied strictly
//! in channel order by one task.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use venuebook_types::{
    AssetId, BookSnapshot, ChainEvent, EngineConfig, OverfillPolicy, Result, VenuebookError,
};

use crate::broadcast::{BookUpdate, BroadcastSink};
use crate::engine::VenueEngine;

/// The engine as shared between the consumer, the sweeper and readers.
pub type SharedEngine = Arc<RwLock<VenueEngine>>;

#[must_use]
pub fn shared(engine: VenueEngine) -> SharedEngine {
    Arc::new(RwLock::new(engine))
}

/// Bounded channel for chain events, sized from config.
#[must_use]
pub fn event_channel(config: &EngineConfig) -> (mpsc::Sender<ChainEvent>, mpsc::Receiver<ChainEvent>) {
    mpsc::channel(config.event_channel_capacity)
}

/// Send `events` into the consumer channel in order.
///
/// # Errors
///
/// `ChannelClosed` once the consumer is gone (e.g. halted on an over-fill).
/// Events after that point are not sent.
pub async fn forward_events(
    tx: &mpsc::Sender<ChainEvent>,
    events: impl IntoIterator<Item = ChainEvent>,
) -> Result<usize> {
    let mut sent = 0;
    for event in events {
        if tx.send(event).await.is_err() {
            tracing::warn!(sent, "Event consumer gone, forwarding stopped");
            return Err(VenuebookError::ChannelClosed("chain events"));
        }
        sent += 1;
    }
    Ok(sent)
}

/// Counters returned when the consumer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Events that mutated the book.
    pub applied: u64,
    /// Replayed or out-of-order events (not found / duplicate).
    pub ignored: u64,
    /// Events rejected as invalid (including skipped over-fills).
    pub rejected: u64,
}

/// Consume `events` until the channel closes.
///
/// # Errors
///
/// `PipelineHalted` when an over-fill arrives under [`OverfillPolicy::Halt`].
/// Events still queued are left unconsumed.
pub async fn run_event_consumer(
    engine: SharedEngine,
    mut events: mpsc::Receiver<ChainEvent>,
    sink: Arc<dyn BroadcastSink>,
) -> Result<ConsumerStats> {
    let mut stats = ConsumerStats::default();
    tracing::info!("Event consumer started");

    while let Some(event) = events.recv().await {
        let (outcome, policy) = {
            let mut guard = engine.write().await;
            let policy = guard.config().overfill_policy;
            (guard.apply_chain_event(&event), policy)
        };

        match outcome {
            Ok(delta) => {
                stats.applied += 1;
                sink.publish(BookUpdate::Level(delta));
            }
            Err(err) if err.is_benign() => {
                stats.ignored += 1;
                tracing::debug!(
                    order = %event.order_id(),
                    kind = event.kind(),
                    at = %event.timestamp(),
                    error = %err,
                    "Event ignored"
                );
            }
            Err(err @ VenuebookError::InvalidFill { .. }) => {
                tracing::error!(
                    order = %event.order_id(),
                    at = %event.timestamp(),
                    error = %err,
                    policy = ?policy,
                    "Over-fill from chain source"
                );
                match policy {
                    OverfillPolicy::Skip => stats.rejected += 1,
                    OverfillPolicy::Halt => {
                        tracing::error!(applied = stats.applied, "Event consumer halted");
                        return Err(VenuebookError::PipelineHalted {
                            reason: err.to_string(),
                        });
                    }
                }
            }
            Err(err) => {
                stats.rejected += 1;
                tracing::warn!(
                    order = %event.order_id(),
                    kind = event.kind(),
                    at = %event.timestamp(),
                    error = %err,
                    "Event rejected"
                );
            }
        }
    }

    tracing::info!(
        applied = stats.applied,
        ignored = stats.ignored,
        rejected = stats.rejected,
        "Event channel closed, consumer stopped"
    );
    Ok(stats)
}

/// Spawn [`run_event_consumer`] on the current runtime.
#[must_use]
pub fn spawn_event_consumer(
    engine: SharedEngine,
    events: mpsc::Receiver<ChainEvent>,
    sink: Arc<dyn BroadcastSink>,
) -> JoinHandle<Result<ConsumerStats>> {
    tokio::spawn(run_event_consumer(engine, events, sink))
}

/// Run one expiry sweep at the wall clock and publish released levels.
pub async fn sweep_once(engine: &SharedEngine, sink: &dyn BroadcastSink) -> usize {
    let released = engine.write().await.sweep_expired(Utc::now());
    let count = released.len();
    if count > 0 {
        sink.publish(BookUpdate::Released { levels: released });
    }
    count
}

/// Publish the aggregated book of `asset` and return it.
///
/// `depth` limits each side to its best levels; `None` publishes every level.
pub async fn publish_snapshot(
    engine: &SharedEngine,
    sink: &dyn BroadcastSink,
    asset: &AssetId,
    depth: Option<usize>,
) -> BookSnapshot {
    let book = {
        let guard = engine.read().await;
        if let Some(resting) = guard.store().book(asset) {
            tracing::debug!(
                asset = %asset,
                bid_levels = resting.bid_depth(),
                ask_levels = resting.ask_depth(),
                spread = resting.spread().map(tracing::field::display),
                "Publishing book snapshot"
            );
        }
        match depth {
            Some(depth) => guard.get_book_depth(asset, depth),
            None => guard.get_book(asset),
        }
    };
    sink.publish(BookUpdate::Snapshot {
        asset: asset.clone(),
        book: book.clone(),
    });
    book
}

/// Sweep periodically until `shutdown` flips to `true` or its sender drops.
#[must_use]
pub fn spawn_sweeper(
    engine: SharedEngine,
    sink: Arc<dyn BroadcastSink>,
    period: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(period = ?period, "Expiry sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    sweep_once(&engine, sink.as_ref()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Expiry sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone};
    use venuebook_types::*;

    use super::*;
    use crate::broadcast::ChannelSink;

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn created(id: &str, qty: u64) -> ChainEvent {
        ChainEvent::OrderCreated {
            order_id: OrderId::new(id),
            maker: Address::new("0xmaker"),
            asset: AssetId::new("1"),
            side: OrderSide::Sell,
            price: Price::from_u64(100),
            quantity: Quantity::from_u64(qty),
            timestamp: ts(),
        }
    }

    fn filled(id: &str, qty: u64) -> ChainEvent {
        ChainEvent::OrderFilled {
            order_id: OrderId::new(id),
            fill_quantity: Quantity::from_u64(qty),
            taker: None,
            timestamp: ts(),
        }
    }

    fn setup(policy: OverfillPolicy) -> (SharedEngine, Arc<ChannelSink>) {
        with_config(EngineConfig {
            overfill_policy: policy,
            ..EngineConfig::default()
        })
    }

    fn with_config(config: EngineConfig) -> (SharedEngine, Arc<ChannelSink>) {
        let engine = shared(VenueEngine::new(config).unwrap());
        (engine, Arc::new(ChannelSink::new(64)))
    }

    #[tokio::test]
    async fn applies_in_order_and_publishes_deltas() {
        let (engine, sink) = setup(OverfillPolicy::Skip);
        let mut updates = sink.subscribe();
        let (tx, rx) = event_channel(engine.read().await.config());
        let handle = spawn_event_consumer(engine.clone(), rx, sink.clone());

        tx.send(created("a", 10)).await.unwrap();
        tx.send(filled("a", 4)).await.unwrap();
        tx.send(created("a", 1)).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, ConsumerStats { applied: 2, ignored: 1, rejected: 0 });

        let sizes: Vec<Quantity> = [updates.recv().await.unwrap(), updates.recv().await.unwrap()]
            .into_iter()
            .map(|u| match u {
                BookUpdate::Level(delta) => delta.size,
                other => panic!("unexpected update: {other:?}"),
            })
            .collect();
        assert_eq!(sizes, vec![Quantity::from_u64(10), Quantity::from_u64(6)]);
    }

    #[tokio::test]
    async fn skip_policy_keeps_consuming_after_overfill() {
        let (engine, sink) = setup(OverfillPolicy::Skip);
        let (tx, rx) = event_channel(engine.read().await.config());
        let handle = spawn_event_consumer(engine.clone(), rx, sink);

        tx.send(created("a", 5)).await.unwrap();
        tx.send(filled("a", 9)).await.unwrap();
        tx.send(filled("a", 2)).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.applied, 2);
        let guard = engine.read().await;
        assert_eq!(
            guard.store().remaining(&OrderId::new("a")),
            Some(Quantity::from_u64(3))
        );
    }

    #[tokio::test]
    async fn halt_policy_stops_the_consumer() {
        let (engine, sink) = setup(OverfillPolicy::Halt);
        let (tx, rx) = event_channel(engine.read().await.config());
        let handle = spawn_event_consumer(engine.clone(), rx, sink);

        tx.send(created("a", 5)).await.unwrap();
        tx.send(filled("a", 9)).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, VenuebookError::PipelineHalted { .. }));
        assert!(tx.send(filled("a", 1)).await.is_err());
        assert_eq!(
            engine.read().await.store().remaining(&OrderId::new("a")),
            Some(Quantity::from_u64(5))
        );
    }

    #[tokio::test]
    async fn forwarding_to_a_halted_consumer_reports_closed_channel() {
        let (engine, sink) = setup(OverfillPolicy::Halt);
        let (tx, rx) = event_channel(engine.read().await.config());
        let handle = spawn_event_consumer(engine.clone(), rx, sink);

        let sent = forward_events(&tx, [created("a", 5), filled("a", 9)])
            .await
            .unwrap();
        assert_eq!(sent, 2);
        assert!(handle.await.unwrap().is_err());

        let err = forward_events(&tx, [filled("a", 1)]).await.unwrap_err();
        assert!(matches!(err, VenuebookError::ChannelClosed(_)));
    }

    #[tokio::test]
    async fn expired_hold_sweep_publishes_released_levels() {
        let (engine, sink) = with_config(EngineConfig {
            hold_duration_ms: 1,
            ..EngineConfig::default()
        });
        let asset = AssetId::new("1");
        {
            let mut guard = engine.write().await;
            guard.apply_chain_event(&created("a", 10)).unwrap();
            let plan = guard
                .plan_trade(&asset, OrderSide::Buy, Quantity::from_u64(4), Price::MAX)
                .unwrap()
                .unwrap();
            guard.reserve(plan, &Address::new("0xtaker")).unwrap();
            assert_eq!(guard.currently_held(&OrderId::new("a")), Quantity::from_u64(4));
        }

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let mut updates = sink.subscribe();
        assert_eq!(sweep_once(&engine, sink.as_ref()).await, 1);

        match updates.recv().await.unwrap() {
            BookUpdate::Released { levels } => {
                assert_eq!(levels.len(), 1);
                assert_eq!(levels[0].price, Price::from_u64(100));
                assert_eq!(levels[0].released, Quantity::from_u64(4));
                assert_eq!(levels[0].available, Quantity::from_u64(10));
            }
            other => panic!("unexpected update: {other:?}"),
        }
        assert!(engine.read().await.ledger().is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_published_and_returned() {
        let (engine, sink) = setup(OverfillPolicy::Skip);
        let asset = AssetId::new("1");
        {
            let mut guard = engine.write().await;
            guard.apply_chain_event(&created("a", 10)).unwrap();
            guard.apply_chain_event(&created("b", 3)).unwrap();
        }
        let mut updates = sink.subscribe();

        let book = publish_snapshot(&engine, sink.as_ref(), &asset, Some(1)).await;
        assert_eq!(book.asks.len(), 1);
        assert_eq!(book.asks[0].size, Quantity::from_u64(13));

        match updates.recv().await.unwrap() {
            BookUpdate::Snapshot { asset: published, book: sent } => {
                assert_eq!(published, asset);
                assert_eq!(sent, book);
            }
            other => panic!("unexpected update: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let (engine, sink) = setup(OverfillPolicy::Skip);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = spawn_sweeper(
            engine,
            sink,
            std::time::Duration::from_millis(5),
            stop_rx,
        );
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
