//! # venuebook-engine
//!
//! Async host for the venuebook core.
//!
//! - [`VenueEngine`]: store + ledger + config behind one explicit context
//! - [`pipeline`]: single-consumer chain event loop and expiry sweeper over a
//!   [`SharedEngine`]
//! - [`broadcast`]: [`BookUpdate`]s fanned out to subscribers
//! - [`oracle`]: balance pre-checks before reserving ([`TradeDesk`])
//! - [`telemetry`]: tracing subscriber setup for binaries
//!
//! The `venuebook-replay` binary feeds a newline-delimited event file
//! through the same pipeline and prints the resulting books.

pub mod broadcast;
pub mod engine;
pub mod oracle;
pub mod pipeline;
pub mod telemetry;

pub use broadcast::{BookUpdate, BroadcastSink, ChannelSink, NullSink};
pub use engine::VenueEngine;
pub use oracle::{BalanceOracle, FixedBalances, TradeDesk};
pub use pipeline::{
    ConsumerStats, SharedEngine, event_channel, forward_events, publish_snapshot,
    run_event_consumer, shared, spawn_event_consumer, spawn_sweeper, sweep_once,
};
