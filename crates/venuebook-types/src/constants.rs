//! System-wide constants for the venuebook engine.

/// Default reservation hold window in milliseconds.
pub const DEFAULT_HOLD_DURATION_MS: u64 = 30_000;

/// Default period of the expiry sweeper in milliseconds.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1_000;

/// Default capacity of the chain event channel (backpressure on the source).
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// Default capacity of the book update broadcast channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "venuebook";
