//! Configuration types for a venuebook engine instance.

use serde::{Deserialize, Serialize};

use crate::{constants, Result, VenuebookError};

/// What the event consumer does when a fill would exceed an order's
/// remaining quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverfillPolicy {
    /// Log at `error` level, leave the order unchanged, keep consuming.
    #[default]
    Skip,
    /// Stop consuming events. The engine's view is presumed inconsistent
    /// with the chain and needs a reload.
    Halt,
}

/// Configuration for a single engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a reservation holds matched liquidity.
    pub hold_duration_ms: u64,
    /// Period of the background expiry sweep.
    pub sweep_interval_ms: u64,
    /// Bounded capacity of the chain event channel.
    pub event_channel_capacity: usize,
    /// Capacity of the book update broadcast channel.
    pub broadcast_capacity: usize,
    /// Reaction to over-fill events.
    pub overfill_policy: OverfillPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hold_duration_ms: constants::DEFAULT_HOLD_DURATION_MS,
            sweep_interval_ms: constants::DEFAULT_SWEEP_INTERVAL_MS,
            event_channel_capacity: constants::DEFAULT_EVENT_CHANNEL_CAPACITY,
            broadcast_capacity: constants::DEFAULT_BROADCAST_CAPACITY,
            overfill_policy: OverfillPolicy::Skip,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the engine unusable.
    pub fn validate(&self) -> Result<()> {
        if self.hold_duration_ms == 0 {
            return Err(VenuebookError::Configuration(
                "hold_duration_ms must be > 0".into(),
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(VenuebookError::Configuration(
                "sweep_interval_ms must be > 0".into(),
            ));
        }
        if self.event_channel_capacity == 0 || self.broadcast_capacity == 0 {
            return Err(VenuebookError::Configuration(
                "channel capacities must be > 0".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn hold_duration(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.hold_duration_ms).unwrap_or(i64::MAX))
    }

    #[must_use]
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sweep_interval_ms)
    }
}
