//! Error types for the venuebook engine.
//!
//! All errors use the `VB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / book mutation errors
//! - 2xx: Reservation errors
//! - 3xx: Matching errors
//! - 4xx: Event pipeline errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Amount, Notional, OrderId};

/// Central error enum for all venuebook operations.
#[derive(Debug, Error)]
pub enum VenuebookError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The order is not resting in the book. Usually a replayed or
    /// out-of-order event; safe to ignore.
    #[error("VB_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order failed validation (zero quantity, already filled, ...).
    #[error("VB_ERR_101: Invalid order {order_id}: {reason}")]
    InvalidOrder { order_id: OrderId, reason: String },

    /// An order with this ID is already resting.
    #[error("VB_ERR_102: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// A fill would push `filled` past `quantity`. The engine and the
    /// event source disagree; retrying cannot succeed.
    #[error("VB_ERR_103: Invalid fill for {order_id}: fill {fill} exceeds remaining {remaining}")]
    InvalidFill {
        order_id: OrderId,
        fill: Amount,
        remaining: Amount,
    },

    // =================================================================
    // Reservation Errors (2xx)
    // =================================================================
    /// The reservation request is structurally invalid.
    #[error("VB_ERR_200: Invalid reservation: {reason}")]
    InvalidReservation { reason: String },

    /// A plan leg asks for more than is currently unreserved.
    #[error("VB_ERR_201: Reservation exceeds availability on {order_id}: need {needed}, available {available}")]
    ReservationExceedsAvailable {
        order_id: OrderId,
        needed: Amount,
        available: Amount,
    },

    /// The holder cannot fund the plan (checked by the calling layer).
    #[error("VB_ERR_202: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Notional, available: Amount },

    // =================================================================
    // Matching Errors (3xx)
    // =================================================================
    /// An accumulated total left the representable range.
    #[error("VB_ERR_300: Arithmetic overflow while {context}")]
    ArithmeticOverflow { context: &'static str },

    // =================================================================
    // Pipeline Errors (4xx)
    // =================================================================
    /// The event consumer stopped because of a consistency fault.
    #[error("VB_ERR_400: Event pipeline halted: {reason}")]
    PipelineHalted { reason: String },

    /// The other end of a channel went away.
    #[error("VB_ERR_401: Channel closed: {0}")]
    ChannelClosed(&'static str),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// A numeric field was not a non-negative decimal integer in range.
    #[error("VB_ERR_900: Invalid amount: {0:?}")]
    InvalidAmount(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("VB_ERR_901: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("VB_ERR_902: Serialization error: {0}")]
    Serialization(String),

    /// I/O error (disk, network).
    #[error("VB_ERR_903: I/O error: {0}")]
    Io(String),
}

impl VenuebookError {
    /// Errors that are expected under replays or reordering and should not
    /// be escalated.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::OrderNotFound(_) | Self::DuplicateOrder(_))
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, VenuebookError>;

impl From<std::io::Error> for VenuebookError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VenuebookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
