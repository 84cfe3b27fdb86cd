//! Chain events consumed by the book mutator.
//!
//! The event source delivers these in commit order. Numeric fields are
//! parsed into [`Amount`](crate::Amount) during deserialization, so nothing
//! downstream ever sees a string-typed number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, AssetId, Order, OrderId, OrderSide, Price, Quantity};

/// A confirmed on-chain fact about a resting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChainEvent {
    OrderCreated {
        order_id: OrderId,
        maker: Address,
        asset: AssetId,
        side: OrderSide,
        price: Price,
        quantity: Quantity,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },
    OrderFilled {
        order_id: OrderId,
        fill_quantity: Quantity,
        /// Counterparty that settled the fill, when the source reports it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        taker: Option<Address>,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },
    OrderCancelled {
        order_id: OrderId,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },
}

impl ChainEvent {
    /// The order this event refers to.
    #[must_use]
    pub fn order_id(&self) -> &OrderId {
        match self {
            Self::OrderCreated { order_id, .. }
            | Self::OrderFilled { order_id, .. }
            | Self::OrderCancelled { order_id, .. } => order_id,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::OrderCreated { timestamp, .. }
            | Self::OrderFilled { timestamp, .. }
            | Self::OrderCancelled { timestamp, .. } => *timestamp,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "created",
            Self::OrderFilled { .. } => "filled",
            Self::OrderCancelled { .. } => "cancelled",
        }
    }

    /// Build the resting order described by an `OrderCreated` event.
    /// Returns `None` for the other variants.
    #[must_use]
    pub fn to_order(&self) -> Option<Order> {
        match self {
            Self::OrderCreated {
                order_id,
                maker,
                asset,
                side,
                price,
                quantity,
                timestamp,
            } => Some(Order {
                id: order_id.clone(),
                maker: maker.clone(),
                asset: asset.clone(),
                side: *side,
                price: *price,
                quantity: *quantity,
                filled: Quantity::ZERO,
                sequence: 0,
                created_at: *timestamp,
            }),
            Self::OrderFilled { .. } | Self::OrderCancelled { .. } => None,
        }
    }
}
