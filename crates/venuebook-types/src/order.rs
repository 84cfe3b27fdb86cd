//! Order types for the venuebook engine.
//!
//! Orders are created by chain events and owned by the order store. The
//! store is the only component that mutates `filled`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, AssetId, OrderId, Price, Quantity};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side a taker on `self` trades against.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle of a resting order as observed from chain events.
///
/// `Filled` and `Cancelled` are terminal; the order leaves the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Resting,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resting => write!(f, "RESTING"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A resting order. Invariant: `filled <= quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub maker: Address,
    pub asset: AssetId,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Quantity,
    #[serde(default)]
    pub filled: Quantity,
    /// Insertion sequence, stamped by the order store. Lower = older.
    #[serde(default)]
    pub sequence: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// `quantity - filled`.
    #[must_use]
    pub fn remaining(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled)
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filled >= self.quantity
    }

    #[must_use]
    pub fn status(&self) -> OrderStatus {
        if self.is_filled() {
            OrderStatus::Filled
        } else if self.filled.is_zero() {
            OrderStatus::Resting
        } else {
            OrderStatus::PartiallyFilled
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A fresh resting order with `filled = 0` for asset `"1"`.
    pub fn dummy(id: &str, side: OrderSide, price: u64, qty: u64) -> Self {
        Self::dummy_for_asset(id, "1", side, price, qty)
    }

    pub fn dummy_for_asset(id: &str, asset: &str, side: OrderSide, price: u64, qty: u64) -> Self {
        Self {
            id: OrderId::new(id),
            maker: Address::new(format!("0xmaker{id}")),
            asset: AssetId::new(asset),
            side,
            price: Price::from_u64(price),
            quantity: Quantity::from_u64(qty),
            filled: Quantity::ZERO,
            sequence: 0,
            created_at: Utc::now(),
        }
    }
}
