//! Matching output: trade plans and reservation tickets.
//!
//! A [`TradePlan`] is ephemeral: it describes what a taker *could* fill
//! against the current book. It is never persisted and never mutates the
//! book by itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, AssetId, Notional, OrderId, OrderSide, Price, Quantity, ReservationId};

/// One leg of a plan: take `quantity` from resting order `order_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFill {
    pub order_id: OrderId,
    pub quantity: Quantity,
    /// Resting price of the maker order.
    pub price: Price,
}

/// The result of walking the book for a taker intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePlan {
    pub asset: AssetId,
    /// Side of the taker (a `Buy` plan consumes asks).
    pub side: OrderSide,
    /// Legs in price-time priority order.
    pub fills: Vec<PlannedFill>,
    /// Σ `quantity × price` over the legs, in quote units.
    pub total_quote: Notional,
    /// Σ `quantity` over the legs, in base units.
    pub total_base: Quantity,
    /// Quantity the taker asked for.
    pub requested: Quantity,
    /// Part of `requested` no resting order could cover.
    pub unfilled: Quantity,
}

impl TradePlan {
    /// `true` when the plan covers the whole requested quantity.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unfilled.is_zero()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fills.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }
}

/// Returned by a successful `reserve`: the holds live until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationTicket {
    pub reservation_id: ReservationId,
    pub holder: Address,
    pub expires_at: DateTime<Utc>,
    pub plan: TradePlan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Amount;

    fn plan(unfilled: u64) -> TradePlan {
        TradePlan {
            asset: AssetId::new("1"),
            side: OrderSide::Buy,
            fills: vec![PlannedFill {
                order_id: OrderId::new("a"),
                quantity: Amount::from_u64(5),
                price: Amount::from_u64(90),
            }],
            total_quote: Amount::from_u64(5).full_mul(Amount::from_u64(90)),
            total_base: Amount::from_u64(5),
            requested: Amount::from_u64(5 + unfilled),
            unfilled: Amount::from_u64(unfilled),
        }
    }

    #[test]
    fn completeness() {
        assert!(plan(0).is_complete());
        assert!(!plan(2).is_complete());
    }

    #[test]
    fn serializes_totals_as_strings() {
        let json = serde_json::to_value(plan(0)).unwrap();
        assert_eq!(json["total_quote"], "450");
        assert_eq!(json["fills"][0]["order_id"], "a");
    }
}
