//! # Reservation Ledger
//!
//! Time-bounded holds on resting quantity. A hold keeps a planned fill from
//! being offered to another taker while the holder settles on chain.
//!
//! Invariant per order: `total_held == Σ hold.quantity` and
//! `total_held <= quantity - filled`. The ledger never touches the order
//! store; callers keep the two in step through [`ReservationLedger::consume_fill`]
//! and [`ReservationLedger::release_order`].
//!
//! Expiry is lazy: an expired hold keeps counting until
//! [`ReservationLedger::sweep_expired`] runs.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use venuebook_types::{
    Address, AssetId, Order, OrderId, OrderSide, Price, Quantity, ReleasedLevel, ReservationId,
    ReservationTicket, Result, TradePlan, VenuebookError,
};

use crate::order_store::OrderStore;

/// Read access to held quantity, as seen by the matcher.
pub trait HoldView {
    /// Quantity currently held on an order (zero if none).
    fn currently_held(&self, order_id: &OrderId) -> Quantity;

    /// Quantity a new taker may still take from `order`.
    fn available(&self, order: &Order) -> Quantity {
        order
            .remaining()
            .saturating_sub(self.currently_held(&order.id))
    }
}

impl HoldView for HashMap<OrderId, Quantity> {
    fn currently_held(&self, order_id: &OrderId) -> Quantity {
        self.get(order_id).copied().unwrap_or(Quantity::ZERO)
    }
}

/// A single hold placed by one `reserve` call on one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hold {
    pub reservation_id: ReservationId,
    pub holder: Address,
    pub quantity: Quantity,
    pub expires_at: DateTime<Utc>,
}

/// All live holds on one order, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservation {
    pub total_held: Quantity,
    pub holds: Vec<Hold>,
}

impl Reservation {
    fn recompute(&mut self) {
        self.holds.retain(|h| !h.quantity.is_zero());
        self.total_held = self
            .holds
            .iter()
            .fold(Quantity::ZERO, |acc, h| acc.saturating_add(h.quantity));
    }

    /// Take up to `limit` from holds matching `pred`, oldest first.
    fn drain(&mut self, mut limit: Quantity, pred: impl Fn(&Hold) -> bool) -> Quantity {
        let mut taken = Quantity::ZERO;
        for hold in self.holds.iter_mut().filter(|h| pred(h)) {
            if limit.is_zero() {
                break;
            }
            let take = hold.quantity.min(limit);
            hold.quantity = hold.quantity.saturating_sub(take);
            limit = limit.saturating_sub(take);
            taken = taken.saturating_add(take);
        }
        self.recompute();
        taken
    }
}

/// Holds per order id.
#[derive(Debug, Default)]
pub struct ReservationLedger {
    entries: HashMap<OrderId, Reservation>,
}

impl HoldView for ReservationLedger {
    fn currently_held(&self, order_id: &OrderId) -> Quantity {
        self.entries
            .get(order_id)
            .map_or(Quantity::ZERO, |r| r.total_held)
    }
}

impl ReservationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place holds for every leg of `plan`, expiring at `now + hold`.
    ///
    /// Validation is all-or-nothing: if any leg fails, nothing is held.
    ///
    /// # Errors
    ///
    /// - `InvalidReservation` for an empty plan, a zero-quantity leg, a leg
    ///   resting outside the book `plan` consumes, or a non-positive hold
    ///   duration.
    /// - `OrderNotFound` if a leg's order is no longer resting.
    /// - `ReservationExceedsAvailable` if a leg asks for more than
    ///   `remaining - currently_held`.
    pub fn reserve(
        &mut self,
        store: &OrderStore,
        plan: TradePlan,
        holder: &Address,
        hold: Duration,
        now: DateTime<Utc>,
    ) -> Result<ReservationTicket> {
        if plan.is_empty() {
            return Err(VenuebookError::InvalidReservation {
                reason: "plan has no fills".into(),
            });
        }
        if hold <= Duration::zero() {
            return Err(VenuebookError::InvalidReservation {
                reason: format!("hold duration must be positive, got {hold}"),
            });
        }
        let expires_at = now
            .checked_add_signed(hold)
            .ok_or_else(|| VenuebookError::InvalidReservation {
                reason: "expiry out of range".into(),
            })?;

        // A plan may list the same order twice; check the sum.
        let mut needed: HashMap<&OrderId, Quantity> = HashMap::new();
        for leg in &plan.fills {
            if leg.quantity.is_zero() {
                return Err(VenuebookError::InvalidReservation {
                    reason: format!("zero quantity leg on {}", leg.order_id),
                });
            }
            let slot = needed.entry(&leg.order_id).or_default();
            *slot = slot
                .checked_add(leg.quantity)
                .ok_or(VenuebookError::ArithmeticOverflow {
                    context: "summing reservation legs",
                })?;
        }
        for (order_id, quantity) in &needed {
            let order = store
                .get(order_id)
                .ok_or_else(|| VenuebookError::OrderNotFound((*order_id).clone()))?;
            let maker_side = plan.side.opposite();
            if order.asset != plan.asset || order.side != maker_side {
                return Err(VenuebookError::InvalidReservation {
                    reason: format!(
                        "{order_id} rests on the {} side of {}, plan takes {maker_side} of {}",
                        order.side, order.asset, plan.asset
                    ),
                });
            }
            let available = self.available(order);
            if *quantity > available {
                return Err(VenuebookError::ReservationExceedsAvailable {
                    order_id: (*order_id).clone(),
                    needed: *quantity,
                    available,
                });
            }
        }

        let reservation_id = ReservationId::new();
        for leg in &plan.fills {
            let entry = self.entries.entry(leg.order_id.clone()).or_default();
            entry.holds.push(Hold {
                reservation_id,
                holder: holder.clone(),
                quantity: leg.quantity,
                expires_at,
            });
            entry.total_held = entry.total_held.saturating_add(leg.quantity);
        }

        tracing::debug!(
            reservation = %reservation_id,
            holder = %holder,
            legs = plan.len(),
            expires_at = %expires_at,
            "Reservation placed"
        );

        Ok(ReservationTicket {
            reservation_id,
            holder: holder.clone(),
            expires_at,
            plan,
        })
    }

    /// Drop every hold with `expires_at < now` and report the touched
    /// levels, ordered by asset, side and price.
    ///
    /// Holds on orders that already left the store are dropped without a
    /// report. Running twice with the same `now` releases nothing the
    /// second time.
    pub fn sweep_expired(&mut self, store: &OrderStore, now: DateTime<Utc>) -> Vec<ReleasedLevel> {
        let mut released: BTreeMap<(AssetId, OrderSide, Price), Quantity> = BTreeMap::new();
        let mut dropped_holds = 0usize;

        self.entries.retain(|order_id, reservation| {
            let before = reservation.total_held;
            let count = reservation.holds.len();
            reservation.holds.retain(|h| h.expires_at >= now);
            if reservation.holds.len() == count {
                return true;
            }
            dropped_holds += count - reservation.holds.len();
            reservation.recompute();

            let freed = before.saturating_sub(reservation.total_held);
            if let Some(location) = store.location(order_id) {
                let slot = released
                    .entry((location.asset.clone(), location.side, location.price))
                    .or_default();
                *slot = slot.saturating_add(freed);
            }
            !reservation.holds.is_empty()
        });

        if dropped_holds == 0 {
            return Vec::new();
        }

        let levels: Vec<ReleasedLevel> = released
            .into_iter()
            .map(|((asset, side, price), quantity)| ReleasedLevel {
                size: store.price_level_size(&asset, price, side),
                available: self.available_level_size(store, &asset, price, side),
                released: quantity,
                asset,
                side,
                price,
            })
            .collect();

        tracing::info!(
            holds = dropped_holds,
            levels = levels.len(),
            "Expired holds released"
        );
        levels
    }

    /// Reconcile holds with a confirmed fill on `order_id`.
    ///
    /// Holds of `taker` are consumed first (oldest first, up to `fill`),
    /// then the oldest holds are trimmed until the order's `total_held`
    /// fits into `remaining_after`. Returns the quantity released.
    pub fn consume_fill(
        &mut self,
        order_id: &OrderId,
        taker: Option<&Address>,
        fill: Quantity,
        remaining_after: Quantity,
    ) -> Quantity {
        let Some(reservation) = self.entries.get_mut(order_id) else {
            return Quantity::ZERO;
        };

        let mut released = Quantity::ZERO;
        if let Some(taker) = taker {
            released = reservation.drain(fill, |h| h.holder == *taker);
        }
        let excess = reservation.total_held.saturating_sub(remaining_after);
        if !excess.is_zero() {
            released = released.saturating_add(reservation.drain(excess, |_| true));
        }

        if reservation.holds.is_empty() {
            self.entries.remove(order_id);
        }
        if !released.is_zero() {
            tracing::debug!(order = %order_id, released = %released, "Holds consumed by fill");
        }
        released
    }

    /// Drop all holds on an order that left the book. Returns what was held.
    pub fn release_order(&mut self, order_id: &OrderId) -> Quantity {
        self.entries
            .remove(order_id)
            .map_or(Quantity::ZERO, |r| r.total_held)
    }

    /// Σ `max(0, remaining - held)` at one level: the depth a new taker sees.
    #[must_use]
    pub fn available_level_size(
        &self,
        store: &OrderStore,
        asset: &AssetId,
        price: Price,
        side: OrderSide,
    ) -> Quantity {
        store
            .book(asset)
            .and_then(|book| book.level(side, price))
            .map_or(Quantity::ZERO, |level| {
                level
                    .orders
                    .iter()
                    .fold(Quantity::ZERO, |acc, o| acc.saturating_add(self.available(o)))
            })
    }

    #[must_use]
    pub fn reservation(&self, order_id: &OrderId) -> Option<&Reservation> {
        self.entries.get(order_id)
    }

    /// Total number of live holds across all orders.
    #[must_use]
    pub fn hold_count(&self) -> usize {
        self.entries.values().map(|r| r.holds.len()).sum()
    }

    /// Number of orders with at least one hold.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use venuebook_types::*;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn make_store() -> OrderStore {
        let mut store = OrderStore::new();
        store
            .insert_order(Order::dummy("a", OrderSide::Sell, 100, 10))
            .unwrap();
        store
            .insert_order(Order::dummy("b", OrderSide::Sell, 100, 4))
            .unwrap();
        store
    }

    fn make_plan(legs: &[(&str, u64)]) -> TradePlan {
        let fills: Vec<PlannedFill> = legs
            .iter()
            .map(|(id, qty)| PlannedFill {
                order_id: OrderId::new(*id),
                quantity: Quantity::from_u64(*qty),
                price: Price::from_u64(100),
            })
            .collect();
        let total: u64 = legs.iter().map(|(_, q)| q).sum();
        TradePlan {
            asset: AssetId::new("1"),
            side: OrderSide::Buy,
            fills,
            total_quote: Quantity::from_u64(total).full_mul(Price::from_u64(100)),
            total_base: Quantity::from_u64(total),
            requested: Quantity::from_u64(total),
            unfilled: Quantity::ZERO,
        }
    }

    fn alice() -> Address {
        Address::new("0xA11CE")
    }

    #[test]
    fn reserve_tracks_held_and_expiry() {
        let store = make_store();
        let mut ledger = ReservationLedger::new();

        let ticket = ledger
            .reserve(&store, make_plan(&[("a", 5)]), &alice(), Duration::seconds(30), t0())
            .unwrap();

        assert_eq!(ticket.expires_at, t0() + Duration::seconds(30));
        assert_eq!(ticket.holder, alice());
        assert_eq!(ledger.currently_held(&OrderId::new("a")), Quantity::from_u64(5));
        assert_eq!(ledger.currently_held(&OrderId::new("b")), Quantity::ZERO);
        assert_eq!(ledger.hold_count(), 1);
    }

    #[test]
    fn reserve_is_all_or_nothing() {
        let store = make_store();
        let mut ledger = ReservationLedger::new();

        let err = ledger
            .reserve(
                &store,
                make_plan(&[("a", 5), ("b", 5)]),
                &alice(),
                Duration::seconds(30),
                t0(),
            )
            .unwrap_err();
        assert!(matches!(err, VenuebookError::ReservationExceedsAvailable { .. }));
        assert!(ledger.is_empty());

        let err = ledger
            .reserve(
                &store,
                make_plan(&[("a", 1), ("ghost", 1)]),
                &alice(),
                Duration::seconds(30),
                t0(),
            )
            .unwrap_err();
        assert!(matches!(err, VenuebookError::OrderNotFound(_)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn reserve_rejects_legs_outside_the_consumed_book() {
        let mut store = make_store();
        store
            .insert_order(Order::dummy("bid", OrderSide::Buy, 90, 10))
            .unwrap();
        store
            .insert_order(Order::dummy_for_asset("other", "2", OrderSide::Sell, 100, 10))
            .unwrap();
        let mut ledger = ReservationLedger::new();

        for legs in [[("a", 1), ("bid", 1)], [("a", 1), ("other", 1)]] {
            let err = ledger
                .reserve(&store, make_plan(&legs), &alice(), Duration::seconds(30), t0())
                .unwrap_err();
            assert!(matches!(err, VenuebookError::InvalidReservation { .. }));
        }
        assert!(ledger.is_empty());
        assert_eq!(ledger.currently_held(&OrderId::new("bid")), Quantity::ZERO);
    }

    #[test]
    fn reserve_counts_existing_holds() {
        let store = make_store();
        let mut ledger = ReservationLedger::new();
        ledger
            .reserve(&store, make_plan(&[("a", 7)]), &alice(), Duration::seconds(30), t0())
            .unwrap();

        let err = ledger
            .reserve(&store, make_plan(&[("a", 4)]), &alice(), Duration::seconds(30), t0())
            .unwrap_err();
        match err {
            VenuebookError::ReservationExceedsAvailable { available, .. } => {
                assert_eq!(available, Quantity::from_u64(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reserve_rejects_empty_plan_and_bad_duration() {
        let store = make_store();
        let mut ledger = ReservationLedger::new();
        assert!(matches!(
            ledger.reserve(&store, make_plan(&[]), &alice(), Duration::seconds(30), t0()),
            Err(VenuebookError::InvalidReservation { .. })
        ));
        assert!(matches!(
            ledger.reserve(&store, make_plan(&[("a", 1)]), &alice(), Duration::zero(), t0()),
            Err(VenuebookError::InvalidReservation { .. })
        ));
    }

    #[test]
    fn hold_counts_until_swept_after_expiry() {
        let store = make_store();
        let mut ledger = ReservationLedger::new();
        let id = OrderId::new("a");
        ledger
            .reserve(&store, make_plan(&[("a", 5)]), &alice(), Duration::seconds(30), t0())
            .unwrap();

        assert!(ledger.sweep_expired(&store, t0() + Duration::seconds(29)).is_empty());
        assert_eq!(ledger.currently_held(&id), Quantity::from_u64(5));

        // Exactly at expiry the hold still counts.
        assert!(ledger.sweep_expired(&store, t0() + Duration::seconds(30)).is_empty());

        let released = ledger.sweep_expired(&store, t0() + Duration::seconds(31));
        assert_eq!(released.len(), 1);
        let level = &released[0];
        assert_eq!(level.price, Price::from_u64(100));
        assert_eq!(level.side, OrderSide::Sell);
        assert_eq!(level.size, Quantity::from_u64(14));
        assert_eq!(level.available, Quantity::from_u64(14));
        assert_eq!(level.released, Quantity::from_u64(5));
        assert_eq!(ledger.currently_held(&id), Quantity::ZERO);
        assert!(ledger.is_empty());

        assert!(ledger.sweep_expired(&store, t0() + Duration::seconds(31)).is_empty());
    }

    #[test]
    fn available_level_size_subtracts_holds() {
        let store = make_store();
        let mut ledger = ReservationLedger::new();
        let asset = AssetId::new("1");
        ledger
            .reserve(&store, make_plan(&[("b", 4)]), &alice(), Duration::seconds(30), t0())
            .unwrap();

        assert_eq!(
            ledger.available_level_size(&store, &asset, Price::from_u64(100), OrderSide::Sell),
            Quantity::from_u64(10)
        );
        assert_eq!(
            store.price_level_size(&asset, Price::from_u64(100), OrderSide::Sell),
            Quantity::from_u64(14)
        );
    }

    #[test]
    fn consume_fill_prefers_taker_holds_then_trims() {
        let store = make_store();
        let mut ledger = ReservationLedger::new();
        let bob = Address::new("0xb0b");
        let id = OrderId::new("a");

        ledger
            .reserve(&store, make_plan(&[("a", 3)]), &bob, Duration::seconds(30), t0())
            .unwrap();
        ledger
            .reserve(&store, make_plan(&[("a", 4)]), &alice(), Duration::seconds(30), t0())
            .unwrap();

        // Alice settles 4 of 10: her hold goes, bob's 3 still fit into 6.
        let released = ledger.consume_fill(&id, Some(&alice()), Quantity::from_u64(4), Quantity::from_u64(6));
        assert_eq!(released, Quantity::from_u64(4));
        assert_eq!(ledger.currently_held(&id), Quantity::from_u64(3));

        // Unknown taker fills 5: only 1 left, so bob's hold is trimmed to 1.
        let released = ledger.consume_fill(&id, None, Quantity::from_u64(5), Quantity::from_u64(1));
        assert_eq!(released, Quantity::from_u64(2));
        let reservation = ledger.reservation(&id).unwrap();
        assert_eq!(reservation.total_held, Quantity::from_u64(1));
        assert_eq!(reservation.holds[0].holder, bob);
    }

    #[test]
    fn release_order_drops_everything() {
        let store = make_store();
        let mut ledger = ReservationLedger::new();
        ledger
            .reserve(
                &store,
                make_plan(&[("a", 2), ("b", 1)]),
                &alice(),
                Duration::seconds(30),
                t0(),
            )
            .unwrap();

        assert_eq!(ledger.release_order(&OrderId::new("a")), Quantity::from_u64(2));
        assert_eq!(ledger.release_order(&OrderId::new("a")), Quantity::ZERO);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn sweep_skips_orders_that_left_the_store() {
        let mut store = make_store();
        let mut ledger = ReservationLedger::new();
        ledger
            .reserve(&store, make_plan(&[("a", 2)]), &alice(), Duration::seconds(1), t0())
            .unwrap();
        store.remove_order(&OrderId::new("a")).unwrap();

        let released = ledger.sweep_expired(&store, t0() + Duration::seconds(5));
        assert!(released.is_empty());
        assert!(ledger.is_empty());
    }
}
