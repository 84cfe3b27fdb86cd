//! Integration test: book invariants under long random operation sequences.
//!
//! After every step:
//! - each resting order has `filled < quantity`
//! - each order's `total_held <= quantity - filled`
//! - every level size equals Σ remaining at that level
//! - snapshot side totals equal Σ remaining per side

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use venuebook_core::{HoldView, OrderStore, ReservationLedger, plan_trade, snapshot};
use venuebook_types::*;

const STEPS: usize = 4_000;

fn asset() -> AssetId {
    AssetId::new("1")
}

fn random_side(rng: &mut StdRng) -> OrderSide {
    if rng.gen_bool(0.5) { OrderSide::Buy } else { OrderSide::Sell }
}

fn pick_order(store: &OrderStore, rng: &mut StdRng) -> Option<OrderId> {
    let ids: Vec<OrderId> = store.orders().map(|o| o.id.clone()).collect();
    if ids.is_empty() {
        return None;
    }
    Some(ids[rng.gen_range(0..ids.len())].clone())
}

fn check_invariants(store: &OrderStore, ledger: &ReservationLedger) {
    let mut per_level: HashMap<(OrderSide, Price), Quantity> = HashMap::new();
    let mut per_side: HashMap<OrderSide, Quantity> = HashMap::new();

    for order in store.orders() {
        assert!(order.filled < order.quantity, "order {} over-filled", order.id);
        assert!(
            ledger.currently_held(&order.id) <= order.remaining(),
            "order {} held beyond remaining",
            order.id
        );
        let level = per_level.entry((order.side, order.price)).or_default();
        *level = level.saturating_add(order.remaining());
        let side = per_side.entry(order.side).or_default();
        *side = side.saturating_add(order.remaining());
    }

    for ((side, price), expected) in &per_level {
        assert_eq!(store.price_level_size(&asset(), *price, *side), *expected);
    }

    let snap = snapshot(store, &asset());
    for side in [OrderSide::Buy, OrderSide::Sell] {
        let expected = per_side.get(&side).copied().unwrap_or(Quantity::ZERO);
        assert_eq!(snap.side_total(side), expected);
    }
    assert!(snap.bids.windows(2).all(|w| w[0].price > w[1].price));
    assert!(snap.asks.windows(2).all(|w| w[0].price < w[1].price));
}

fn run(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = OrderStore::new();
    let mut ledger = ReservationLedger::new();
    let mut now: DateTime<Utc> = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let holders: Vec<Address> = (0..4).map(|i| Address::new(format!("0xholder{i}"))).collect();
    let mut next_id = 0u64;

    for _ in 0..STEPS {
        now += Duration::seconds(rng.gen_range(0..3));

        match rng.gen_range(0..100) {
            0..=34 => {
                next_id += 1;
                let order = Order::dummy(
                    &format!("o{next_id}"),
                    random_side(&mut rng),
                    rng.gen_range(90..=110),
                    rng.gen_range(1..=20),
                );
                store.insert_order(order).unwrap();
            }
            35..=59 => {
                let Some(id) = pick_order(&store, &mut rng) else {
                    continue;
                };
                let before = store.get(&id).cloned().unwrap();
                let remaining = before.remaining().0.as_u64();
                let fill = Quantity::from_u64(rng.gen_range(1..=remaining + 2));
                let taker = rng
                    .gen_bool(0.5)
                    .then(|| holders[rng.gen_range(0..holders.len())].clone());

                match store.apply_fill(&id, fill) {
                    Ok(result) => {
                        ledger.consume_fill(&id, taker.as_ref(), fill, result.remaining);
                        if result.completed {
                            ledger.release_order(&id);
                            assert!(store.get(&id).is_none());
                        }
                    }
                    Err(VenuebookError::InvalidFill { .. }) => {
                        assert!(fill > before.remaining());
                        assert_eq!(store.get(&id), Some(&before));
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            60..=69 => {
                let Some(id) = pick_order(&store, &mut rng) else {
                    continue;
                };
                store.remove_order(&id).unwrap();
                ledger.release_order(&id);
                assert!(matches!(
                    store.remove_order(&id),
                    Err(VenuebookError::OrderNotFound(_))
                ));
            }
            70..=89 => {
                let side = random_side(&mut rng);
                let limit = match side {
                    OrderSide::Buy => Price::from_u64(rng.gen_range(90..=115)),
                    OrderSide::Sell => Price::from_u64(rng.gen_range(85..=110)),
                };
                let quantity = Quantity::from_u64(rng.gen_range(1..=40));
                let plan = plan_trade(&store, &ledger, &asset(), side, quantity, limit).unwrap();
                if let Some(plan) = plan {
                    assert_eq!(
                        plan.total_base.saturating_add(plan.unfilled),
                        plan.requested
                    );
                    let holder = &holders[rng.gen_range(0..holders.len())];
                    let hold = Duration::seconds(rng.gen_range(1..=30));
                    ledger.reserve(&store, plan, holder, hold, now).unwrap();
                }
            }
            _ => {
                let released = ledger.sweep_expired(&store, now);
                for level in &released {
                    assert!(!level.released.is_zero());
                    assert!(level.available <= level.size);
                }
                assert!(ledger.sweep_expired(&store, now).is_empty());
            }
        }

        check_invariants(&store, &ledger);
    }
}

#[test]
fn invariants_hold_for_several_seeds() {
    for seed in [1, 7, 42, 2024, 0xDEAD_BEEF] {
        run(seed);
    }
}
