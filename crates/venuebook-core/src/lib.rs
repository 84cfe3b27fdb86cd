//! # venuebook-core
//!
//! **In-memory order book, matcher and reservation engine.**
//!
//! Everything in this crate is synchronous and free of I/O. Callers apply
//! mutations one at a time (single logical writer); read-only planning can
//! run alongside other reads.
//!
//! - [`OrderStore`]: owns every resting order, grouped per asset into an
//!   [`OrderBook`]; applies chain facts (insert, fill, cancel)
//! - [`ReservationLedger`]: time-bounded holds on resting quantity
//! - [`matcher`]: greedy price-time planning against the opposite side
//! - [`aggregator`]: price-level snapshots for display and broadcast
//!
//! ```text
//! chain events ──▶ OrderStore ◀── matcher (read-only) ──▶ TradePlan
//!                      ▲                ▲                     │
//!                      └── ReservationLedger ◀── reserve ─────┘
//! ```

pub mod aggregator;
pub mod matcher;
pub mod order_store;
pub mod orderbook;
pub mod price_level;
pub mod reservation;

pub use aggregator::{snapshot, snapshot_depth};
pub use matcher::{plan_buy, plan_sell, plan_trade};
pub use order_store::{FillResult, LoadReport, OrderLocation, OrderStore};
pub use orderbook::OrderBook;
pub use price_level::PriceLevel;
pub use reservation::{Hold, HoldView, Reservation, ReservationLedger};
