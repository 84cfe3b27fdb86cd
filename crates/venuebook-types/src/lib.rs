//! # venuebook-types
//!
//! Shared types, errors, and configuration for the **venuebook** engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Exact integers**: [`Amount`] (`uint256`), [`Notional`] (`uint512`), [`Price`], [`Quantity`]
//! - **Identifiers**: [`OrderId`], [`AssetId`], [`Address`], [`ReservationId`]
//! - **Order model**: [`Order`], [`OrderSide`]
//! - **Chain events**: [`ChainEvent`]
//! - **Matching output**: [`TradePlan`], [`PlannedFill`], [`ReservationTicket`]
//! - **Book projections**: [`PriceLevelDelta`], [`BookSnapshot`], [`LevelEntry`], [`ReleasedLevel`]
//! - **Configuration**: [`EngineConfig`], [`OverfillPolicy`]
//! - **Errors**: [`VenuebookError`] with `VB_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod amount;
pub mod book;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;
pub mod plan;

// Re-export all primary types at crate root for ergonomic imports:
//   use venuebook_types::{Order, OrderSide, Amount, TradePlan, ...};

pub use amount::*;
pub use book::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;
pub use plan::*;

// Constants are accessed via `venuebook_types::constants::FOO`
// (not re-exported to avoid name collisions).
