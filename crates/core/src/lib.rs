//! StoreLens Core - domain model and analytics engine.
//!
//! This crate provides everything the StoreLens components share:
//! - `server` - HTTP API over the relational and document stores
//! - `cli` - Command-line tools for migrations, seeding, mirroring and reports
//!
//! # Architecture
//!
//! The core crate holds no network clients. Stores are reached through the
//! [`store::MetricsStore`] and [`store::CartStore`] traits, implemented by
//! the server crate for `PostgreSQL` and `MongoDB`, and here by the
//! [`store::InMemoryStore`] used in tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, ratings and statuses
//! - [`model`] - Entities shared by every store adapter
//! - [`store`] - Store capability traits and the in-memory store
//! - [`metrics`] - The declarative metric catalog, engine and dual-store comparison
//! - [`cart`] - Cart/order state machine
//! - [`seed`] - Synthetic demo data

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod error;
pub mod metrics;
pub mod model;
pub mod seed;
pub mod store;
pub mod types;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod testing;

pub use error::{Error, Result, StoreKind};
pub use types::*;
