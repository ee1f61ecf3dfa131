//! # beacon-store
//!
//! Persistent user and tier records for the Beacon notification service,
//! backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed operations for users (accounts,
//! roles, bcrypt password checks, tier assignment) and tiers (plans with
//! quotas and billing price ids). A handle is safe to share between threads,
//! and several processes may open the same database file.

pub mod database;
pub mod migrations;
pub mod models;
pub mod tiers;
pub mod users;

mod error;
mod password;

pub use database::{Database, StoreOptions};
pub use error::{Entity, Result, StoreError};
pub use models::*;
