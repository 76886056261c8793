//! # dogfood-store
//!
//! The Message Store contract and its two reference backends.
//!
//! The [`MessageStore`] trait is the abstract datastore the delivery core is
//! written against: create, cursor-paginated list, and a scoped batch status
//! update. [`MemoryStore`] backs tests and local development;
//! [`SqliteStore`] persists to SQLite (WAL, versioned migrations) for
//! self-hosted deployments.

pub mod database;
pub mod links;
pub mod memory;
pub mod messages;
pub mod migrations;
pub mod store;

mod error;

pub use database::{Database, SqliteStore};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{HistoryOrder, HistoryQuery, MessageStore, NewMessage};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
