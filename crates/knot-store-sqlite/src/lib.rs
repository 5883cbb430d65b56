//! SQLite backend for the Knot contact store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Reconciliation transactions run on
//! that thread against a ledger borrowed from an open `BEGIN IMMEDIATE`
//! transaction.

mod encode;
mod ledger;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
