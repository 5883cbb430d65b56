//! Core types, store traits, and the reconciliation algorithm for Knot.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

pub mod audit;
pub mod contact;
pub mod error;
pub mod identifiers;
pub mod reconcile;
pub mod store;
pub mod view;

pub use error::{ConsistencyViolation, Error, Result, ValidationError};
pub use reconcile::{Outcome, Reconciler};

#[cfg(test)]
mod tests;
