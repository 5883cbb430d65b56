//! JSON REST API for Knot.
//!
//! Exposes an axum [`Router`] backed by any [`knot_core::store::ContactStore`].
//! TLS and other transport concerns are the caller's responsibility.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/identify` | Reconcile a partial identifier |
//! | `GET`  | `/contacts/{id}` | Consolidated view of the cluster holding `id` |
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(knot_api::api_router(store.clone()))
//! ```

pub mod contacts;
pub mod error;
pub mod identify;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use knot_core::{Reconciler, store::ContactStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ContactStore + 'static,
{
  Router::new()
    .route("/identify", post(identify::handler::<S>))
    .route("/contacts/{id}", get(contacts::get_one::<S>))
    .with_state(Reconciler::new(store))
}
