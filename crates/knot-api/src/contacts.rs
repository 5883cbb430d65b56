//! Handler for `GET /contacts/{id}` — read-only consolidated view of the
//! cluster containing any contact id. 404 if the id is unknown.

use axum::{
  Json,
  extract::{Path, State},
};
use knot_core::{Reconciler, contact::ContactId, store::ContactStore};

use crate::{error::ApiError, identify::ContactEnvelope};

/// `GET /contacts/{id}`
pub async fn get_one<S>(
  State(reconciler): State<Reconciler<S>>,
  Path(id): Path<ContactId>,
) -> Result<Json<ContactEnvelope>, ApiError>
where
  S: ContactStore + 'static,
{
  let contact = reconciler
    .lookup(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("contact {id} not found")))?;
  Ok(Json(ContactEnvelope { contact }))
}
