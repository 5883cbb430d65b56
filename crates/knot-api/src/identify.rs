//! Handler for `POST /identify`.
//!
//! Body: `{"email": "...", "phoneNumber": "..."}`; either field may be absent
//! or `null`, but not both. `phoneNumber` may also be sent as a JSON number.
//! Returns `200 {"contact": {...}}` with the consolidated identity.

use axum::{Json, extract::State};
use knot_core::{Reconciler, store::ContactStore, view::ConsolidatedContact};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A phone number as clients actually send it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PhoneNumber {
  Text(String),
  Number(u64),
}

impl From<PhoneNumber> for String {
  fn from(p: PhoneNumber) -> Self {
    match p {
      PhoneNumber::Text(s) => s,
      PhoneNumber::Number(n) => n.to_string(),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyBody {
  pub email:        Option<String>,
  pub phone_number: Option<PhoneNumber>,
}

/// Response envelope shared by `/identify` and `/contacts/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ContactEnvelope {
  pub contact: ConsolidatedContact,
}

/// `POST /identify`
pub async fn handler<S>(
  State(reconciler): State<Reconciler<S>>,
  Json(body): Json<IdentifyBody>,
) -> Result<Json<ContactEnvelope>, ApiError>
where
  S: ContactStore + 'static,
{
  let contact = reconciler
    .identify(body.email, body.phone_number.map(String::from))
    .await?;
  Ok(Json(ContactEnvelope { contact }))
}
