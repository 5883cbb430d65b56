//! The consolidated read model for a cluster — never stored, always derived.

use serde::{Deserialize, Serialize};

use crate::contact::{Contact, ContactId};

/// Everything known about one person, anchored at the cluster primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedContact {
  pub primary_contact_id:    ContactId,
  /// Primary's email first, then secondaries' in creation order; no repeats.
  pub emails:                Vec<String>,
  /// Same ordering rule as `emails`.
  pub phone_numbers:         Vec<String>,
  /// Secondary ids in ascending creation order.
  pub secondary_contact_ids: Vec<ContactId>,
}

impl ConsolidatedContact {
  /// Build the view from a cluster's primary and its secondaries. The
  /// secondaries may arrive in any order.
  pub fn from_cluster(primary: &Contact, secondaries: &[Contact]) -> Self {
    let mut ordered: Vec<&Contact> = secondaries.iter().collect();
    ordered.sort_by_key(|c| c.seniority());

    let mut emails = Vec::new();
    let mut phone_numbers = Vec::new();
    for contact in std::iter::once(primary).chain(ordered.iter().copied()) {
      push_unique(&mut emails, contact.email.as_deref());
      push_unique(&mut phone_numbers, contact.phone_number.as_deref());
    }

    Self {
      primary_contact_id: primary.id,
      emails,
      phone_numbers,
      secondary_contact_ids: ordered.iter().map(|c| c.id).collect(),
    }
  }
}

fn push_unique(values: &mut Vec<String>, value: Option<&str>) {
  if let Some(v) = value
    && !values.iter().any(|existing| existing == v)
  {
    values.push(v.to_owned());
  }
}
