//! Contact records — the only entity in the Knot store.
//!
//! A contact carries at most one email and one phone number. Contacts that
//! belong to the same person form a *cluster*: one primary plus any number of
//! secondaries whose `linked_id` points directly at that primary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Store-assigned row id. Links between contacts are expressed with ids, never
/// with in-memory references.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContactId(pub i64);

impl fmt::Display for ContactId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Whether a contact anchors its cluster or hangs off another contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
  Primary,
  Secondary,
}

// ─── Contact ─────────────────────────────────────────────────────────────────

/// A persisted contact row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
  pub id:              ContactId,
  pub email:           Option<String>,
  pub phone_number:    Option<String>,
  /// Set only on secondaries; always names the cluster's primary.
  pub linked_id:       Option<ContactId>,
  pub link_precedence: LinkPrecedence,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Contact {
  pub fn is_primary(&self) -> bool {
    self.link_precedence == LinkPrecedence::Primary
  }

  /// Sort key for age comparisons. Equal timestamps fall back to the lower id.
  pub fn seniority(&self) -> (DateTime<Utc>, ContactId) {
    (self.created_at, self.id)
  }

  /// The primary this contact claims to belong to, or `None` when the
  /// precedence and link fields disagree.
  pub fn claimed_primary(&self) -> Option<ContactId> {
    match (self.link_precedence, self.linked_id) {
      (LinkPrecedence::Primary, None) => Some(self.id),
      (LinkPrecedence::Secondary, Some(linked)) => Some(linked),
      _ => None,
    }
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ContactLedger::insert`]. The id and both
/// timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
  pub email:           Option<String>,
  pub phone_number:    Option<String>,
  pub linked_id:       Option<ContactId>,
  pub link_precedence: LinkPrecedence,
}

impl NewContact {
  /// A fresh cluster anchor.
  pub fn primary(email: Option<String>, phone_number: Option<String>) -> Self {
    Self {
      email,
      phone_number,
      linked_id: None,
      link_precedence: LinkPrecedence::Primary,
    }
  }

  /// A new member of the cluster anchored at `primary`.
  pub fn secondary(
    email: Option<String>,
    phone_number: Option<String>,
    primary: ContactId,
  ) -> Self {
    Self {
      email,
      phone_number,
      linked_id: Some(primary),
      link_precedence: LinkPrecedence::Secondary,
    }
  }
}

/// Input to [`crate::store::ContactLedger::update`]. Only the link fields of
/// a contact ever change; the store refreshes `updated_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkUpdate {
  pub link_precedence: LinkPrecedence,
  pub linked_id:       Option<ContactId>,
}

impl LinkUpdate {
  pub fn secondary_of(primary: ContactId) -> Self {
    Self {
      link_precedence: LinkPrecedence::Secondary,
      linked_id:       Some(primary),
    }
  }
}

/// Demote `losing` under `surviving` and repoint every contact linked to
/// `losing` onto `surviving`, as one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge {
  pub surviving: ContactId,
  pub losing:    ContactId,
}
