//! Error types for `knot-core`.

use thiserror::Error;

use crate::contact::ContactId;

/// A request that was rejected before the store was touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("either email or phoneNumber must be provided")]
  MissingIdentifier,

  #[error("malformed email address: {0:?}")]
  MalformedEmail(String),
}

/// Stored link data that breaks the cluster discipline.
///
/// These are reported, never repaired: a violation means something outside
/// the reconciler wrote to the store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsistencyViolation {
  #[error("contact {contact} links to missing contact {linked}")]
  DanglingLink { contact: ContactId, linked: ContactId },

  #[error("contact {contact} links to {linked}, which is itself secondary")]
  ChainedLink { contact: ContactId, linked: ContactId },

  #[error("contact {contact} has a link precedence that disagrees with its linked id")]
  MalformedLink { contact: ContactId },

  #[error("cluster anchor {contact} is not a primary contact")]
  NotPrimary { contact: ContactId },

  #[error("primary {primary} is younger than its secondary {member}")]
  PrimaryNotOldest { primary: ContactId, member: ContactId },

  #[error("contact {contact} has neither email nor phone number")]
  MissingIdentifiers { contact: ContactId },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation error: {0}")]
  Validation(#[from] ValidationError),

  #[error("consistency violation: {0}")]
  Consistency(#[from] ConsistencyViolation),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error without interpreting it.
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
