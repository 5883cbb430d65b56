//! The `ContactStore` and `ContactLedger` traits.
//!
//! The traits are implemented by storage backends (e.g. `knot-store-sqlite`).
//! The reconciler and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  Result,
  contact::{Contact, ContactId, LinkUpdate, Merge, NewContact},
};

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// A view of the store bound to a single transaction.
///
/// Methods are synchronous: the ledger lives wherever the backend executes its
/// transaction (for SQLite, the connection thread). Backend failures are
/// returned as [`crate::Error::Store`].
pub trait ContactLedger {
  /// All contacts whose email equals `email` or whose phone number equals
  /// `phone_number`, oldest first. An absent side matches nothing.
  fn find_by_identifiers(
    &mut self,
    email: Option<&str>,
    phone_number: Option<&str>,
  ) -> Result<Vec<Contact>>;

  /// Fetch a single contact by id.
  fn get(&mut self, id: ContactId) -> Result<Option<Contact>>;

  /// Every contact whose `linked_id` is `id`, oldest first.
  fn linked_to(&mut self, id: ContactId) -> Result<Vec<Contact>>;

  /// Persist a new contact, assigning its id and timestamps.
  fn insert(&mut self, input: NewContact) -> Result<Contact>;

  /// Overwrite the link fields of `id` and refresh its `updated_at`.
  fn update(&mut self, id: ContactId, update: LinkUpdate) -> Result<()>;

  /// Apply a [`Merge`]: demote the losing primary and repoint its
  /// secondaries. Returns the number of contacts touched.
  ///
  /// Backends with set-based updates should override this.
  fn merge(&mut self, merge: Merge) -> Result<usize> {
    let followers = self.linked_to(merge.losing)?;
    let relink = LinkUpdate::secondary_of(merge.surviving);

    self.update(merge.losing, relink)?;
    for follower in &followers {
      self.update(follower.id, relink)?;
    }

    Ok(followers.len() + 1)
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Abstraction over a Knot contact store backend.
///
/// All writes go through [`ContactStore::transaction`], which must isolate
/// concurrent transactions that touch overlapping identifiers. Contacts are
/// never deleted.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ContactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Run `work` inside one store transaction. The transaction commits when
  /// `work` returns `Ok` and rolls back otherwise.
  fn transaction<R, F>(
    &self,
    work: F,
  ) -> impl Future<Output = Result<R>> + Send + '_
  where
    F: FnOnce(&mut dyn ContactLedger) -> Result<R> + Send + 'static,
    R: Send + 'static;

  /// Retrieve a contact by id outside of any transaction.
  fn get_contact(
    &self,
    id: ContactId,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Every stored contact, oldest first.
  fn list_contacts(
    &self,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;
}
