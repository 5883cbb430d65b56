//! [`SqliteStore`] — the SQLite implementation of [`ContactStore`].

use std::path::Path;

use rusqlite::TransactionBehavior;

use knot_core::{
  contact::{Contact, ContactId},
  store::{ContactLedger, ContactStore},
};

use crate::{
  Error, Result,
  encode::{RawContact, decode_all},
  ledger::{SqliteLedger, select_contact, select_contacts},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Knot contact store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ContactStore impl ───────────────────────────────────────────────────────

impl ContactStore for SqliteStore {
  type Error = Error;

  /// Runs `work` on the connection thread inside `BEGIN IMMEDIATE`, so the
  /// write lock is held from the first match query until commit.
  async fn transaction<R, F>(&self, work: F) -> knot_core::Result<R>
  where
    F: FnOnce(&mut dyn ContactLedger) -> knot_core::Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut ledger = SqliteLedger::new(&tx);
        match work(&mut ledger) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          // Dropping `tx` rolls back.
          Err(err) => Ok(Err(err)),
        }
      })
      .await
      .map_err(|e| knot_core::Error::store(Error::from(e)))?;

    if outcome.is_err() {
      tracing::debug!("transaction rolled back");
    }
    outcome
  }

  async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>> {
    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| Ok(select_contact(conn, id)?))
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn list_contacts(&self) -> Result<Vec<Contact>> {
    let raws: Vec<RawContact> = self
      .conn
      .call(|conn| Ok(select_contacts(conn, "ORDER BY created_at, id", [])?))
      .await?;

    decode_all(raws)
  }
}
