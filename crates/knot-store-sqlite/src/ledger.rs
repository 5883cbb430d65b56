//! [`SqliteLedger`] — the transaction-scoped [`ContactLedger`] handed to the
//! reconciler.

use chrono::{SubsecRound as _, Utc};
use rusqlite::{Connection, OptionalExtension as _, params};

use knot_core::{
  contact::{Contact, ContactId, LinkPrecedence, LinkUpdate, Merge, NewContact},
  store::ContactLedger,
};

use crate::{
  Result,
  encode::{CONTACT_COLUMNS, RawContact, decode_all, encode_dt, encode_precedence},
};

// ─── Shared queries ──────────────────────────────────────────────────────────

/// Run `SELECT <contact columns> FROM contacts <tail>` and collect the rows.
pub(crate) fn select_contacts(
  conn: &Connection,
  tail: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<RawContact>> {
  let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts {tail}");
  let mut stmt = conn.prepare_cached(&sql)?;
  let rows = stmt
    .query_map(params, RawContact::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub(crate) fn select_contact(
  conn: &Connection,
  id: ContactId,
) -> rusqlite::Result<Option<RawContact>> {
  conn
    .query_row(
      &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
      params![id.0],
      RawContact::from_row,
    )
    .optional()
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// Borrows the connection of an open transaction. Never commits or rolls back
/// itself; the owner of the transaction decides.
pub struct SqliteLedger<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteLedger<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn find(
    &self,
    email: Option<&str>,
    phone_number: Option<&str>,
  ) -> Result<Vec<Contact>> {
    // `column = NULL` is never true, so an absent side matches nothing.
    let raws = select_contacts(
      self.conn,
      "WHERE email = ?1 OR phone_number = ?2 ORDER BY created_at, id",
      params![email, phone_number],
    )?;
    decode_all(raws)
  }

  fn fetch(&self, id: ContactId) -> Result<Option<Contact>> {
    select_contact(self.conn, id)?
      .map(RawContact::into_contact)
      .transpose()
  }

  fn followers(&self, id: ContactId) -> Result<Vec<Contact>> {
    let raws = select_contacts(
      self.conn,
      "WHERE linked_id = ?1 ORDER BY created_at, id",
      params![id.0],
    )?;
    decode_all(raws)
  }

  fn insert_row(&self, input: NewContact) -> Result<Contact> {
    // Truncated to the stored precision so the returned row equals a re-read.
    let now = Utc::now().trunc_subsecs(6);
    let at_str = encode_dt(now);

    self.conn.execute(
      "INSERT INTO contacts (
         email, phone_number, linked_id, link_precedence, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
      params![
        input.email,
        input.phone_number,
        input.linked_id.map(|id| id.0),
        encode_precedence(input.link_precedence),
        at_str,
      ],
    )?;

    Ok(Contact {
      id:              ContactId(self.conn.last_insert_rowid()),
      email:           input.email,
      phone_number:    input.phone_number,
      linked_id:       input.linked_id,
      link_precedence: input.link_precedence,
      created_at:      now,
      updated_at:      now,
    })
  }

  fn update_row(&self, id: ContactId, update: LinkUpdate) -> Result<()> {
    self.conn.execute(
      "UPDATE contacts
         SET link_precedence = ?2, linked_id = ?3, updated_at = ?4
       WHERE id = ?1",
      params![
        id.0,
        encode_precedence(update.link_precedence),
        update.linked_id.map(|l| l.0),
        encode_dt(Utc::now()),
      ],
    )?;
    Ok(())
  }

  /// Demotion and repointing as two set-based statements.
  fn merge_rows(&self, merge: Merge) -> Result<usize> {
    let at_str = encode_dt(Utc::now());
    let secondary = encode_precedence(LinkPrecedence::Secondary);

    let repointed = self.conn.execute(
      "UPDATE contacts SET linked_id = ?1, updated_at = ?3 WHERE linked_id = ?2",
      params![merge.surviving.0, merge.losing.0, at_str],
    )?;
    let demoted = self.conn.execute(
      "UPDATE contacts
         SET link_precedence = ?3, linked_id = ?1, updated_at = ?4
       WHERE id = ?2",
      params![merge.surviving.0, merge.losing.0, secondary, at_str],
    )?;

    Ok(repointed + demoted)
  }
}

impl ContactLedger for SqliteLedger<'_> {
  fn find_by_identifiers(
    &mut self,
    email: Option<&str>,
    phone_number: Option<&str>,
  ) -> knot_core::Result<Vec<Contact>> {
    self
      .find(email, phone_number)
      .map_err(knot_core::Error::store)
  }

  fn get(&mut self, id: ContactId) -> knot_core::Result<Option<Contact>> {
    self.fetch(id).map_err(knot_core::Error::store)
  }

  fn linked_to(&mut self, id: ContactId) -> knot_core::Result<Vec<Contact>> {
    self.followers(id).map_err(knot_core::Error::store)
  }

  fn insert(&mut self, input: NewContact) -> knot_core::Result<Contact> {
    self.insert_row(input).map_err(knot_core::Error::store)
  }

  fn update(
    &mut self,
    id: ContactId,
    update: LinkUpdate,
  ) -> knot_core::Result<()> {
    self.update_row(id, update).map_err(knot_core::Error::store)
  }

  fn merge(&mut self, merge: Merge) -> knot_core::Result<usize> {
    let touched = self.merge_rows(merge).map_err(knot_core::Error::store)?;
    tracing::debug!(
      surviving = %merge.surviving,
      losing = %merge.losing,
      touched,
      "applied merge"
    );
    Ok(touched)
  }
}
