//! Identity reconciliation.
//!
//! [`reconcile`] is the whole algorithm: it runs against a [`ContactLedger`]
//! inside one store transaction, decides between create / attach / merge /
//! no-op, and returns the consolidated view of the resulting cluster.
//! [`Reconciler`] wraps it for async callers.

use std::sync::Arc;

use crate::{
  ConsistencyViolation, Error, Result,
  audit,
  contact::{Contact, ContactId, Merge, NewContact},
  identifiers::Identifiers,
  store::{ContactLedger, ContactStore},
  view::ConsolidatedContact,
};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What a reconciliation did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Nothing matched; a new primary was created.
  Created,
  /// The request added information to a single cluster.
  Attached { secondary: ContactId },
  /// The request bridged clusters. `demoted` lists the former primaries in
  /// the order they were merged; `attached` is set when a secondary was also
  /// inserted afterwards.
  Merged {
    demoted:  Vec<ContactId>,
    attached: Option<ContactId>,
  },
  /// The request was already fully represented.
  Unchanged,
}

impl Outcome {
  pub fn wrote(&self) -> bool { !matches!(self, Self::Unchanged) }
}

/// The consolidated view plus the [`Outcome`] that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
  pub contact: ConsolidatedContact,
  pub outcome: Outcome,
}

// ─── Algorithm ───────────────────────────────────────────────────────────────

/// Reconcile `identifiers` against the store behind `ledger`.
///
/// Must run inside a transaction: the match query and all writes have to be
/// atomic with respect to other reconciliations.
pub fn reconcile(
  ledger: &mut dyn ContactLedger,
  identifiers: &Identifiers,
) -> Result<Reconciliation> {
  let mut matches = ledger
    .find_by_identifiers(identifiers.email(), identifiers.phone_number())?
    .into_iter();

  let Some(first) = matches.next() else {
    let (email, phone_number) = identifiers.clone().into_parts();
    let primary = ledger.insert(NewContact::primary(email, phone_number))?;
    return Ok(Reconciliation {
      contact: ConsolidatedContact::from_cluster(&primary, &[]),
      outcome: Outcome::Created,
    });
  };

  let mut primaries = vec![resolve_primary(ledger, first)?];
  for contact in matches {
    let primary = resolve_primary(ledger, contact)?;
    if !primaries.iter().any(|p| p.id == primary.id) {
      primaries.push(primary);
    }
  }
  primaries.sort_by_key(Contact::seniority);
  let surviving = primaries.remove(0);

  let mut demoted = Vec::new();
  for losing in primaries {
    let touched = ledger.merge(Merge {
      surviving: surviving.id,
      losing:    losing.id,
    })?;
    tracing::debug!(
      surviving = %surviving.id,
      losing = %losing.id,
      touched,
      "merged clusters"
    );
    demoted.push(losing.id);
  }

  let mut secondaries = load_secondaries(ledger, &surviving)?;

  let attached = if covered(identifiers, &surviving, &secondaries) {
    None
  } else {
    let (email, phone_number) = identifiers.clone().into_parts();
    let secondary = ledger
      .insert(NewContact::secondary(email, phone_number, surviving.id))?;
    secondaries = load_secondaries(ledger, &surviving)?;
    Some(secondary.id)
  };

  let outcome = match (demoted.is_empty(), attached) {
    (true, None) => Outcome::Unchanged,
    (true, Some(secondary)) => Outcome::Attached { secondary },
    (false, attached) => Outcome::Merged { demoted, attached },
  };

  Ok(Reconciliation {
    contact: ConsolidatedContact::from_cluster(&surviving, &secondaries),
    outcome,
  })
}

/// Consolidated view of the cluster containing `id`, without writing.
pub fn lookup(
  ledger: &mut dyn ContactLedger,
  id: ContactId,
) -> Result<Option<ConsolidatedContact>> {
  let Some(contact) = ledger.get(id)? else {
    return Ok(None);
  };
  let primary = resolve_primary(ledger, contact)?;
  let secondaries = load_secondaries(ledger, &primary)?;
  Ok(Some(ConsolidatedContact::from_cluster(&primary, &secondaries)))
}

/// Follow at most one link from `contact` to its cluster primary.
fn resolve_primary(
  ledger: &mut dyn ContactLedger,
  contact: Contact,
) -> Result<Contact> {
  let claimed = contact
    .claimed_primary()
    .ok_or(ConsistencyViolation::MalformedLink { contact: contact.id })?;
  if claimed == contact.id {
    return Ok(contact);
  }

  let linked = ledger.get(claimed)?.ok_or(ConsistencyViolation::DanglingLink {
    contact: contact.id,
    linked:  claimed,
  })?;
  if !linked.is_primary() {
    return Err(
      ConsistencyViolation::ChainedLink {
        contact: contact.id,
        linked:  linked.id,
      }
      .into(),
    );
  }
  Ok(linked)
}

/// The secondaries of `primary`, checked to be flat.
fn load_secondaries(
  ledger: &mut dyn ContactLedger,
  primary: &Contact,
) -> Result<Vec<Contact>> {
  if !primary.is_primary() {
    return Err(ConsistencyViolation::NotPrimary { contact: primary.id }.into());
  }
  let secondaries = ledger.linked_to(primary.id)?;
  if let Some(bad) = secondaries.iter().find(|c| c.is_primary()) {
    return Err(ConsistencyViolation::MalformedLink { contact: bad.id }.into());
  }
  Ok(secondaries)
}

fn covered(
  identifiers: &Identifiers,
  primary: &Contact,
  secondaries: &[Contact],
) -> bool {
  let mut members = Vec::with_capacity(secondaries.len() + 1);
  members.push(primary.clone());
  members.extend_from_slice(secondaries);
  identifiers.covered_by(&members)
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

/// Async front door to the reconciliation algorithm over any
/// [`ContactStore`]. Stateless between calls; cloning is cheap.
pub struct Reconciler<S> {
  store: Arc<S>,
}

impl<S> Clone for Reconciler<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}

impl<S: ContactStore> Reconciler<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Reconcile a partial identifier and return the consolidated contact.
  ///
  /// Validation happens before the store is touched.
  pub async fn identify(
    &self,
    email: Option<String>,
    phone_number: Option<String>,
  ) -> Result<ConsolidatedContact> {
    let identifiers = Identifiers::new(email, phone_number)?;
    Ok(self.reconcile(identifiers).await?.contact)
  }

  /// Like [`Reconciler::identify`], but also report what was written.
  pub async fn reconcile(
    &self,
    identifiers: Identifiers,
  ) -> Result<Reconciliation> {
    let result = self
      .store
      .transaction(move |ledger| reconcile(ledger, &identifiers))
      .await?;

    let primary = result.contact.primary_contact_id;
    match &result.outcome {
      Outcome::Unchanged => {
        tracing::debug!(%primary, "identify: already known");
      }
      outcome => {
        tracing::info!(%primary, ?outcome, "identify: cluster updated");
      }
    }
    Ok(result)
  }

  /// Consolidated view of the cluster containing `id`; `None` if unknown.
  pub async fn lookup(
    &self,
    id: ContactId,
  ) -> Result<Option<ConsolidatedContact>> {
    self
      .store
      .transaction(move |ledger| lookup(ledger, id))
      .await
  }

  /// Check every stored contact against the cluster invariants. Returns the
  /// number of contacts inspected.
  pub async fn audit(&self) -> Result<usize> {
    let contacts = self.store.list_contacts().await.map_err(Error::store)?;
    audit::verify(&contacts)?;
    Ok(contacts.len())
  }
}
