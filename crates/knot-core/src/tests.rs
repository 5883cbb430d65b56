//! Reconciliation tests against an in-memory store.

use std::{
  convert::Infallible,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
  ConsistencyViolation, Error, Outcome, Reconciler, Result, ValidationError,
  audit,
  contact::{Contact, ContactId, LinkPrecedence, LinkUpdate, Merge, NewContact},
  identifiers::Identifiers,
  store::{ContactLedger, ContactStore},
};

// ─── In-memory backend ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct MemoryLedger {
  contacts: Vec<Contact>,
  next_id:  i64,
  tick:     i64,
  inserts:  usize,
  updates:  usize,
}

fn at(secs: i64) -> DateTime<Utc> {
  Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
}

impl MemoryLedger {
  fn now(&mut self) -> DateTime<Utc> {
    self.tick += 1;
    at(self.tick)
  }

  /// Place a contact verbatim, bypassing the reconciler.
  fn seed(&mut self, contact: Contact) {
    self.next_id = self.next_id.max(contact.id.0);
    self.contacts.push(contact);
  }
}

impl ContactLedger for MemoryLedger {
  fn find_by_identifiers(
    &mut self,
    email: Option<&str>,
    phone_number: Option<&str>,
  ) -> Result<Vec<Contact>> {
    let mut found: Vec<Contact> = self
      .contacts
      .iter()
      .filter(|c| {
        (email.is_some() && c.email.as_deref() == email)
          || (phone_number.is_some() && c.phone_number.as_deref() == phone_number)
      })
      .cloned()
      .collect();
    found.sort_by_key(Contact::seniority);
    Ok(found)
  }

  fn get(&mut self, id: ContactId) -> Result<Option<Contact>> {
    Ok(self.contacts.iter().find(|c| c.id == id).cloned())
  }

  fn linked_to(&mut self, id: ContactId) -> Result<Vec<Contact>> {
    let mut found: Vec<Contact> = self
      .contacts
      .iter()
      .filter(|c| c.linked_id == Some(id))
      .cloned()
      .collect();
    found.sort_by_key(Contact::seniority);
    Ok(found)
  }

  fn insert(&mut self, input: NewContact) -> Result<Contact> {
    self.next_id += 1;
    let now = self.now();
    let contact = Contact {
      id:              ContactId(self.next_id),
      email:           input.email,
      phone_number:    input.phone_number,
      linked_id:       input.linked_id,
      link_precedence: input.link_precedence,
      created_at:      now,
      updated_at:      now,
    };
    self.inserts += 1;
    self.contacts.push(contact.clone());
    Ok(contact)
  }

  fn update(&mut self, id: ContactId, update: LinkUpdate) -> Result<()> {
    let now = self.now();
    if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == id) {
      contact.link_precedence = update.link_precedence;
      contact.linked_id = update.linked_id;
      contact.updated_at = now;
      self.updates += 1;
    }
    Ok(())
  }
}

/// Commits by swapping in the ledger copy the closure worked on.
#[derive(Default)]
struct MemoryStore {
  ledger:       Mutex<MemoryLedger>,
  transactions: AtomicUsize,
}

impl MemoryStore {
  fn snapshot(&self) -> MemoryLedger { self.ledger.lock().unwrap().clone() }

  fn seed(&self, contact: Contact) { self.ledger.lock().unwrap().seed(contact) }

  fn writes(&self) -> usize {
    let ledger = self.ledger.lock().unwrap();
    ledger.inserts + ledger.updates
  }
}

impl ContactStore for MemoryStore {
  type Error = Infallible;

  async fn transaction<R, F>(&self, work: F) -> Result<R>
  where
    F: FnOnce(&mut dyn ContactLedger) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    self.transactions.fetch_add(1, Ordering::SeqCst);
    let mut committed = self.ledger.lock().unwrap();
    let mut draft = committed.clone();
    let value = work(&mut draft)?;
    *committed = draft;
    Ok(value)
  }

  async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>, Infallible> {
    Ok(self.snapshot().contacts.into_iter().find(|c| c.id == id))
  }

  async fn list_contacts(&self) -> Result<Vec<Contact>, Infallible> {
    let mut contacts = self.snapshot().contacts;
    contacts.sort_by_key(Contact::seniority);
    Ok(contacts)
  }
}

fn reconciler() -> Reconciler<MemoryStore> {
  Reconciler::new(std::sync::Arc::new(MemoryStore::default()))
}

fn ids(email: Option<&str>, phone: Option<&str>) -> Identifiers {
  Identifiers::new(email.map(str::to_owned), phone.map(str::to_owned)).unwrap()
}

fn row(
  id: i64,
  secs: i64,
  email: Option<&str>,
  phone: Option<&str>,
  linked: Option<i64>,
) -> Contact {
  Contact {
    id:              ContactId(id),
    email:           email.map(str::to_owned),
    phone_number:    phone.map(str::to_owned),
    linked_id:       linked.map(ContactId),
    link_precedence: if linked.is_some() {
      LinkPrecedence::Secondary
    } else {
      LinkPrecedence::Primary
    },
    created_at:      at(secs),
    updated_at:      at(secs),
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_identity_creates_single_primary() {
  let r = reconciler();

  let view = r.identify(Some("a@x.com".into()), None).await.unwrap();

  assert_eq!(view.emails, ["a@x.com"]);
  assert!(view.phone_numbers.is_empty());
  assert!(view.secondary_contact_ids.is_empty());

  let contacts = r.store().list_contacts().await.unwrap();
  assert_eq!(contacts.len(), 1);
  assert_eq!(contacts[0].id, view.primary_contact_id);
  assert!(contacts[0].is_primary());
  assert_eq!(contacts[0].linked_id, None);
}

#[tokio::test]
async fn unrelated_identities_stay_apart() {
  let r = reconciler();

  let a = r.identify(Some("a@x.com".into()), Some("1".into())).await.unwrap();
  let b = r.identify(Some("b@x.com".into()), Some("2".into())).await.unwrap();

  assert_ne!(a.primary_contact_id, b.primary_contact_id);
  assert_eq!(r.store().list_contacts().await.unwrap().len(), 2);
}

// ─── Idempotence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeat_request_issues_no_writes() {
  let r = reconciler();
  let first = r
    .reconcile(ids(Some("lorraine@hillvalley.edu"), Some("123456")))
    .await
    .unwrap();
  assert_eq!(first.outcome, Outcome::Created);
  let writes = r.store().writes();

  let second = r
    .reconcile(ids(Some("lorraine@hillvalley.edu"), Some("123456")))
    .await
    .unwrap();

  assert_eq!(second.outcome, Outcome::Unchanged);
  assert!(!second.outcome.wrote());
  assert_eq!(second.contact, first.contact);
  assert_eq!(r.store().writes(), writes);
}

#[tokio::test]
async fn partial_request_of_known_identity_is_a_no_op() {
  let r = reconciler();
  r.identify(Some("lorraine@hillvalley.edu".into()), Some("123456".into()))
    .await
    .unwrap();
  r.identify(Some("mcfly@hillvalley.edu".into()), Some("123456".into()))
    .await
    .unwrap();
  let writes = r.store().writes();

  // Each of these matches an existing record and adds nothing.
  for (email, phone) in [
    (None, Some("123456")),
    (Some("mcfly@hillvalley.edu"), None),
    (Some("lorraine@hillvalley.edu"), None),
  ] {
    let result = r.reconcile(ids(email, phone)).await.unwrap();
    assert_eq!(result.outcome, Outcome::Unchanged);
    assert_eq!(result.contact.emails, [
      "lorraine@hillvalley.edu",
      "mcfly@hillvalley.edu"
    ]);
  }
  assert_eq!(r.store().writes(), writes);
}

// ─── Attach ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_phone_attaches_secondary() {
  let r = reconciler();
  let primary = r
    .identify(Some("e1@x.com".into()), Some("p1".into()))
    .await
    .unwrap()
    .primary_contact_id;

  let result = r.reconcile(ids(Some("e1@x.com"), Some("p2"))).await.unwrap();

  let Outcome::Attached { secondary } = result.outcome else {
    panic!("expected attach, got {:?}", result.outcome);
  };
  assert_eq!(result.contact.primary_contact_id, primary);
  assert_eq!(result.contact.emails, ["e1@x.com"]);
  assert_eq!(result.contact.phone_numbers, ["p1", "p2"]);
  assert_eq!(result.contact.secondary_contact_ids, [secondary]);

  let stored = r.store().get_contact(secondary).await.unwrap().unwrap();
  assert_eq!(stored.link_precedence, LinkPrecedence::Secondary);
  assert_eq!(stored.linked_id, Some(primary));
  assert_eq!(stored.email.as_deref(), Some("e1@x.com"));
  assert_eq!(stored.phone_number.as_deref(), Some("p2"));
}

#[tokio::test]
async fn match_through_secondary_resolves_to_primary() {
  let r = reconciler();
  let primary = r
    .identify(Some("e1@x.com".into()), Some("p1".into()))
    .await
    .unwrap()
    .primary_contact_id;
  r.identify(Some("e2@x.com".into()), Some("p1".into())).await.unwrap();

  // Only the secondary carries e2; the new phone attaches to the primary.
  let result = r.reconcile(ids(Some("e2@x.com"), Some("p3"))).await.unwrap();

  assert!(matches!(result.outcome, Outcome::Attached { .. }));
  assert_eq!(result.contact.primary_contact_id, primary);
  assert_eq!(result.contact.emails, ["e1@x.com", "e2@x.com"]);
  assert_eq!(result.contact.phone_numbers, ["p1", "p3"]);
  assert_eq!(result.contact.secondary_contact_ids.len(), 2);
  audit::verify(&r.store().list_contacts().await.unwrap()).unwrap();
}

// ─── Merge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bridging_request_merges_younger_cluster() {
  let r = reconciler();
  let a = r
    .identify(Some("e1@x.com".into()), Some("p1".into()))
    .await
    .unwrap()
    .primary_contact_id;
  let b = r
    .identify(Some("e2@x.com".into()), Some("p2".into()))
    .await
    .unwrap()
    .primary_contact_id;
  let Outcome::Attached { secondary: b_child } = r
    .reconcile(ids(Some("e2@x.com"), Some("p3")))
    .await
    .unwrap()
    .outcome
  else {
    panic!("expected attach");
  };

  let result = r.reconcile(ids(Some("e1@x.com"), Some("p2"))).await.unwrap();

  assert_eq!(result.outcome, Outcome::Merged {
    demoted:  vec![b],
    attached: None,
  });
  assert_eq!(result.contact.primary_contact_id, a);
  assert_eq!(result.contact.emails, ["e1@x.com", "e2@x.com"]);
  assert_eq!(result.contact.phone_numbers, ["p1", "p2", "p3"]);
  assert_eq!(result.contact.secondary_contact_ids, [b, b_child]);

  let demoted = r.store().get_contact(b).await.unwrap().unwrap();
  assert_eq!(demoted.link_precedence, LinkPrecedence::Secondary);
  assert_eq!(demoted.linked_id, Some(a));
  let child = r.store().get_contact(b_child).await.unwrap().unwrap();
  assert_eq!(child.linked_id, Some(a));

  assert_eq!(r.audit().await.unwrap(), 3);
}

#[tokio::test]
async fn older_primary_survives_regardless_of_match_side() {
  let r = reconciler();
  let old = r
    .identify(None, Some("p-old".into()))
    .await
    .unwrap()
    .primary_contact_id;
  let young = r
    .identify(Some("young@x.com".into()), None)
    .await
    .unwrap()
    .primary_contact_id;

  let view = r
    .identify(Some("young@x.com".into()), Some("p-old".into()))
    .await
    .unwrap();

  assert_eq!(view.primary_contact_id, old);
  assert_eq!(view.secondary_contact_ids, [young]);
  assert_eq!(view.emails, ["young@x.com"]);
  assert_eq!(view.phone_numbers, ["p-old"]);
}

#[tokio::test]
async fn equal_age_breaks_tie_on_lowest_id() {
  let r = reconciler();
  r.store().seed(row(5, 0, Some("five@x.com"), None, None));
  r.store().seed(row(3, 0, None, Some("333"), None));

  let result = r.reconcile(ids(Some("five@x.com"), Some("333"))).await.unwrap();

  assert_eq!(result.contact.primary_contact_id, ContactId(3));
  assert_eq!(result.outcome, Outcome::Merged {
    demoted:  vec![ContactId(5)],
    attached: None,
  });
}

#[tokio::test]
async fn three_clusters_collapse_into_oldest() {
  // Two primaries sharing an email can only come from writes made outside
  // the reconciler; they are still merged rather than rejected.
  let r = reconciler();
  r.store().seed(row(1, 10, Some("shared@x.com"), None, None));
  r.store().seed(row(2, 5, Some("shared@x.com"), Some("200"), None));
  r.store().seed(row(3, 20, None, Some("300"), None));
  r.store().seed(row(4, 30, Some("child@x.com"), Some("300"), Some(3)));

  let result = r.reconcile(ids(Some("shared@x.com"), Some("300"))).await.unwrap();

  assert_eq!(result.contact.primary_contact_id, ContactId(2));
  assert_eq!(result.outcome, Outcome::Merged {
    demoted:  vec![ContactId(1), ContactId(3)],
    attached: None,
  });
  assert_eq!(result.contact.secondary_contact_ids, [
    ContactId(1),
    ContactId(3),
    ContactId(4)
  ]);
  assert_eq!(result.contact.emails, ["shared@x.com", "child@x.com"]);
  assert_eq!(result.contact.phone_numbers, ["200", "300"]);
  audit::verify(&r.store().list_contacts().await.unwrap()).unwrap();
}

#[test]
fn default_merge_repoints_followers() {
  let mut ledger = MemoryLedger::default();
  ledger.seed(row(1, 0, Some("a@x.com"), None, None));
  ledger.seed(row(2, 1, Some("b@x.com"), None, None));
  ledger.seed(row(3, 2, Some("c@x.com"), None, Some(2)));
  ledger.seed(row(4, 3, Some("d@x.com"), None, Some(2)));

  let touched = ledger
    .merge(Merge {
      surviving: ContactId(1),
      losing:    ContactId(2),
    })
    .unwrap();

  assert_eq!(touched, 3);
  assert!(ledger.linked_to(ContactId(2)).unwrap().is_empty());
  assert_eq!(ledger.linked_to(ContactId(1)).unwrap().len(), 3);
  audit::verify(&ledger.contacts).unwrap();
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_identifiers_never_reach_the_store() {
  let r = reconciler();

  let err = r.identify(None, None).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Validation(ValidationError::MissingIdentifier)
  ));

  let err = r.identify(Some(" ".into()), Some(String::new())).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  assert_eq!(r.store().transactions.load(Ordering::SeqCst), 0);
}

// ─── Consistency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn chained_link_is_surfaced_and_rolled_back() {
  let r = reconciler();
  r.store().seed(row(1, 0, Some("root@x.com"), None, None));
  r.store().seed(row(2, 1, Some("mid@x.com"), None, Some(1)));
  r.store().seed(row(3, 2, Some("leaf@x.com"), None, Some(2)));
  let before = r.store().snapshot().contacts;

  let err = r.identify(Some("leaf@x.com".into()), Some("new".into())).await.unwrap_err();

  assert!(matches!(
    err,
    Error::Consistency(ConsistencyViolation::ChainedLink {
      contact: ContactId(3),
      linked:  ContactId(2),
    })
  ));
  assert_eq!(r.store().snapshot().contacts, before);
}

#[tokio::test]
async fn dangling_link_is_surfaced() {
  let r = reconciler();
  r.store().seed(row(2, 1, Some("orphan@x.com"), None, Some(99)));

  let err = r.identify(Some("orphan@x.com".into()), None).await.unwrap_err();

  assert!(matches!(
    err,
    Error::Consistency(ConsistencyViolation::DanglingLink {
      contact: ContactId(2),
      linked:  ContactId(99),
    })
  ));
}

#[tokio::test]
async fn audit_reports_primary_younger_than_member() {
  let r = reconciler();
  r.store().seed(row(1, 50, Some("p@x.com"), None, None));
  r.store().seed(row(2, 10, Some("s@x.com"), None, Some(1)));

  let err = r.audit().await.unwrap_err();
  assert!(matches!(
    err,
    Error::Consistency(ConsistencyViolation::PrimaryNotOldest {
      primary: ContactId(1),
      member:  ContactId(2),
    })
  ));
}

#[test]
fn audit_reports_malformed_and_empty_rows() {
  let mut primary_with_link = row(1, 0, Some("a@x.com"), None, None);
  primary_with_link.linked_id = Some(ContactId(7));
  assert_eq!(
    audit::verify(&[primary_with_link]),
    Err(ConsistencyViolation::MalformedLink { contact: ContactId(1) })
  );

  assert_eq!(
    audit::verify(&[row(1, 0, None, None, None)]),
    Err(ConsistencyViolation::MissingIdentifiers { contact: ContactId(1) })
  );
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lookup_by_any_member_returns_cluster() {
  let r = reconciler();
  let primary = r
    .identify(Some("e1@x.com".into()), Some("p1".into()))
    .await
    .unwrap()
    .primary_contact_id;
  let view = r
    .identify(Some("e1@x.com".into()), Some("p2".into()))
    .await
    .unwrap();
  let writes = r.store().writes();

  let by_secondary = r
    .lookup(view.secondary_contact_ids[0])
    .await
    .unwrap()
    .unwrap();
  let by_primary = r.lookup(primary).await.unwrap().unwrap();

  assert_eq!(by_secondary, view);
  assert_eq!(by_primary, view);
  assert!(r.lookup(ContactId(404)).await.unwrap().is_none());
  assert_eq!(r.store().writes(), writes);
}
