//! Whole-store invariant check.

use std::collections::HashMap;

use crate::{
  ConsistencyViolation,
  contact::{Contact, ContactId},
};

/// Verify the cluster discipline over a full snapshot of the store:
///
/// - every contact has an email or a phone number;
/// - precedence and `linked_id` agree;
/// - every link lands on an existing primary (no chains, no dangling ids),
///   which makes each cluster single-primary;
/// - no secondary is older than its primary.
///
/// Returns the first violation found, in snapshot order.
pub fn verify(contacts: &[Contact]) -> Result<(), ConsistencyViolation> {
  let by_id: HashMap<ContactId, &Contact> =
    contacts.iter().map(|c| (c.id, c)).collect();

  for contact in contacts {
    if contact.email.is_none() && contact.phone_number.is_none() {
      return Err(ConsistencyViolation::MissingIdentifiers {
        contact: contact.id,
      });
    }

    let claimed = contact
      .claimed_primary()
      .ok_or(ConsistencyViolation::MalformedLink { contact: contact.id })?;
    if claimed == contact.id {
      continue;
    }

    let primary = by_id.get(&claimed).ok_or(
      ConsistencyViolation::DanglingLink {
        contact: contact.id,
        linked:  claimed,
      },
    )?;
    if !primary.is_primary() {
      return Err(ConsistencyViolation::ChainedLink {
        contact: contact.id,
        linked:  claimed,
      });
    }
    if contact.seniority() < primary.seniority() {
      return Err(ConsistencyViolation::PrimaryNotOldest {
        primary: primary.id,
        member:  contact.id,
      });
    }
  }

  Ok(())
}
