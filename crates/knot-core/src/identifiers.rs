//! Validated partial identifiers submitted for reconciliation.

use crate::{ValidationError, contact::Contact};

/// An email, a phone number, or both. Construction guarantees at least one is
/// present and that neither is blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifiers {
  email:        Option<String>,
  phone_number: Option<String>,
}

impl Identifiers {
  /// Trim both inputs, treat blank strings as absent, and reject requests
  /// that carry nothing to match on.
  pub fn new(
    email: Option<String>,
    phone_number: Option<String>,
  ) -> Result<Self, ValidationError> {
    let email = normalize(email);
    let phone_number = normalize(phone_number);

    if email.is_none() && phone_number.is_none() {
      return Err(ValidationError::MissingIdentifier);
    }
    if let Some(address) = &email
      && !looks_like_email(address)
    {
      return Err(ValidationError::MalformedEmail(address.clone()));
    }

    Ok(Self { email, phone_number })
  }

  pub fn email(&self) -> Option<&str> { self.email.as_deref() }

  pub fn phone_number(&self) -> Option<&str> { self.phone_number.as_deref() }

  /// True when every identifier in `self` already appears somewhere in
  /// `members`.
  pub fn covered_by(&self, members: &[Contact]) -> bool {
    let email_known = self.email().is_none_or(|e| {
      members.iter().any(|c| c.email.as_deref() == Some(e))
    });
    let phone_known = self.phone_number().is_none_or(|p| {
      members.iter().any(|c| c.phone_number.as_deref() == Some(p))
    });
    email_known && phone_known
  }

  pub fn into_parts(self) -> (Option<String>, Option<String>) {
    (self.email, self.phone_number)
  }
}

fn normalize(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

fn looks_like_email(address: &str) -> bool {
  match address.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !address.chars().any(char::is_whitespace)
    }
    None => false,
  }
}
