//! Account lifecycle helpers: password hashing, registration validation,
//! password change and parent-name recovery.
//!
//! These are pure record-level rules; storage and session handling live
//! in `state` and `sessions`.

use crate::domain::AccountRecord;
use crate::util::sha256_hex;

/// Hash a password for storage. Only the hash is ever persisted.
pub fn hash_password(password: &str) -> String {
  sha256_hex(password)
}

/// Compare a candidate password against the stored hash.
pub fn verify_password(account: &AccountRecord, password: &str) -> bool {
  account.password_hash == sha256_hex(password)
}

/// Fields collected at registration. Profile fields may be blank; the
/// parent names double as the password-recovery challenge.
pub struct Registration<'a> {
  pub password: &'a str,
  pub confirm: &'a str,
  pub birth_date: &'a str,
  pub birth_place: &'a str,
  pub father_name: &'a str,
  pub mother_name: &'a str,
}

/// Validate a registration and build the stored record.
pub fn new_account(reg: &Registration<'_>) -> Result<AccountRecord, String> {
  if reg.password.is_empty() {
    return Err("password must not be empty".to_string());
  }
  if reg.password != reg.confirm {
    return Err("passwords do not match".to_string());
  }
  Ok(AccountRecord {
    password_hash: hash_password(reg.password),
    birth_date: reg.birth_date.trim().to_string(),
    birth_place: reg.birth_place.trim().to_string(),
    father_name: reg.father_name.trim().to_string(),
    mother_name: reg.mother_name.trim().to_string(),
    plan: None,
    plan_start: None,
    activation_id: None,
    remember_token: None,
    usage: Default::default(),
  })
}

/// Change the password after checking the current one.
pub fn change_password(
  account: &mut AccountRecord,
  current: &str,
  new: &str,
  confirm: &str,
) -> Result<(), String> {
  if !verify_password(account, current) {
    return Err("current password is wrong".to_string());
  }
  if new.is_empty() {
    return Err("password must not be empty".to_string());
  }
  if new != confirm {
    return Err("passwords do not match".to_string());
  }
  account.password_hash = hash_password(new);
  Ok(())
}

/// Recovery challenge: both parent names must match the profile after
/// trimming. Accounts without both names on file cannot be recovered
/// this way.
pub fn recovery_matches(account: &AccountRecord, father: &str, mother: &str) -> bool {
  if account.father_name.is_empty() || account.mother_name.is_empty() {
    return false;
  }
  account.father_name == father.trim() && account.mother_name == mother.trim()
}

/// Set a new password from the recovery flow.
pub fn reset_password(account: &mut AccountRecord, new: &str, confirm: &str) -> Result<(), String> {
  if new.is_empty() {
    return Err("password must not be empty".to_string());
  }
  if new != confirm {
    return Err("passwords do not match".to_string());
  }
  account.password_hash = hash_password(new);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reg<'a>(password: &'a str, confirm: &'a str) -> Registration<'a> {
    Registration {
      password,
      confirm,
      birth_date: " 2014-03-02 ",
      birth_place: "Lyon",
      father_name: " Jean ",
      mother_name: " Marie ",
    }
  }

  #[test]
  fn hashing_matches_the_known_vector() {
    assert_eq!(
      hash_password("abc"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn registration_trims_profile_fields() {
    let acc = new_account(&reg("pw", "pw")).unwrap();
    assert_eq!(acc.birth_date, "2014-03-02");
    assert_eq!(acc.father_name, "Jean");
    assert_eq!(acc.mother_name, "Marie");
    assert!(acc.plan.is_none());
    assert!(verify_password(&acc, "pw"));
    assert!(!verify_password(&acc, "pW"));
  }

  #[test]
  fn registration_rejects_bad_passwords() {
    assert_eq!(new_account(&reg("", "")).unwrap_err(), "password must not be empty");
    assert_eq!(new_account(&reg("pw", "other")).unwrap_err(), "passwords do not match");
  }

  #[test]
  fn password_change_requires_the_current_one() {
    let mut acc = new_account(&reg("pw", "pw")).unwrap();
    assert_eq!(
      change_password(&mut acc, "nope", "new", "new").unwrap_err(),
      "current password is wrong"
    );
    assert_eq!(
      change_password(&mut acc, "pw", "new", "other").unwrap_err(),
      "passwords do not match"
    );
    change_password(&mut acc, "pw", "new", "new").unwrap();
    assert!(verify_password(&acc, "new"));
    assert!(!verify_password(&acc, "pw"));
  }

  #[test]
  fn recovery_needs_both_parent_names() {
    let acc = new_account(&reg("pw", "pw")).unwrap();
    assert!(recovery_matches(&acc, "Jean", "Marie"));
    assert!(recovery_matches(&acc, "  Jean ", "Marie  "));
    assert!(!recovery_matches(&acc, "Jean", "Anne"));
    assert!(!recovery_matches(&acc, "", ""));
  }

  #[test]
  fn blank_profiles_cannot_be_recovered() {
    let mut acc = new_account(&reg("pw", "pw")).unwrap();
    acc.father_name = String::new();
    acc.mother_name = String::new();
    assert!(!recovery_matches(&acc, "", ""));
  }

  #[test]
  fn reset_replaces_the_hash() {
    let mut acc = new_account(&reg("pw", "pw")).unwrap();
    reset_password(&mut acc, "fresh", "fresh").unwrap();
    assert!(verify_password(&acc, "fresh"));
    assert_eq!(reset_password(&mut acc, "a", "b").unwrap_err(), "passwords do not match");
  }
}
