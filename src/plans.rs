//! Plan gating and activation: who may generate a worksheet, how usage is
//! tracked, when a monthly plan lapses, and offline activation keys.
//!
//! Counters are never reset when plans change hands. A lapsed monthly
//! plan is cleared, not rewound, and a re-chosen free plan grants nothing
//! the account already consumed.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::domain::{AccountRecord, Plan, Tier};
use crate::util::{base36_from_bytes, sha256_bytes};

/// Total worksheets granted by the fixed-count plan.
pub const FIXED_COUNT_LIMIT: u32 = 20;

/// Days a monthly plan stays active after its start instant.
pub const MONTHLY_WINDOW_DAYS: i64 = 30;

/// May this account generate one more worksheet at `tier`?
pub fn can_generate(account: &AccountRecord, tier: Tier) -> bool {
  match account.plan {
    None => false,
    Some(Plan::Free) => account.usage.tier(tier) < 1,
    Some(Plan::Monthly) => true,
    Some(Plan::FixedCount) => account.usage.fixed_count_used < FIXED_COUNT_LIMIT,
  }
}

/// Record one generated worksheet against the account's counters.
/// Monthly plans are unmetered, so nothing is recorded for them.
pub fn record_usage(account: &mut AccountRecord, tier: Tier) {
  match account.plan {
    Some(Plan::Free) => {
      *account.usage.tier_mut(tier) += 1;
    }
    Some(Plan::FixedCount) => {
      account.usage.fixed_count_used += 1;
      *account.usage.tier_mut(tier) += 1;
    }
    Some(Plan::Monthly) | None => {}
  }
}

/// A monthly plan lapses strictly after 30 days; the boundary instant is
/// still inside the window.
pub fn monthly_expired(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
  now > start + Duration::days(MONTHLY_WINDOW_DAYS)
}

/// True once every tier's free worksheet has been consumed.
pub fn free_exhausted(account: &AccountRecord) -> bool {
  Tier::ALL.iter().all(|&t| account.usage.tier(t) >= 1)
}

/// Switch the account onto `plan`, stamping the activation bookkeeping the
/// plan needs. Usage counters are left untouched.
pub fn activate(account: &mut AccountRecord, email: &str, plan: Plan, now: DateTime<Utc>) {
  account.plan = Some(plan);
  match plan {
    Plan::Free => {}
    Plan::Monthly => {
      account.plan_start = Some(now);
      account.activation_id = Some(format!("{}_{}", email, now.format("%Y%m%d%H%M%S")));
    }
    Plan::FixedCount => {
      account.activation_id = Some(format!(
        "{}_{}_{}",
        email,
        account.birth_date,
        now.format("%Y%m%d%H%M%S")
      ));
    }
  }
}

/// Drop a lapsed or abandoned plan. Counters survive, so cycling plans
/// refreshes nothing.
pub fn clear_plan(account: &mut AccountRecord) {
  account.plan = None;
  account.plan_start = None;
  account.activation_id = None;
}

/// Derive the activation key for `email` + `plan` valid on `date`:
/// SHA-256 over the lowercased email, plan name, shared secret and date,
/// re-encoded as 16 base36 characters in groups of four.
pub fn expected_key(email: &str, plan: Plan, secret: &str, date: NaiveDate) -> String {
  let material = format!(
    "{}_{}_{}_{}",
    email.to_lowercase(),
    plan.as_str(),
    secret,
    date.format("%Y%m%d")
  );
  let mut code = base36_from_bytes(&sha256_bytes(&material));
  if code.len() < 16 {
    code = format!("{:0>16}", code);
  }
  code.truncate(16);
  let mut grouped = String::with_capacity(19);
  for (i, ch) in code.chars().enumerate() {
    if i > 0 && i % 4 == 0 {
      grouped.push('-');
    }
    grouped.push(ch);
  }
  grouped
}

/// Check a user-supplied key against today's keys for both paid plans.
/// Input is case-insensitive and tolerates surrounding whitespace.
pub fn verify_activation_key(
  input: &str,
  email: &str,
  secret: &str,
  today: NaiveDate,
) -> Option<Plan> {
  let normalized = input.trim().to_uppercase();
  for plan in [Plan::Monthly, Plan::FixedCount] {
    if normalized == expected_key(email, plan, secret, today) {
      return Some(plan);
    }
  }
  None
}
