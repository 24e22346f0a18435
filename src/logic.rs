//! Session-facing orchestration: worksheet generation under plan gates,
//! grading, plan management, checkout, and the account lifecycle.
//!
//! Route handlers stay thin; anything that touches more than one store or
//! needs plan rules goes through here. Persistence always runs after the
//! accounts guard is released, see `AppState::persist_accounts`.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::accounts;
use crate::domain::{AccountRecord, GradedWorksheet, Operation, Plan, Tier, Worksheet};
use crate::error::ApiError;
use crate::generator;
use crate::grading;
use crate::plans;
use crate::state::{AppState, PendingOrder};

/// Clear a lapsed monthly plan before any gate consults it.
pub async fn expire_monthly_if_needed(state: &AppState, email: &str) {
  let lapsed = {
    let mut accounts_map = state.accounts.write().await;
    match accounts_map.get_mut(email) {
      Some(acc) if acc.plan == Some(Plan::Monthly) => match acc.plan_start {
        Some(start) if plans::monthly_expired(start, Utc::now()) => {
          plans::clear_plan(acc);
          true
        }
        _ => false,
      },
      _ => false,
    }
  };
  if lapsed {
    warn!(target: "plan", %email, "Monthly plan lapsed; cleared");
    state.persist_accounts().await;
  }
}

/// Generate a worksheet for the session if the account's plan allows one
/// more at `tier`. Gate check and usage recording happen under a single
/// guard so concurrent requests cannot overdraw the allowance.
#[instrument(level = "info", skip(state, session_token, ops), fields(%email, tier = tier.as_str(), per_category = count))]
pub async fn generate_worksheet(
  state: &AppState,
  email: &str,
  session_token: &str,
  ops: &[Operation],
  tier: Tier,
  count: u32,
  columns: u8,
) -> Result<Worksheet, ApiError> {
  expire_monthly_if_needed(state, email).await;

  {
    let mut accounts_map = state.accounts.write().await;
    let acc = accounts_map.get_mut(email).ok_or(ApiError::Unauthorized)?;
    if acc.plan.is_none() {
      return Err(ApiError::PlanRequired);
    }
    if !plans::can_generate(acc, tier) {
      return Err(ApiError::PlanExhausted(tier.as_str().to_string()));
    }
    plans::record_usage(acc, tier);
  }
  state.persist_accounts().await;

  let worksheet = Worksheet {
    id: Uuid::new_v4().to_string(),
    tier,
    columns,
    categories: generator::generate_categories(ops, tier, count),
    created_at: Utc::now(),
  };
  state.put_worksheet(session_token, worksheet.clone()).await;

  info!(target: "worksheet", %email, worksheet_id = %worksheet.id, exercises = worksheet.exercise_count(), "Worksheet generated");
  Ok(worksheet)
}

/// Grade the session's current worksheet against submitted answers.
#[instrument(level = "info", skip(state, session_token, answers), fields(%email))]
pub async fn grade_submission(
  state: &AppState,
  email: &str,
  session_token: &str,
  answers: &[Vec<Option<String>>],
) -> Result<GradedWorksheet, ApiError> {
  let worksheet = state.get_worksheet(session_token).await.ok_or_else(|| {
    ApiError::BadRequest("no worksheet to grade; generate one first".to_string())
  })?;
  let graded = grading::grade_worksheet(&worksheet, answers);
  state.put_result(session_token, graded.clone()).await;
  info!(target: "worksheet", %email, worksheet_id = %graded.worksheet_id, score = graded.score, correct = graded.correct, total = graded.total, "Worksheet graded");
  Ok(graded)
}

/// The session's last grading result, for re-display after a reload.
pub async fn latest_result(
  state: &AppState,
  session_token: &str,
) -> Result<GradedWorksheet, ApiError> {
  state
    .get_result(session_token)
    .await
    .ok_or_else(|| ApiError::NotFound("no graded worksheet yet".to_string()))
}

/// Encouragement line for a score band.
pub fn motivation_phrase(score: u8) -> &'static str {
  match score {
    0..=20 => "Don't worry, keep practicing!",
    21..=40 => "You're making progress, keep it up!",
    41..=60 => "Well done, you're on the right track!",
    61..=80 => "Excellent work, you're almost at the top!",
    _ => "Congratulations, you're a champion!",
  }
}

/// Snapshot of an account's plan standing for the overview endpoint.
pub struct PlanStanding {
  pub account: AccountRecord,
  pub free_exhausted: bool,
  pub plan_expires_at: Option<DateTime<Utc>>,
}

pub async fn account_overview(state: &AppState, email: &str) -> Result<PlanStanding, ApiError> {
  expire_monthly_if_needed(state, email).await;
  let account = state.get_account(email).await.ok_or(ApiError::Unauthorized)?;
  let free_exhausted = plans::free_exhausted(&account);
  let plan_expires_at = match (account.plan, account.plan_start) {
    (Some(Plan::Monthly), Some(start)) => {
      Some(start + Duration::days(plans::MONTHLY_WINDOW_DAYS))
    }
    _ => None,
  };
  Ok(PlanStanding { account, free_exhausted, plan_expires_at })
}

/// Put the account on the free plan. Refused once every free worksheet
/// has been consumed, since re-choosing it would grant nothing.
#[instrument(level = "info", skip(state), fields(%email))]
pub async fn choose_free_plan(state: &AppState, email: &str) -> Result<(), ApiError> {
  {
    let mut accounts_map = state.accounts.write().await;
    let acc = accounts_map.get_mut(email).ok_or(ApiError::Unauthorized)?;
    if plans::free_exhausted(acc) {
      return Err(ApiError::BadRequest("free worksheets already used up".to_string()));
    }
    plans::activate(acc, email, Plan::Free, Utc::now());
  }
  state.persist_accounts().await;
  info!(target: "plan", %email, "Free plan chosen");
  Ok(())
}

/// Create a PayPal order for a paid plan. Returns the order id and the
/// approval URL the buyer must visit.
#[instrument(level = "info", skip(state), fields(%email, plan = plan.as_str()))]
pub async fn start_checkout(
  state: &AppState,
  email: &str,
  plan: Plan,
) -> Result<(String, String), ApiError> {
  let paypal = state
    .paypal
    .as_ref()
    .ok_or_else(|| ApiError::Payment("payment service not configured".to_string()))?;
  let amount = match plan {
    Plan::Free => {
      return Err(ApiError::BadRequest("the free plan needs no checkout".to_string()))
    }
    Plan::Monthly => state.config.plans.monthly_price.clone(),
    Plan::FixedCount => state.config.plans.fixed_count_price.clone(),
  };
  let currency = state.config.plans.currency.clone();
  let return_url = format!("{}/api/v1/plan/paypal/return", state.public_base_url);
  let cancel_url = format!("{}/api/v1/plan/paypal/cancel", state.public_base_url);
  let (order_id, approval_url) = paypal
    .create_order(&amount, &currency, &return_url, &cancel_url)
    .await
    .map_err(ApiError::Payment)?;
  state
    .put_pending_order(&order_id, PendingOrder { email: email.to_string(), plan })
    .await;
  info!(target: "plan", %email, %order_id, "Checkout order created");
  Ok((order_id, approval_url))
}

/// Capture an approved order and activate the plan it bought. The pending
/// order is only consumed on success; failures put it back so the buyer
/// can retry the return link.
#[instrument(level = "info", skip(state), fields(%order_id))]
pub async fn complete_checkout(state: &AppState, order_id: &str) -> Result<PendingOrder, ApiError> {
  let order = state
    .take_pending_order(order_id)
    .await
    .ok_or_else(|| ApiError::NotFound("unknown checkout order".to_string()))?;
  let paypal = match state.paypal.as_ref() {
    Some(p) => p,
    None => {
      state.put_pending_order(order_id, order).await;
      return Err(ApiError::Payment("payment service not configured".to_string()));
    }
  };
  match paypal.capture_order(order_id).await {
    Ok(true) => {}
    Ok(false) => {
      state.put_pending_order(order_id, order).await;
      return Err(ApiError::Payment("order was not completed".to_string()));
    }
    Err(e) => {
      state.put_pending_order(order_id, order).await;
      return Err(ApiError::Payment(e));
    }
  }
  {
    let mut accounts_map = state.accounts.write().await;
    if let Some(acc) = accounts_map.get_mut(&order.email) {
      plans::activate(acc, &order.email, order.plan, Utc::now());
    }
  }
  state.persist_accounts().await;
  info!(target: "plan", email = %order.email, plan = order.plan.as_str(), %order_id, "Payment captured; plan activated");
  Ok(order)
}

/// Drop a pending order the buyer abandoned. Unknown ids are fine.
pub async fn cancel_checkout(state: &AppState, order_id: &str) {
  if state.take_pending_order(order_id).await.is_some() {
    info!(target: "plan", %order_id, "Checkout cancelled; pending order dropped");
  }
}

/// Activate a paid plan from an offline activation key.
#[instrument(level = "info", skip(state, key), fields(%email))]
pub async fn activate_with_key(state: &AppState, email: &str, key: &str) -> Result<Plan, ApiError> {
  let today = Utc::now().date_naive();
  let plan = plans::verify_activation_key(key, email, &state.activation_secret, today)
    .ok_or_else(|| ApiError::BadRequest("activation key is not valid today".to_string()))?;
  {
    let mut accounts_map = state.accounts.write().await;
    let acc = accounts_map.get_mut(email).ok_or(ApiError::Unauthorized)?;
    plans::activate(acc, email, plan, Utc::now());
  }
  state.persist_accounts().await;
  info!(target: "plan", %email, plan = plan.as_str(), "Plan activated by key");
  Ok(plan)
}

/// Create an account. The email is the account key, trimmed but stored
/// with its original case.
#[instrument(level = "info", skip(state, reg, email))]
pub async fn register(
  state: &AppState,
  email: &str,
  reg: &accounts::Registration<'_>,
) -> Result<(), ApiError> {
  let email = email.trim();
  if email.is_empty() || !email.contains('@') {
    return Err(ApiError::BadRequest("a valid email address is required".to_string()));
  }
  let record = accounts::new_account(reg).map_err(ApiError::BadRequest)?;
  {
    let mut accounts_map = state.accounts.write().await;
    if accounts_map.contains_key(email) {
      return Err(ApiError::Conflict("an account with this email already exists".to_string()));
    }
    accounts_map.insert(email.to_string(), record);
  }
  state.persist_accounts().await;
  info!(target: "account", %email, "Account registered");
  Ok(())
}

/// Verify credentials and open a session. A remembered login stretches
/// the session and stores its token on the account; a plain login clears
/// any earlier remember-me token.
#[instrument(level = "info", skip(state, password), fields(%email, remember))]
pub async fn login(
  state: &AppState,
  email: &str,
  password: &str,
  remember: bool,
) -> Result<(String, DateTime<Utc>), ApiError> {
  let ok = {
    let accounts_map = state.accounts.read().await;
    accounts_map
      .get(email)
      .map(|acc| accounts::verify_password(acc, password))
      .unwrap_or(false)
  };
  if !ok {
    warn!(target: "account", %email, "Login rejected");
    return Err(ApiError::InvalidCredentials);
  }

  let ttl = if remember {
    Duration::days(state.config.sessions.remember_days)
  } else {
    Duration::hours(state.config.sessions.ttl_hours)
  };
  let token = state.sessions.issue(email, ttl, remember).await;
  let expires_at = Utc::now() + ttl;

  let changed = {
    let mut accounts_map = state.accounts.write().await;
    match accounts_map.get_mut(email) {
      Some(acc) if remember => {
        acc.remember_token = Some(token.clone());
        true
      }
      Some(acc) if acc.remember_token.is_some() => {
        acc.remember_token = None;
        true
      }
      _ => false,
    }
  };
  if changed {
    state.persist_accounts().await;
  }

  info!(target: "account", %email, remember, "Login succeeded");
  Ok((token, expires_at))
}

/// Close the session and forget its worksheet. A remembered session also
/// gives up its long-lived token.
#[instrument(level = "info", skip(state, token), fields(%email))]
pub async fn logout(state: &AppState, email: &str, token: &str) {
  let session = state.sessions.revoke(token).await;
  state.drop_session_artifacts(token).await;
  if session.map(|s| s.remember).unwrap_or(false) {
    let cleared = {
      let mut accounts_map = state.accounts.write().await;
      match accounts_map.get_mut(email) {
        Some(acc) if acc.remember_token.as_deref() == Some(token) => {
          acc.remember_token = None;
          true
        }
        _ => false,
      }
    };
    if cleared {
      state.persist_accounts().await;
    }
  }
  info!(target: "account", %email, "Logged out");
}

/// Change the password and revoke every session, including the caller's.
#[instrument(level = "info", skip(state, current, new, confirm), fields(%email))]
pub async fn change_password(
  state: &AppState,
  email: &str,
  current: &str,
  new: &str,
  confirm: &str,
) -> Result<(), ApiError> {
  {
    let mut accounts_map = state.accounts.write().await;
    let acc = accounts_map.get_mut(email).ok_or(ApiError::Unauthorized)?;
    accounts::change_password(acc, current, new, confirm).map_err(ApiError::BadRequest)?;
    acc.remember_token = None;
  }
  state.persist_accounts().await;
  state.sessions.revoke_all_for(email).await;
  info!(target: "account", %email, "Password changed; sessions revoked");
  Ok(())
}

/// Reset a forgotten password after the parent-name challenge.
#[instrument(level = "info", skip(state, father, mother, new, confirm), fields(%email))]
pub async fn forgot_password(
  state: &AppState,
  email: &str,
  father: &str,
  mother: &str,
  new: &str,
  confirm: &str,
) -> Result<(), ApiError> {
  {
    let mut accounts_map = state.accounts.write().await;
    let acc = accounts_map
      .get_mut(email)
      .ok_or_else(|| ApiError::NotFound("no account with this email".to_string()))?;
    if !accounts::recovery_matches(acc, father, mother) {
      warn!(target: "account", %email, "Recovery challenge failed");
      return Err(ApiError::InvalidCredentials);
    }
    accounts::reset_password(acc, new, confirm).map_err(ApiError::BadRequest)?;
    acc.remember_token = None;
  }
  state.persist_accounts().await;
  state.sessions.revoke_all_for(email).await;
  info!(target: "account", %email, "Password reset via recovery");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const EMAIL: &str = "kid@example.com";

  async fn registered(state: &AppState) {
    let reg = accounts::Registration {
      password: "pw",
      confirm: "pw",
      birth_date: "2014-03-02",
      birth_place: "Lyon",
      father_name: "Jean",
      mother_name: "Marie",
    };
    register(state, EMAIL, &reg).await.unwrap();
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  async fn with_plan(state: &AppState, plan: Plan) {
    let mut accounts_map = state.accounts.write().await;
    if let Some(acc) = accounts_map.get_mut(EMAIL) {
      plans::activate(acc, EMAIL, plan, Utc::now());
    }
  }

  fn all_answers(worksheet: &Worksheet) -> Vec<Vec<Option<String>>> {
    worksheet
      .categories
      .iter()
      .map(|c| c.exercises.iter().map(|e| Some(e.result.to_string())).collect())
      .collect()
  }

  #[tokio::test]
  async fn worksheets_require_a_plan() {
    let state = AppState::for_tests();
    registered(&state).await;
    let err = generate_worksheet(&state, EMAIL, "tok", &Operation::ALL, Tier::Easy, 5, 3)
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::PlanRequired));
  }

  #[tokio::test]
  async fn free_plan_grants_one_worksheet_per_tier() {
    let state = AppState::for_tests();
    registered(&state).await;
    with_plan(&state, Plan::Free).await;

    generate_worksheet(&state, EMAIL, "tok", &Operation::ALL, Tier::Easy, 5, 3)
      .await
      .unwrap();
    let err = generate_worksheet(&state, EMAIL, "tok", &Operation::ALL, Tier::Easy, 5, 3)
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::PlanExhausted(ref t) if t == "easy"));
    // Other tiers stay open.
    generate_worksheet(&state, EMAIL, "tok", &Operation::ALL, Tier::Hard, 5, 3)
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn grading_matches_the_stored_worksheet() {
    let state = AppState::for_tests();
    registered(&state).await;
    with_plan(&state, Plan::Monthly).await;

    let ws = generate_worksheet(&state, EMAIL, "tok", &[Operation::Addition], Tier::Easy, 10, 3)
      .await
      .unwrap();
    let graded = grade_submission(&state, EMAIL, "tok", &all_answers(&ws)).await.unwrap();
    assert_eq!(graded.worksheet_id, ws.id);
    assert_eq!(graded.total, 10);
    assert_eq!(graded.correct, 10);
    assert_eq!(graded.score, 100);

    let again = latest_result(&state, "tok").await.unwrap();
    assert_eq!(again.worksheet_id, ws.id);
  }

  #[tokio::test]
  async fn unanswered_exercises_count_against_the_total() {
    let state = AppState::for_tests();
    registered(&state).await;
    with_plan(&state, Plan::Monthly).await;

    generate_worksheet(&state, EMAIL, "tok", &[Operation::Addition], Tier::Easy, 4, 3)
      .await
      .unwrap();
    let graded = grade_submission(&state, EMAIL, "tok", &[]).await.unwrap();
    assert_eq!(graded.total, 4);
    assert_eq!(graded.correct, 0);
    assert_eq!(graded.score, 0);
    assert!(graded.categories[0].results.iter().all(|r| r.text == "Not answered"));
  }

  #[tokio::test]
  async fn grading_without_a_worksheet_is_rejected() {
    let state = AppState::for_tests();
    registered(&state).await;
    let err = grade_submission(&state, EMAIL, "tok", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    let err = latest_result(&state, "tok").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[tokio::test]
  async fn a_lapsed_monthly_plan_is_cleared() {
    let state = AppState::for_tests();
    registered(&state).await;
    {
      let mut accounts_map = state.accounts.write().await;
      let acc = accounts_map.get_mut(EMAIL).unwrap();
      acc.plan = Some(Plan::Monthly);
      acc.plan_start = Some(Utc::now() - Duration::days(31));
    }
    let err = generate_worksheet(&state, EMAIL, "tok", &Operation::ALL, Tier::Easy, 5, 3)
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::PlanRequired));
    let acc = state.get_account(EMAIL).await.unwrap();
    assert!(acc.plan.is_none());
    assert!(acc.plan_start.is_none());
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  #[tokio::test]
  async fn a_monthly_plan_survives_day_29() {
    let state = AppState::for_tests();
    registered(&state).await;
    {
      let mut accounts_map = state.accounts.write().await;
      let acc = accounts_map.get_mut(EMAIL).unwrap();
      acc.plan = Some(Plan::Monthly);
      acc.plan_start = Some(Utc::now() - Duration::days(29));
    }
    generate_worksheet(&state, EMAIL, "tok", &Operation::ALL, Tier::Expert, 5, 3)
      .await
      .unwrap();
    let standing = account_overview(&state, EMAIL).await.unwrap();
    assert_eq!(standing.account.plan, Some(Plan::Monthly));
    assert!(standing.plan_expires_at.unwrap() > Utc::now());
  }

  #[tokio::test]
  async fn activation_keys_unlock_their_plan() {
    let state = AppState::for_tests();
    registered(&state).await;

    let err = activate_with_key(&state, EMAIL, "XXXX-XXXX-XXXX-XXXX").await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let key =
      plans::expected_key(EMAIL, Plan::Monthly, &state.activation_secret, Utc::now().date_naive());
    let plan = activate_with_key(&state, EMAIL, &key).await.unwrap();
    assert_eq!(plan, Plan::Monthly);
    let acc = state.get_account(EMAIL).await.unwrap();
    assert_eq!(acc.plan, Some(Plan::Monthly));
    assert!(acc.plan_start.is_some());
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  #[tokio::test]
  async fn choosing_free_twice_grants_nothing_once_exhausted() {
    let state = AppState::for_tests();
    registered(&state).await;
    choose_free_plan(&state, EMAIL).await.unwrap();
    {
      let mut accounts_map = state.accounts.write().await;
      let acc = accounts_map.get_mut(EMAIL).unwrap();
      for tier in Tier::ALL {
        plans::record_usage(acc, tier);
      }
    }
    let err = choose_free_plan(&state, EMAIL).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  #[tokio::test]
  async fn logins_issue_sessions_and_manage_remember_tokens() {
    let state = AppState::for_tests();
    registered(&state).await;

    let err = login(&state, EMAIL, "wrong", false).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));

    let (token, expires_at) = login(&state, EMAIL, "pw", true).await.unwrap();
    assert!(expires_at > Utc::now() + Duration::days(29));
    let session = state.sessions.resolve(&token).await.unwrap();
    assert!(session.remember);
    let acc = state.get_account(EMAIL).await.unwrap();
    assert_eq!(acc.remember_token.as_deref(), Some(token.as_str()));

    // A plain login drops the remembered token.
    let (_plain, _) = login(&state, EMAIL, "pw", false).await.unwrap();
    let acc = state.get_account(EMAIL).await.unwrap();
    assert!(acc.remember_token.is_none());
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  #[tokio::test]
  async fn remembered_sessions_survive_a_restart() {
    let state = AppState::for_tests();
    registered(&state).await;
    let (token, _) = login(&state, EMAIL, "pw", true).await.unwrap();

    // Simulate a restart: the in-memory session is gone.
    state.sessions.revoke(&token).await;
    assert!(state.sessions.resolve(&token).await.is_none());

    // The account still carries the token, so the extractor can revive it.
    let owner = state.find_remember_token(&token).await.unwrap();
    assert_eq!(owner, EMAIL);
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  #[tokio::test]
  async fn logout_forgets_the_session_and_its_token() {
    let state = AppState::for_tests();
    registered(&state).await;
    with_plan(&state, Plan::Monthly).await;
    let (token, _) = login(&state, EMAIL, "pw", true).await.unwrap();
    generate_worksheet(&state, EMAIL, &token, &[Operation::Addition], Tier::Easy, 3, 3)
      .await
      .unwrap();

    logout(&state, EMAIL, &token).await;
    assert!(state.sessions.resolve(&token).await.is_none());
    assert!(state.get_worksheet(&token).await.is_none());
    let acc = state.get_account(EMAIL).await.unwrap();
    assert!(acc.remember_token.is_none());
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  #[tokio::test]
  async fn each_session_keeps_its_own_worksheet() {
    let state = AppState::for_tests();
    registered(&state).await;
    with_plan(&state, Plan::Monthly).await;

    let a = generate_worksheet(&state, EMAIL, "tok-a", &[Operation::Addition], Tier::Easy, 3, 3)
      .await
      .unwrap();
    let b = generate_worksheet(&state, EMAIL, "tok-b", &[Operation::Division], Tier::Hard, 3, 3)
      .await
      .unwrap();
    assert_ne!(a.id, b.id);

    grade_submission(&state, EMAIL, "tok-a", &all_answers(&a)).await.unwrap();
    assert!(state.get_result("tok-b").await.is_none());
    assert_eq!(state.get_worksheet("tok-b").await.unwrap().id, b.id);
  }

  #[tokio::test]
  async fn checkout_needs_a_configured_payment_client() {
    let state = AppState::for_tests();
    registered(&state).await;
    let err = start_checkout(&state, EMAIL, Plan::Monthly).await.unwrap_err();
    assert!(matches!(err, ApiError::Payment(_)));
  }

  #[tokio::test]
  async fn unknown_checkout_orders_are_not_found() {
    let state = AppState::for_tests();
    let err = complete_checkout(&state, "ORDER-404").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[tokio::test]
  async fn cancelling_drops_the_pending_order() {
    let state = AppState::for_tests();
    state
      .put_pending_order("ORDER-1", PendingOrder { email: EMAIL.into(), plan: Plan::Monthly })
      .await;
    cancel_checkout(&state, "ORDER-1").await;
    assert!(state.take_pending_order("ORDER-1").await.is_none());
  }

  #[tokio::test]
  async fn password_change_revokes_every_session() {
    let state = AppState::for_tests();
    registered(&state).await;
    let (token, _) = login(&state, EMAIL, "pw", false).await.unwrap();

    let err = change_password(&state, EMAIL, "wrong", "new", "new").await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    change_password(&state, EMAIL, "pw", "new", "new").await.unwrap();
    assert!(state.sessions.resolve(&token).await.is_none());
    login(&state, EMAIL, "new", false).await.unwrap();
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  #[tokio::test]
  async fn recovery_resets_the_password_with_parent_names() {
    let state = AppState::for_tests();
    registered(&state).await;

    let err = forgot_password(&state, EMAIL, "Jean", "Anne", "new", "new").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));
    let err =
      forgot_password(&state, "ghost@example.com", "Jean", "Marie", "new", "new").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    forgot_password(&state, EMAIL, "Jean", "Marie", "new", "new").await.unwrap();
    login(&state, EMAIL, "new", false).await.unwrap();
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  #[tokio::test]
  async fn registration_validates_email_and_uniqueness() {
    let state = AppState::for_tests();
    registered(&state).await;

    let reg = accounts::Registration {
      password: "pw",
      confirm: "pw",
      birth_date: "",
      birth_place: "",
      father_name: "",
      mother_name: "",
    };
    let err = register(&state, "not-an-email", &reg).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    let err = register(&state, EMAIL, &reg).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    let _ = std::fs::remove_file(&state.accounts_path);
  }

  #[test]
  fn motivation_phrases_cover_every_band() {
    assert_eq!(motivation_phrase(0), "Don't worry, keep practicing!");
    assert_eq!(motivation_phrase(20), "Don't worry, keep practicing!");
    assert_eq!(motivation_phrase(21), "You're making progress, keep it up!");
    assert_eq!(motivation_phrase(45), "Well done, you're on the right track!");
    assert_eq!(motivation_phrase(80), "Excellent work, you're almost at the top!");
    assert_eq!(motivation_phrase(81), "Congratulations, you're a champion!");
    assert_eq!(motivation_phrase(100), "Congratulations, you're a champion!");
  }
}
