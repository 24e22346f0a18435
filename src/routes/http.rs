//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; plan refusals surface as 403s with a
//! `choose_plan` hint, see `error.rs`.

use std::sync::Arc;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use tracing::{error, info, instrument};

use crate::accounts;
use crate::domain::{Plan, Tier};
use crate::error::ApiError;
use crate::logic;
use crate::pdfdoc;
use crate::plans;
use crate::protocol::*;
use crate::sessions::SessionUser;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(email = %body.email))]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RegisterIn>,
) -> Result<Json<OkOut>, ApiError> {
  let reg = accounts::Registration {
    password: &body.password,
    confirm: &body.confirm_password,
    birth_date: &body.birth_date,
    birth_place: &body.birth_place,
    father_name: &body.father_name,
    mother_name: &body.mother_name,
  };
  logic::register(&state, &body.email, &reg).await?;
  Ok(Json(OkOut { ok: true }))
}

#[instrument(level = "info", skip(state, body), fields(email = %body.email, remember = body.remember))]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LoginIn>,
) -> Result<Json<SessionOut>, ApiError> {
  let (session_token, expires_at) =
    logic::login(&state, &body.email, &body.password, body.remember).await?;
  Ok(Json(SessionOut { session_token, expires_at }))
}

#[instrument(level = "info", skip(state, user), fields(email = %user.email))]
pub async fn http_logout(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
) -> impl IntoResponse {
  logic::logout(&state, &user.email, &user.token).await;
  Json(OkOut { ok: true })
}

#[instrument(level = "info", skip(state, user, body), fields(email = %user.email))]
pub async fn http_change_password(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
  Json(body): Json<ChangePasswordIn>,
) -> Result<Json<OkOut>, ApiError> {
  logic::change_password(
    &state,
    &user.email,
    &body.current_password,
    &body.new_password,
    &body.confirm_password,
  )
  .await?;
  Ok(Json(OkOut { ok: true }))
}

#[instrument(level = "info", skip(state, body), fields(email = %body.email))]
pub async fn http_forgot_password(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ForgotPasswordIn>,
) -> Result<Json<OkOut>, ApiError> {
  logic::forgot_password(
    &state,
    &body.email,
    &body.father_name,
    &body.mother_name,
    &body.new_password,
    &body.confirm_password,
  )
  .await?;
  Ok(Json(OkOut { ok: true }))
}

#[instrument(level = "info", skip(state, user), fields(email = %user.email))]
pub async fn http_overview(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
) -> Result<Json<OverviewOut>, ApiError> {
  let standing = logic::account_overview(&state, &user.email).await?;
  let tiers = Tier::ALL
    .iter()
    .map(|&tier| TierAvailability {
      tier,
      used: standing.account.usage.tier(tier),
      available: plans::can_generate(&standing.account, tier),
    })
    .collect();
  Ok(Json(OverviewOut {
    email: user.email,
    plan: standing.account.plan,
    plan_started_at: standing.account.plan_start,
    plan_expires_at: standing.plan_expires_at,
    usage: standing.account.usage,
    tiers,
    needs_plan: standing.account.plan.is_none(),
    free_exhausted: standing.free_exhausted,
    fixed_count_limit: plans::FIXED_COUNT_LIMIT,
  }))
}

#[instrument(level = "info", skip(state, user, body), fields(email = %user.email, tier = body.tier.as_str()))]
pub async fn http_post_worksheet(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
  Json(body): Json<WorksheetIn>,
) -> Result<Json<WorksheetOut>, ApiError> {
  let max = state.config.worksheet.max_count;
  let count = body.count.unwrap_or(state.config.worksheet.default_count);
  if count == 0 || count > max {
    return Err(ApiError::BadRequest(format!("count must be between 1 and {}", max)));
  }
  let columns = body.columns.unwrap_or(state.config.worksheet.default_columns);
  if !(3..=6).contains(&columns) {
    return Err(ApiError::BadRequest("columns must be between 3 and 6".to_string()));
  }
  let worksheet = logic::generate_worksheet(
    &state,
    &user.email,
    &user.token,
    body.category.operations(),
    body.tier,
    count,
    columns,
  )
  .await?;
  Ok(Json(worksheet_to_out(&worksheet)))
}

#[instrument(level = "info", skip(state, user, body), fields(email = %user.email, categories = body.answers.len()))]
pub async fn http_post_answers(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
  Json(body): Json<AnswersIn>,
) -> Result<Json<GradedOut>, ApiError> {
  let graded = logic::grade_submission(&state, &user.email, &user.token, &body.answers).await?;
  let phrase = logic::motivation_phrase(graded.score);
  Ok(Json(graded_to_out(graded, phrase)))
}

#[instrument(level = "info", skip(state, user), fields(email = %user.email))]
pub async fn http_get_result(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
) -> Result<Json<GradedOut>, ApiError> {
  let graded = logic::latest_result(&state, &user.token).await?;
  let phrase = logic::motivation_phrase(graded.score);
  Ok(Json(graded_to_out(graded, phrase)))
}

#[instrument(level = "info", skip(state, user), fields(email = %user.email))]
pub async fn http_get_document(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
) -> Result<Response, ApiError> {
  let worksheet = state.get_worksheet(&user.token).await.ok_or_else(|| {
    ApiError::BadRequest("no worksheet to export; generate one first".to_string())
  })?;
  let bytes = pdfdoc::render_worksheet_pdf(&worksheet).map_err(ApiError::Document)?;
  info!(target: "worksheet", email = %user.email, worksheet_id = %worksheet.id, bytes = bytes.len(), "Worksheet PDF rendered");

  // Keep a copy in storage when configured; the download proceeds either way.
  if let Some(st) = &state.storage {
    let filename = format!("exercise_results_{}.pdf", worksheet.id);
    if let Err(e) = st.upload_document(&filename, bytes.clone()).await {
      error!(target: "worksheet", error = %e, "Uploading the worksheet PDF failed");
    }
  }

  Ok(
    (
      [
        (header::CONTENT_TYPE, "application/pdf"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"exercise_results.pdf\""),
      ],
      bytes,
    )
      .into_response(),
  )
}

#[instrument(level = "info", skip(state, user), fields(email = %user.email))]
pub async fn http_plan_options(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
) -> Result<Json<PlanOptionsOut>, ApiError> {
  let standing = logic::account_overview(&state, &user.email).await?;
  let prices = &state.config.plans;
  let paid_available = state.paypal.is_some();
  let options = vec![
    PlanOptionOut {
      plan: Plan::Free,
      price: None,
      currency: None,
      description: "One worksheet per difficulty tier".to_string(),
      available: !standing.free_exhausted,
    },
    PlanOptionOut {
      plan: Plan::Monthly,
      price: Some(prices.monthly_price.clone()),
      currency: Some(prices.currency.clone()),
      description: "Unlimited worksheets for 30 days".to_string(),
      available: paid_available,
    },
    PlanOptionOut {
      plan: Plan::FixedCount,
      price: Some(prices.fixed_count_price.clone()),
      currency: Some(prices.currency.clone()),
      description: format!("{} worksheets at any difficulty", plans::FIXED_COUNT_LIMIT),
      available: paid_available,
    },
  ];
  Ok(Json(PlanOptionsOut { options }))
}

#[instrument(level = "info", skip(state, user, body), fields(email = %user.email, plan = body.plan.as_str()))]
pub async fn http_choose_plan(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
  Json(body): Json<ChoosePlanIn>,
) -> Result<Response, ApiError> {
  match body.plan {
    Plan::Free => {
      logic::choose_free_plan(&state, &user.email).await?;
      Ok(Json(OkOut { ok: true }).into_response())
    }
    plan => {
      let (order_id, approval_url) = logic::start_checkout(&state, &user.email, plan).await?;
      Ok(Json(CheckoutOut { order_id, approval_url }).into_response())
    }
  }
}

#[instrument(level = "info", skip(state, user, body), fields(email = %user.email))]
pub async fn http_activate_key(
  State(state): State<Arc<AppState>>,
  user: SessionUser,
  Json(body): Json<ActivateKeyIn>,
) -> Result<Json<ActivatedOut>, ApiError> {
  let plan = logic::activate_with_key(&state, &user.email, &body.key).await?;
  Ok(Json(ActivatedOut { plan, ok: true }))
}

/// PayPal sends the buyer back here after approval; `token` is the order id.
#[instrument(level = "info", skip(state), fields(order_id = %q.token))]
pub async fn http_paypal_return(
  State(state): State<Arc<AppState>>,
  Query(q): Query<CaptureQuery>,
) -> Result<Redirect, ApiError> {
  let order = logic::complete_checkout(&state, &q.token).await?;
  info!(target: "plan", email = %order.email, plan = order.plan.as_str(), "Checkout completed; redirecting to the app");
  Ok(Redirect::to("/?checkout=success"))
}

#[instrument(level = "info", skip(state))]
pub async fn http_paypal_cancel(
  State(state): State<Arc<AppState>>,
  Query(q): Query<CancelQuery>,
) -> impl IntoResponse {
  if let Some(token) = q.token.as_deref() {
    logic::cancel_checkout(&state, token).await;
  }
  Redirect::to("/?checkout=cancelled")
}
