//! API error taxonomy shared by every handler.
//!
//! Handlers return `Result<Json<T>, ApiError>`; the `IntoResponse` impl
//! turns each variant into a status code plus a small JSON body so the
//! frontend can branch on `error` (and `next` for plan gating) without
//! parsing prose.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("missing or invalid session token")]
  Unauthorized,

  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("no active plan")]
  PlanRequired,

  #[error("plan allowance exhausted for {0}")]
  PlanExhausted(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("payment error: {0}")]
  Payment(String),

  #[error("storage error: {0}")]
  Storage(String),

  #[error("document error: {0}")]
  Document(String),

  #[error("internal error: {0}")]
  Internal(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
      ApiError::PlanRequired | ApiError::PlanExhausted(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Payment(_) | ApiError::Storage(_) => StatusCode::BAD_GATEWAY,
      ApiError::Document(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      // Plan gates carry a hint so the client knows to route to plan selection.
      ApiError::PlanRequired | ApiError::PlanExhausted(_) => {
        json!({ "error": self.to_string(), "next": "choose_plan" })
      }
      _ => json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
