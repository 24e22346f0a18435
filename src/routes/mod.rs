//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // Health + auth
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/auth/register", post(http::http_register))
        .route("/api/v1/auth/login", post(http::http_login))
        .route("/api/v1/auth/logout", post(http::http_logout))
        .route("/api/v1/auth/change_password", post(http::http_change_password))
        .route("/api/v1/auth/forgot_password", post(http::http_forgot_password))
        // Worksheets
        .route("/api/v1/overview", get(http::http_overview))
        .route("/api/v1/worksheet", post(http::http_post_worksheet))
        .route("/api/v1/worksheet/answers", post(http::http_post_answers))
        .route("/api/v1/worksheet/result", get(http::http_get_result))
        .route("/api/v1/worksheet/document", get(http::http_get_document))
        // Plans + checkout
        .route("/api/v1/plan/options", get(http::http_plan_options))
        .route("/api/v1/plan/choose", post(http::http_choose_plan))
        .route("/api/v1/plan/activate_key", post(http::http_activate_key))
        .route("/api/v1/plan/paypal/return", get(http::http_paypal_return))
        .route("/api/v1/plan/paypal/cancel", get(http::http_paypal_cancel))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
