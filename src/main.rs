//! MathEx · Arithmetic Practice Backend
//!
//! - Axum HTTP JSON API (worksheets, grading, accounts, plans)
//! - Optional file-storage and PayPal integration (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT          : u16 (default 3000)
//!   STORAGE_API_KEY   : enables the account file-storage service
//!   STORAGE_BASE_URL  : base URL of that service
//!   PAYPAL_CLIENT_ID  : enables checkout together with PAYPAL_SECRET
//!   PAYPAL_API_BASE   : default "https://api-m.paypal.com" (sandbox override)
//!   ACCOUNTS_PATH   : local accounts file (default ./data/accounts.json)
//!   ACTIVATION_TOKEN  : shared secret behind offline activation keys
//!   PUBLIC_BASE_URL   : base for the PayPal return/cancel links
//!   TRAINER_CONFIG_PATH : path to TOML config (prices + worksheet/session knobs)
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod accounts;
mod plans;
mod generator;
mod grading;
mod sessions;
mod state;
mod protocol;
mod logic;
mod pdfdoc;
mod storage;
mod paypal;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (accounts, sessions, external clients).
  let state = Arc::new(AppState::new().await);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "mathex_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
