//! Loading application configuration (plan prices + worksheet/session knobs)
//! from TOML.
//!
//! Everything has a default, so the server runs without a config file; the
//! file only overrides pieces of it.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub plans: PlanConfig,
  #[serde(default)]
  pub worksheet: WorksheetConfig,
  #[serde(default)]
  pub sessions: SessionConfig,
}

/// Checkout prices. Strings because payment APIs want exact decimal text,
/// not floats.
#[derive(Clone, Debug, Deserialize)]
pub struct PlanConfig {
  #[serde(default = "default_monthly_price")]
  pub monthly_price: String,
  #[serde(default = "default_fixed_count_price")]
  pub fixed_count_price: String,
  #[serde(default = "default_currency")]
  pub currency: String,
}

fn default_monthly_price() -> String { "10.00".into() }
fn default_fixed_count_price() -> String { "5.00".into() }
fn default_currency() -> String { "USD".into() }

impl Default for PlanConfig {
  fn default() -> Self {
    Self {
      monthly_price: default_monthly_price(),
      fixed_count_price: default_fixed_count_price(),
      currency: default_currency(),
    }
  }
}

/// Worksheet sizing limits.
#[derive(Clone, Debug, Deserialize)]
pub struct WorksheetConfig {
  #[serde(default = "default_count")]
  pub default_count: u32,
  #[serde(default = "default_max_count")]
  pub max_count: u32,
  #[serde(default = "default_columns")]
  pub default_columns: u8,
}

fn default_count() -> u32 { 100 }
fn default_max_count() -> u32 { 600 }
fn default_columns() -> u8 { 3 }

impl Default for WorksheetConfig {
  fn default() -> Self {
    Self {
      default_count: default_count(),
      max_count: default_max_count(),
      default_columns: default_columns(),
    }
  }
}

/// Session lifetimes. Plain logins expire after `ttl_hours`; remember-me
/// tokens stretch that to `remember_days`.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionConfig {
  #[serde(default = "default_ttl_hours")]
  pub ttl_hours: i64,
  #[serde(default = "default_remember_days")]
  pub remember_days: i64,
}

fn default_ttl_hours() -> i64 { 12 }
fn default_remember_days() -> i64 { 30 }

impl Default for SessionConfig {
  fn default() -> Self {
    Self { ttl_hours: default_ttl_hours(), remember_days: default_remember_days() }
  }
}

/// Attempt to load `AppConfig` from TRAINER_CONFIG_PATH. On any parsing/IO
/// error, returns None and the caller falls back to defaults.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("TRAINER_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "mathex_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "mathex_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "mathex_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
