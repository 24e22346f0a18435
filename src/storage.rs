//! Minimal client for the account file-storage service.
//!
//! The service is a plain bearer-token file API: GET/PUT for the accounts
//! file, POST multipart for one-off uploads such as exported worksheets.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::multipart;
use tracing::instrument;

use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct Storage {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
}

impl Storage {
  /// Build from STORAGE_API_KEY + STORAGE_BASE_URL. Returns None when
  /// either is missing; the app then persists to the local file only.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("STORAGE_API_KEY").ok()?;
    let base_url = std::env::var("STORAGE_BASE_URL").ok()?;
    let client = reqwest::Client::builder()
      .timeout(std::time::Duration::from_secs(20))
      .build()
      .ok()?;
    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string() })
  }

  /// Download the accounts file. `Ok(None)` when the service has no file
  /// yet (fresh deployments).
  #[instrument(level = "debug", skip(self))]
  pub async fn fetch_accounts(&self) -> Result<Option<String>, String> {
    let url = format!("{}/files/accounts.json", self.base_url);
    let resp = self
      .client
      .get(&url)
      .header(USER_AGENT, "mathex-backend/0.1")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .send()
      .await
      .map_err(|e| e.to_string())?;
    if resp.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let status = resp.status();
    let text = resp.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
      return Err(format!("storage HTTP {}: {}", status, trunc_for_log(&text, 300)));
    }
    Ok(Some(text))
  }

  /// Upload the accounts file, replacing the stored copy.
  #[instrument(level = "debug", skip(self, body), fields(bytes = body.len()))]
  pub async fn store_accounts(&self, body: &str) -> Result<(), String> {
    let url = format!("{}/files/accounts.json", self.base_url);
    let resp = self
      .client
      .put(&url)
      .header(USER_AGENT, "mathex-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .body(body.to_string())
      .send()
      .await
      .map_err(|e| e.to_string())?;
    ensure_success(resp).await
  }

  /// Upload a rendered document under `filename`.
  #[instrument(level = "debug", skip(self, bytes), fields(filename, bytes = bytes.len()))]
  pub async fn upload_document(&self, filename: &str, bytes: Vec<u8>) -> Result<(), String> {
    let url = format!("{}/files", self.base_url);
    let part = multipart::Part::bytes(bytes)
      .file_name(filename.to_string())
      .mime_str("application/pdf")
      .map_err(|e| e.to_string())?;
    let form = multipart::Form::new().part("file", part);
    let resp = self
      .client
      .post(&url)
      .header(USER_AGENT, "mathex-backend/0.1")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .multipart(form)
      .send()
      .await
      .map_err(|e| e.to_string())?;
    ensure_success(resp).await
  }
}

/// Drain the response, turning non-2xx statuses into readable errors.
async fn ensure_success(resp: reqwest::Response) -> Result<(), String> {
  let status = resp.status();
  if status.is_success() {
    return Ok(());
  }
  let text = resp.text().await.unwrap_or_default();
  Err(format!("storage HTTP {}: {}", status, trunc_for_log(&text, 300)))
}
