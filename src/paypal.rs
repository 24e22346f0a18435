//! Minimal PayPal Orders-v2 client: OAuth token, order creation, capture.
//!
//! Only the three calls checkout needs. Credentials come from env; without
//! them checkout is disabled and activation keys remain the fallback.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct PayPal {
  pub client: reqwest::Client,
  pub client_id: String,
  pub secret: String,
  pub base_url: String,
}

#[derive(Deserialize)]
struct OAuthToken {
  access_token: String,
}

#[derive(Deserialize)]
struct OrderLink {
  rel: String,
  href: String,
}

#[derive(Deserialize)]
struct OrderResponse {
  id: String,
  #[serde(default)]
  status: Option<String>,
  #[serde(default)]
  links: Vec<OrderLink>,
}

impl PayPal {
  /// Build from PAYPAL_CLIENT_ID + PAYPAL_SECRET. PAYPAL_API_BASE selects
  /// the sandbox when needed; the default is the live endpoint.
  pub fn from_env() -> Option<Self> {
    let client_id = std::env::var("PAYPAL_CLIENT_ID").ok()?;
    let secret = std::env::var("PAYPAL_SECRET").ok()?;
    let base_url = std::env::var("PAYPAL_API_BASE")
      .unwrap_or_else(|_| "https://api-m.paypal.com".to_string());
    let client = reqwest::Client::builder()
      .timeout(std::time::Duration::from_secs(20))
      .build()
      .ok()?;
    Some(Self {
      client,
      client_id,
      secret,
      base_url: base_url.trim_end_matches('/').to_string(),
    })
  }

  /// Client-credentials token for the order calls.
  async fn oauth_token(&self) -> Result<String, String> {
    let url = format!("{}/v1/oauth2/token", self.base_url);
    let basic = BASE64.encode(format!("{}:{}", self.client_id, self.secret));
    let resp = self
      .client
      .post(&url)
      .header(USER_AGENT, "mathex-backend/0.1")
      .header(AUTHORIZATION, format!("Basic {}", basic))
      .form(&[("grant_type", "client_credentials")])
      .send()
      .await
      .map_err(|e| e.to_string())?;
    let status = resp.status();
    let text = resp.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
      return Err(format!("PayPal HTTP {}: {}", status, trunc_for_log(&text, 300)));
    }
    let token: OAuthToken = serde_json::from_str(&text).map_err(|e| e.to_string())?;
    Ok(token.access_token)
  }

  /// Create a CAPTURE-intent order. Returns the order id and the approval
  /// URL the buyer must visit.
  #[instrument(level = "info", skip(self, return_url, cancel_url))]
  pub async fn create_order(
    &self,
    amount: &str,
    currency: &str,
    return_url: &str,
    cancel_url: &str,
  ) -> Result<(String, String), String> {
    let token = self.oauth_token().await?;
    let url = format!("{}/v2/checkout/orders", self.base_url);
    let body = json!({
      "intent": "CAPTURE",
      "purchase_units": [{ "amount": { "currency_code": currency, "value": amount } }],
      "application_context": {
        "return_url": return_url,
        "cancel_url": cancel_url,
        "landing_page": "BILLING"
      }
    });
    let resp = self
      .client
      .post(&url)
      .header(USER_AGENT, "mathex-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", token))
      .json(&body)
      .send()
      .await
      .map_err(|e| e.to_string())?;
    let status = resp.status();
    let text = resp.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
      return Err(format!("PayPal HTTP {}: {}", status, trunc_for_log(&text, 300)));
    }
    let order: OrderResponse = serde_json::from_str(&text).map_err(|e| e.to_string())?;
    // Live orders link the approval page as "approve"; some flows use
    // "payer-action" instead.
    let approval = order
      .links
      .iter()
      .find(|l| l.rel == "approve" || l.rel == "payer-action")
      .map(|l| l.href.clone())
      .ok_or_else(|| "PayPal order response had no approval link".to_string())?;
    info!(target: "plan", order_id = %order.id, "PayPal order created");
    Ok((order.id, approval))
  }

  /// Capture an approved order. True only when PayPal reports COMPLETED.
  #[instrument(level = "info", skip(self))]
  pub async fn capture_order(&self, order_id: &str) -> Result<bool, String> {
    let token = self.oauth_token().await?;
    let url = format!("{}/v2/checkout/orders/{}/capture", self.base_url, order_id);
    let resp = self
      .client
      .post(&url)
      .header(USER_AGENT, "mathex-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", token))
      .body("{}")
      .send()
      .await
      .map_err(|e| e.to_string())?;
    let status = resp.status();
    let text = resp.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
      return Err(format!("PayPal HTTP {}: {}", status, trunc_for_log(&text, 300)));
    }
    let order: OrderResponse = serde_json::from_str(&text).map_err(|e| e.to_string())?;
    info!(target: "plan", order_id = %order.id, status = order.status.as_deref().unwrap_or("unknown"), "PayPal capture response");
    Ok(order.status.as_deref() == Some("COMPLETED"))
  }
}
