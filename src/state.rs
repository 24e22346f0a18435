//! Application state: accounts, sessions, per-session worksheets, pending
//! checkout orders, config, and the optional external clients.
//!
//! This module owns:
//!   - the account map, mirrored to a local JSON file and (when
//!     configured) to the file-storage service
//!   - the session store and remember-me lookup
//!   - per-session worksheets and their grading results
//!   - PayPal orders awaiting capture

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::config::{load_app_config_from_env, AppConfig};
use crate::domain::{AccountRecord, GradedWorksheet, Plan, Worksheet};
use crate::paypal::PayPal;
use crate::sessions::SessionStore;
use crate::storage::Storage;

/// Checkout order waiting for PayPal capture.
#[derive(Debug, Clone)]
pub struct PendingOrder {
    pub email: String,
    pub plan: Plan,
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<RwLock<HashMap<String, AccountRecord>>>,
    pub sessions: SessionStore,
    pub worksheets: Arc<RwLock<HashMap<String, Worksheet>>>,
    pub results: Arc<RwLock<HashMap<String, GradedWorksheet>>>,
    pub pending_orders: Arc<RwLock<HashMap<String, PendingOrder>>>,
    pub config: AppConfig,
    pub storage: Option<Storage>,
    pub paypal: Option<PayPal>,
    pub activation_secret: String,
    pub public_base_url: String,
    pub accounts_path: PathBuf,
}

impl AppState {
    /// Build state from env: load config, init external clients, load the
    /// account map (storage first, then the local file, then empty).
    #[instrument(level = "info", skip_all)]
    pub async fn new() -> Self {
        let config = load_app_config_from_env().unwrap_or_default();

        let storage = Storage::from_env();
        if let Some(st) = &storage {
            info!(target: "mathex_backend", base_url = %st.base_url, "File storage enabled.");
        } else {
            info!(target: "mathex_backend", "File storage disabled (no STORAGE_API_KEY). Accounts persist to the local file only.");
        }

        let paypal = PayPal::from_env();
        if let Some(pp) = &paypal {
            info!(target: "mathex_backend", base_url = %pp.base_url, "PayPal enabled.");
        } else {
            info!(target: "mathex_backend", "PayPal disabled (no PAYPAL_CLIENT_ID / PAYPAL_SECRET). Checkout will refuse.");
        }

        let accounts_path = PathBuf::from(
            std::env::var("ACCOUNTS_PATH").unwrap_or_else(|_| "./data/accounts.json".to_string()),
        );
        let accounts = load_accounts(storage.as_ref(), &accounts_path).await;

        // Inventory summary by plan.
        let mut count_by_plan: HashMap<&'static str, usize> = HashMap::new();
        for acc in accounts.values() {
            let key = acc.plan.map(|p| p.as_str()).unwrap_or("none");
            *count_by_plan.entry(key).or_insert(0) += 1;
        }
        info!(target: "account", total = accounts.len(), "Startup account inventory");
        for (plan, n) in count_by_plan {
            info!(target: "account", %plan, accounts = n, "Accounts on plan");
        }

        let activation_secret =
            std::env::var("ACTIVATION_TOKEN").unwrap_or_else(|_| "1r2h3y4f7e5dsf6".to_string());
        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self {
            accounts: Arc::new(RwLock::new(accounts)),
            sessions: SessionStore::default(),
            worksheets: Arc::new(RwLock::new(HashMap::new())),
            results: Arc::new(RwLock::new(HashMap::new())),
            pending_orders: Arc::new(RwLock::new(HashMap::new())),
            config,
            storage,
            paypal,
            activation_secret,
            public_base_url,
            accounts_path,
        }
    }

    /// Serialize the account map to the local file and, when configured,
    /// to the file-storage service. Failures are logged and the in-memory
    /// state stands either way. Takes a read lock on the accounts map, so
    /// never call this while holding an accounts guard.
    #[instrument(level = "debug", skip(self))]
    pub async fn persist_accounts(&self) {
        let body = {
            let accounts = self.accounts.read().await;
            match serde_json::to_string_pretty(&*accounts) {
                Ok(b) => b,
                Err(e) => {
                    error!(target: "account", error = %e, "Serializing accounts failed; nothing persisted");
                    return;
                }
            }
        };
        if let Some(parent) = self.accounts_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!(target: "account", error = %e, "Creating the accounts directory failed");
            }
        }
        if let Err(e) = std::fs::write(&self.accounts_path, &body) {
            error!(target: "account", path = %self.accounts_path.display(), error = %e, "Writing the local accounts file failed");
        }
        if let Some(st) = &self.storage {
            if let Err(e) = st.store_accounts(&body).await {
                error!(target: "account", error = %e, "Uploading accounts to storage failed");
            }
        }
    }

    pub async fn get_account(&self, email: &str) -> Option<AccountRecord> {
        self.accounts.read().await.get(email).cloned()
    }

    /// Find the account owning a remember-me token.
    pub async fn find_remember_token(&self, token: &str) -> Option<String> {
        let accounts = self.accounts.read().await;
        accounts
            .iter()
            .find(|(_, acc)| acc.remember_token.as_deref() == Some(token))
            .map(|(email, _)| email.clone())
    }

    /// Store the session's current worksheet, dropping any grading result
    /// left over from the previous one.
    #[instrument(level = "debug", skip(self, worksheet), fields(worksheet_id = %worksheet.id))]
    pub async fn put_worksheet(&self, session_token: &str, worksheet: Worksheet) {
        self.results.write().await.remove(session_token);
        self.worksheets.write().await.insert(session_token.to_string(), worksheet);
    }

    pub async fn get_worksheet(&self, session_token: &str) -> Option<Worksheet> {
        self.worksheets.read().await.get(session_token).cloned()
    }

    pub async fn put_result(&self, session_token: &str, graded: GradedWorksheet) {
        self.results.write().await.insert(session_token.to_string(), graded);
    }

    pub async fn get_result(&self, session_token: &str) -> Option<GradedWorksheet> {
        self.results.read().await.get(session_token).cloned()
    }

    /// Forget a session's worksheet and result (logout).
    pub async fn drop_session_artifacts(&self, session_token: &str) {
        self.worksheets.write().await.remove(session_token);
        self.results.write().await.remove(session_token);
    }

    pub async fn put_pending_order(&self, order_id: &str, order: PendingOrder) {
        self.pending_orders.write().await.insert(order_id.to_string(), order);
    }

    pub async fn take_pending_order(&self, order_id: &str) -> Option<PendingOrder> {
        self.pending_orders.write().await.remove(order_id)
    }
}

/// Load the account map: storage service first, then the local file, then
/// empty. Each fallback is logged so deployments can tell where their
/// accounts came from.
async fn load_accounts(storage: Option<&Storage>, path: &Path) -> HashMap<String, AccountRecord> {
    if let Some(st) = storage {
        match st.fetch_accounts().await {
            Ok(Some(body)) => match serde_json::from_str(&body) {
                Ok(map) => {
                    info!(target: "account", "Loaded accounts from file storage");
                    return map;
                }
                Err(e) => {
                    error!(target: "account", error = %e, "Stored accounts file is not valid JSON; trying the local file");
                }
            },
            Ok(None) => {
                info!(target: "account", "No accounts file in storage yet; trying the local file");
            }
            Err(e) => {
                error!(target: "account", error = %e, "Fetching accounts from storage failed; trying the local file");
            }
        }
    }
    match std::fs::read_to_string(path) {
        Ok(body) => match serde_json::from_str(&body) {
            Ok(map) => {
                info!(target: "account", path = %path.display(), "Loaded accounts from the local file");
                map
            }
            Err(e) => {
                error!(target: "account", path = %path.display(), error = %e, "Local accounts file is not valid JSON; starting empty");
                HashMap::new()
            }
        },
        Err(_) => {
            info!(target: "account", path = %path.display(), "No local accounts file; starting empty");
            HashMap::new()
        }
    }
}

#[cfg(test)]
impl AppState {
    /// Bare state for tests: no external clients, throwaway accounts path.
    pub fn for_tests() -> Self {
        let path =
            std::env::temp_dir().join(format!("mathex-accounts-{}.json", uuid::Uuid::new_v4()));
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            sessions: SessionStore::default(),
            worksheets: Arc::new(RwLock::new(HashMap::new())),
            results: Arc::new(RwLock::new(HashMap::new())),
            pending_orders: Arc::new(RwLock::new(HashMap::new())),
            config: AppConfig::default(),
            storage: None,
            paypal: None,
            activation_secret: "test-secret".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            accounts_path: path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Operation, Tier, WorksheetCategory};
    use chrono::Utc;

    fn sheet(id: &str) -> Worksheet {
        Worksheet {
            id: id.into(),
            tier: Tier::Easy,
            columns: 3,
            categories: vec![WorksheetCategory { op: Operation::Addition, exercises: vec![] }],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn a_new_worksheet_drops_the_stale_result() {
        let state = AppState::for_tests();
        state.put_worksheet("tok", sheet("w1")).await;
        state
            .put_result(
                "tok",
                GradedWorksheet {
                    worksheet_id: "w1".into(),
                    categories: vec![],
                    correct: 0,
                    total: 0,
                    score: 0,
                },
            )
            .await;
        assert!(state.get_result("tok").await.is_some());

        state.put_worksheet("tok", sheet("w2")).await;
        assert!(state.get_result("tok").await.is_none());
        assert_eq!(state.get_worksheet("tok").await.unwrap().id, "w2");

        state.drop_session_artifacts("tok").await;
        assert!(state.get_worksheet("tok").await.is_none());
    }

    #[tokio::test]
    async fn remember_tokens_resolve_to_their_account() {
        let state = AppState::for_tests();
        {
            let mut accounts = state.accounts.write().await;
            let mut acc: AccountRecord =
                serde_json::from_str(r#"{"password_hash":"h"}"#).unwrap();
            acc.remember_token = Some("long-lived".into());
            accounts.insert("kid@example.com".into(), acc);
        }
        assert_eq!(
            state.find_remember_token("long-lived").await.as_deref(),
            Some("kid@example.com")
        );
        assert!(state.find_remember_token("unknown").await.is_none());
    }

    #[tokio::test]
    async fn persisted_accounts_land_in_the_local_file() {
        let state = AppState::for_tests();
        {
            let mut accounts = state.accounts.write().await;
            let acc: AccountRecord = serde_json::from_str(r#"{"password_hash":"h"}"#).unwrap();
            accounts.insert("kid@example.com".into(), acc);
        }
        state.persist_accounts().await;

        let body = std::fs::read_to_string(&state.accounts_path).unwrap();
        let map: HashMap<String, AccountRecord> = serde_json::from_str(&body).unwrap();
        assert!(map.contains_key("kid@example.com"));
        let _ = std::fs::remove_file(&state.accounts_path);
    }

    #[tokio::test]
    async fn pending_orders_are_taken_once() {
        let state = AppState::for_tests();
        state
            .put_pending_order("ORDER-1", PendingOrder { email: "kid@example.com".into(), plan: Plan::Monthly })
            .await;
        let order = state.take_pending_order("ORDER-1").await.unwrap();
        assert_eq!(order.email, "kid@example.com");
        assert!(state.take_pending_order("ORDER-1").await.is_none());
    }
}
