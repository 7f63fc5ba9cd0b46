//! Wallet balance and the dashboard's recurring balance refresh.

pub mod topup;
pub mod usage;

use crate::api::{envelope, ApiClient, ApiError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;

/// A money amount as the backend renders it: kobo for arithmetic, naira and
/// a formatted string for display.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Amount {
    pub kobo: i64,
    pub naira: f64,
    pub formatted: String,
}

/// Wallet balance from whichever nesting the endpoint used.
fn extract_balance(value: &Value) -> Option<Amount> {
    let data = envelope::data(value);
    let candidates = [&data["balance"], &data["wallet"]["balance"], data];

    candidates
        .into_iter()
        .find(|candidate| candidate.is_object() && !candidate["kobo"].is_null())
        .and_then(|candidate| serde_json::from_value(candidate.clone()).ok())
}

/// Fetch the current wallet balance.
pub async fn fetch_balance(client: &ApiClient) -> Result<Option<Amount>, ApiError> {
    let value = client.get(&client.prefixed("/wallet/balance")).await?;
    Ok(extract_balance(&value))
}

/// Cached balance for the dashboard.
#[derive(Default)]
pub struct BalanceCache {
    balance: RwLock<Option<Amount>>,
}

impl BalanceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn balance(&self) -> Option<Amount> {
        self.balance.read().ok().and_then(|balance| balance.clone())
    }

    pub fn clear(&self) {
        if let Ok(mut balance) = self.balance.write() {
            *balance = None;
        }
    }

    /// Refresh once; failures keep the previous value on screen.
    pub async fn refresh(&self, client: &ApiClient) {
        match fetch_balance(client).await {
            Ok(Some(amount)) => {
                if let Ok(mut balance) = self.balance.write() {
                    *balance = Some(amount);
                }
            }
            Ok(None) => debug!("Balance response had no recognizable amount"),
            Err(err) => debug!("Balance refresh failed: {err}"),
        }
    }

    /// Refresh on a jittered fixed interval while the dashboard is mounted.
    /// Abort the returned handle on unmount.
    pub fn spawn_auto_refresh(
        cache: Arc<Self>,
        client: Arc<ApiClient>,
        every: Duration,
    ) -> JoinHandle<()> {
        let jitter_factor = 0.1;
        let jittered = every.mul_f64(rand::thread_rng().gen_range(1.0 - jitter_factor..1.0));

        tokio::spawn(async move {
            let mut refresh_interval = interval(jittered);

            // The first tick fires immediately and seeds the cache.
            loop {
                refresh_interval.tick().await;
                cache.refresh(&client).await;
            }
        })
    }
}
