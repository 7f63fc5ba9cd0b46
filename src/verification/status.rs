//! Memoized verification status with auth-driven refresh.
//!
//! The cache is refreshed on every protected navigation and whenever the
//! session flips authenticated. Refreshes are background work: an expired
//! session clears the cache silently, any other failure records an error and
//! leaves the status at `inactive` rather than undefined.

use super::{extract_record, VerificationRecord, VerificationStatus};
use crate::api::{ApiClient, ApiError};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Default)]
pub struct StatusCache {
    record: RwLock<Option<VerificationRecord>>,
    error: RwLock<Option<String>>,
}

impl StatusCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the current record and memoize it.
    pub async fn refresh(&self, client: &ApiClient) {
        match client.get(&client.prefixed("/verification/status")).await {
            Ok(value) => {
                self.set(Some(extract_record(&value)), None);
            }
            Err(ApiError::SessionExpired { .. }) => {
                // Background refresh, not a user action: drop the data, no error.
                self.clear();
            }
            Err(err) => {
                self.set(
                    Some(VerificationRecord::default()),
                    Some(err.user_message()),
                );
            }
        }
    }

    /// Forget everything, as on logout.
    pub fn clear(&self) {
        self.set(None, None);
    }

    #[must_use]
    pub fn record(&self) -> Option<VerificationRecord> {
        self.record.read().ok().and_then(|record| record.clone())
    }

    /// Current status, `inactive` when nothing is cached.
    #[must_use]
    pub fn status(&self) -> VerificationStatus {
        self.record().map_or_else(Default::default, |record| record.status)
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.error.read().ok().and_then(|error| error.clone())
    }

    fn set(&self, record: Option<VerificationRecord>, error: Option<String>) {
        if let Ok(mut cached) = self.record.write() {
            *cached = record;
        }
        if let Ok(mut cached) = self.error.write() {
            *cached = error;
        }
    }

    /// Keep the cache in step with authentication: refresh when the session
    /// flips authenticated, clear when it flips away. The task ends when the
    /// auth channel is dropped.
    pub fn spawn_auto_refresh(
        cache: Arc<Self>,
        client: Arc<ApiClient>,
        mut authenticated: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if *authenticated.borrow() {
                cache.refresh(&client).await;
            }

            while authenticated.changed().await.is_ok() {
                let is_authenticated = *authenticated.borrow_and_update();
                if is_authenticated {
                    cache.refresh(&client).await;
                } else {
                    debug!("Session ended, clearing verification status cache");
                    cache.clear();
                }
            }
        })
    }
}
