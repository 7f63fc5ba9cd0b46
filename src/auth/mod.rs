//! Login, logout and profile state for one portal.
//!
//! [`Auth`] never surfaces errors from login as `Err`: the outcome carries a
//! human-readable message extracted from the envelope so callers can render
//! it inline without unwinding. Authentication changes are published on a
//! watch channel so caches can refresh on login and clear on logout without
//! being wired to the login call sites.

use crate::api::{envelope, ApiClient, ApiError};
use crate::session::{Portal, SessionStore};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Cached user profile snapshot. Every field is optional; the backend omits
/// what a given account does not have.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub business_name: Option<String>,
}

/// Result of a login or signup attempt. Failures carry the most specific
/// message the backend offered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoginOutcome {
    pub ok: bool,
    pub message: Option<String>,
}

impl LoginOutcome {
    fn success() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            ok: false,
            message: Some(message),
        }
    }
}

/// Signup payload for the customer portal.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub business_name: String,
    pub phone: Option<String>,
}

pub struct Auth {
    client: Arc<ApiClient>,
    store: Arc<dyn SessionStore>,
    portal: Portal,
    profile: RwLock<Option<Profile>>,
    authenticated: watch::Sender<bool>,
}

impl Auth {
    #[must_use]
    pub fn new(client: Arc<ApiClient>, store: Arc<dyn SessionStore>, portal: Portal) -> Self {
        let (authenticated, _) = watch::channel(store.get(portal).is_some());

        Self {
            client,
            store,
            portal,
            profile: RwLock::new(None),
            authenticated,
        }
    }

    /// A present token is the whole definition of being authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store.get(self.portal).is_some()
    }

    /// Observe authentication changes. The receiver sees `true` after a
    /// successful login and `false` after logout.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    /// Last fetched profile snapshot, if any.
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.profile.read().ok().and_then(|profile| profile.clone())
    }

    /// Authenticate with the backend and persist the returned token.
    ///
    /// Never fails with an error: any problem becomes a displayable message
    /// in the outcome and already-entered form state stays with the caller.
    pub async fn login(&self, email: &str, password: &str) -> LoginOutcome {
        let body = json!({ "email": email, "password": password });

        match self
            .client
            .post(&self.client.prefixed("/auth/login"), &body)
            .await
        {
            Ok(value) => self.adopt_token(&value).await,
            Err(err) => LoginOutcome::failure(err.user_message()),
        }
    }

    /// Register a new customer account. The backend logs the account in on
    /// success, so the response envelope is handled exactly like login.
    pub async fn signup(&self, request: &SignupRequest) -> LoginOutcome {
        match self
            .client
            .post(&self.client.prefixed("/auth/signup"), request)
            .await
        {
            Ok(value) => self.adopt_token(&value).await,
            Err(err) => LoginOutcome::failure(err.user_message()),
        }
    }

    /// Clear the persisted token and cached profile. Idempotent.
    pub fn logout(&self) {
        self.store.clear(self.portal);
        if let Ok(mut profile) = self.profile.write() {
            *profile = None;
        }
        self.authenticated.send_replace(false);
    }

    /// Best-effort profile refresh. No-ops without a token; a failed fetch
    /// keeps the previous snapshot because stale data beats a crashed view.
    pub async fn load_me(&self) -> Option<Profile> {
        self.store.get(self.portal)?;

        match self.client.get(&self.client.prefixed("/auth/me")).await {
            Ok(value) => {
                let fetched = extract_profile(&value);
                if let Some(profile) = &fetched {
                    if let Ok(mut cached) = self.profile.write() {
                        *cached = Some(profile.clone());
                    }
                }
                fetched
            }
            Err(ApiError::SessionExpired { .. }) => {
                self.authenticated.send_replace(false);
                None
            }
            Err(err) => {
                warn!("Profile refresh failed: {err}");
                self.profile()
            }
        }
    }

    async fn adopt_token(&self, value: &Value) -> LoginOutcome {
        let Some(token) = envelope::extract_token(value) else {
            return LoginOutcome::failure("Login response did not include a token".to_string());
        };

        self.store.set(self.portal, SecretString::from(token));
        self.authenticated.send_replace(true);
        debug!("Authenticated against {:?} portal", self.portal);

        // Profile staleness is tolerable; login already succeeded.
        let _ = self.load_me().await;

        LoginOutcome::success()
    }
}

/// Profile from whichever envelope nesting the backend used.
fn extract_profile(value: &Value) -> Option<Profile> {
    let data = envelope::data(value);
    let user = if data["user"].is_object() {
        &data["user"]
    } else {
        data
    };

    serde_json::from_value(user.clone()).ok()
}
