//! Authenticated REST client for the Konfirmi backend.
//!
//! One [`ApiClient`] serves one portal. It injects the portal's bearer token
//! from the injected [`SessionStore`], decodes the `{success, data|error}`
//! envelope at a single boundary, and turns any `401` into a cleared session
//! plus a login redirect carrying the caller's current path. Public
//! endpoints (payment verification) bypass the session entirely.

pub mod envelope;
pub mod error;

pub use error::{ApiError, ErrorCode};

use crate::session::{Portal, SessionStore};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument};
use url::Url;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    portal: Portal,
    store: Arc<dyn SessionStore>,
    current_path: RwLock<String>,
}

impl ApiClient {
    /// Build a client for the given portal against `base_url`.
    pub fn new(
        base_url: &str,
        portal: Portal,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)
            .map_err(|err| ApiError::Parse(format!("Invalid API base URL: {err}")))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ApiError::Parse(format!(
                    "Unsupported API base URL scheme: {scheme}"
                )))
            }
        }

        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .map_err(|err| ApiError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            portal,
            store,
            current_path: RwLock::new("/".to_string()),
        })
    }

    #[must_use]
    pub const fn portal(&self) -> Portal {
        self.portal
    }

    /// Record the route the caller is on, used for the `from` parameter of a
    /// session-expiry redirect.
    pub fn set_current_path(&self, path: &str) {
        if let Ok(mut current) = self.current_path.write() {
            *current = path.to_string();
        }
    }

    /// Login route with the current path preserved, e.g.
    /// `/customer/login?auth=1&from=%2Fcustomer%2Fusage`.
    #[must_use]
    pub fn login_redirect(&self) -> String {
        let path = self
            .current_path
            .read()
            .map_or_else(|_| "/".to_string(), |current| current.clone());
        let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();

        format!("{}?auth=1&from={encoded}", self.portal.login_path())
    }

    /// Join a path under this portal's API prefix.
    #[must_use]
    pub fn prefixed(&self, path: &str) -> String {
        format!("{}{path}", self.portal.api_prefix())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Authenticated GET.
    #[instrument(skip(self))]
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let request = self.http.get(self.endpoint(path));
        self.execute(request, true).await
    }

    /// Authenticated POST with a JSON body.
    #[instrument(skip(self, body))]
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let request = self.http.post(self.endpoint(path)).json(body);
        self.execute(request, true).await
    }

    /// Unauthenticated GET for public endpoints. Never attaches or clears the
    /// session; the caller may not have one in this navigation context.
    #[instrument(skip(self))]
    pub async fn get_public(&self, path: &str) -> Result<Value, ApiError> {
        let request = self.http.get(self.endpoint(path));
        self.execute(request, false).await
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        authenticated: bool,
    ) -> Result<Value, ApiError> {
        let request = if authenticated {
            match self.store.get(self.portal) {
                Some(token) => request.bearer_auth(token.expose_secret()),
                None => request,
            }
        } else {
            request
        };

        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let value = envelope::parse_body(&body);

        if status.as_u16() == 401 && authenticated {
            // Kill the session before anything downstream can retry with it.
            self.store.clear(self.portal);
            let redirect = self.login_redirect();
            debug!("Session expired, redirecting to {redirect}");
            return Err(ApiError::SessionExpired { redirect });
        }

        if !status.is_success() || envelope::reports_failure(&value) {
            let fallback = format!("Request failed with status {}", status.as_u16());
            let message = envelope::error_message(&value, &fallback);

            return Err(match envelope::error_code(&value) {
                Some(code) => ApiError::Api {
                    code: ErrorCode::parse(code),
                    message,
                },
                None => ApiError::Http {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        Ok(value)
    }
}
