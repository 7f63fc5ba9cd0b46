//! Session persistence for the two portals.
//!
//! The backend issues one opaque bearer token per portal; the token is the
//! whole session. [`SessionStore`] is the injected storage capability: the
//! API client and auth flows read through it and never touch storage
//! directly, so tests can swap in [`MemorySessionStore`]. The durable
//! implementation, [`FileSessionStore`], is the desktop analog of the
//! browser's local storage and keeps both portal tokens in one JSON file.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Storage key for the customer portal token.
const CUSTOMER_TOKEN_KEY: &str = "customerToken";
/// Storage key for the admin portal token.
const ADMIN_TOKEN_KEY: &str = "adminToken";

/// The two portals served by the backend. Sessions never cross portals.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Portal {
    Customer,
    Admin,
}

impl Portal {
    /// Storage key under which this portal's token is persisted.
    #[must_use]
    pub const fn token_key(self) -> &'static str {
        match self {
            Self::Customer => CUSTOMER_TOKEN_KEY,
            Self::Admin => ADMIN_TOKEN_KEY,
        }
    }

    /// Login route users are sent to when this portal's session is missing.
    #[must_use]
    pub const fn login_path(self) -> &'static str {
        match self {
            Self::Customer => "/customer/login",
            Self::Admin => "/admin/login",
        }
    }

    /// API path prefix for this portal's endpoints.
    #[must_use]
    pub const fn api_prefix(self) -> &'static str {
        match self {
            Self::Customer => "/api/v1/customer",
            Self::Admin => "/api/v1/admin",
        }
    }

    /// Parse a portal name as given on the command line.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "customer" => Some(Self::Customer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Injected session storage capability.
///
/// Implementations must be idempotent: clearing an absent token is a no-op
/// and reads have no side effects.
pub trait SessionStore: Send + Sync {
    /// Current token for the portal, if any.
    fn get(&self, portal: Portal) -> Option<SecretString>;
    /// Persist a token for the portal, replacing any previous one.
    fn set(&self, portal: Portal, token: SecretString);
    /// Remove the portal's token.
    fn clear(&self, portal: Portal);
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemorySessionStore {
    tokens: Mutex<HashMap<&'static str, String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, portal: Portal) -> Option<SecretString> {
        self.tokens
            .lock()
            .ok()?
            .get(portal.token_key())
            .map(|token| SecretString::from(token.clone()))
    }

    fn set(&self, portal: Portal, token: SecretString) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(portal.token_key(), token.expose_secret().to_string());
        }
    }

    fn clear(&self, portal: Portal) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.remove(portal.token_key());
        }
    }
}

/// Durable store backed by a JSON file holding both portal tokens.
///
/// Storage failures are logged and tolerated: a stale or missing session is
/// preferable to failing the flow that triggered the write. Two processes
/// sharing one file are last-write-wins, like two tabs sharing local storage.
pub struct FileSessionStore {
    path: PathBuf,
    tokens: Mutex<HashMap<String, String>>,
}

impl FileSessionStore {
    /// Open a session file, starting empty when it is missing or unreadable.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let tokens = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(tokens) => tokens,
                Err(err) => {
                    warn!("Ignoring corrupt session file {}: {err}", path.display());
                    HashMap::new()
                }
            },
            Err(err) => {
                debug!("No session file at {}: {err}", path.display());
                HashMap::new()
            }
        };

        Self {
            path,
            tokens: Mutex::new(tokens),
        }
    }

    fn persist(&self, tokens: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = fs::create_dir_all(parent) {
                    warn!("Failed to create session directory: {err}");
                    return;
                }
            }
        }

        match serde_json::to_string(tokens) {
            Ok(contents) => {
                if let Err(err) = fs::write(&self.path, contents) {
                    warn!("Failed to persist session file {}: {err}", self.path.display());
                }
            }
            Err(err) => warn!("Failed to encode session file: {err}"),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, portal: Portal) -> Option<SecretString> {
        self.tokens
            .lock()
            .ok()?
            .get(portal.token_key())
            .map(|token| SecretString::from(token.clone()))
    }

    fn set(&self, portal: Portal, token: SecretString) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(
                portal.token_key().to_string(),
                token.expose_secret().to_string(),
            );
            self.persist(&tokens);
        }
    }

    fn clear(&self, portal: Portal) {
        if let Ok(mut tokens) = self.tokens.lock() {
            if tokens.remove(portal.token_key()).is_some() {
                self.persist(&tokens);
            }
        }
    }
}
