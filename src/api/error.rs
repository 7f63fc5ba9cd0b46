//! Error taxonomy for backend calls. Network transport, HTTP status, and the
//! backend's own error envelope are kept distinct so callers can branch on
//! what actually failed; the `Display` form is the string shown inline next
//! to the control that triggered the call.

use std::fmt;

/// Error codes the backend places in its error envelope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    Unauthorized,
    InsufficientBalance,
    ValidationError,
    RateLimitExceeded,
    Other(String),
}

impl ErrorCode {
    /// Map a raw envelope code onto the known set.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code {
            "UNAUTHORIZED" => Self::Unauthorized,
            "INSUFFICIENT_BALANCE" => Self::InsufficientBalance,
            "VALIDATION_ERROR" => Self::ValidationError,
            "RATE_LIMIT_EXCEEDED" => Self::RateLimitExceeded,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::Other(code) => code,
        }
    }
}

#[derive(Clone, Debug)]
pub enum ApiError {
    /// The request never produced a response.
    Network(String),
    /// Non-2xx response without a structured error body.
    Http { status: u16, message: String },
    /// The backend's error envelope, with its code and message.
    Api { code: ErrorCode, message: String },
    /// A 401 cleared the session; `redirect` is the login route to navigate
    /// to, carrying the caller's current path in its `from` parameter.
    SessionExpired { redirect: String },
    /// The response body could not be interpreted.
    Parse(String),
}

impl ApiError {
    /// The message a portal shows to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(message) => format!("Unable to reach the server: {message}"),
            Self::Http { message, .. } | Self::Api { message, .. } => message.clone(),
            Self::SessionExpired { .. } => "Your session has expired".to_string(),
            Self::Parse(message) => format!("Unexpected response: {message}"),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(message) => write!(formatter, "Network error: {message}"),
            Self::Http { status, message } => {
                write!(formatter, "Request failed ({status}): {message}")
            }
            Self::Api { code, message } => {
                write!(formatter, "{message} [{}]", code.as_str())
            }
            Self::SessionExpired { redirect } => {
                write!(formatter, "Session expired, sign in again at {redirect}")
            }
            Self::Parse(message) => write!(formatter, "Response error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}
