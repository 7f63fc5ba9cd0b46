//! Wallet top-up through the hosted payment page.
//!
//! Flow overview:
//! - `initiate` checks the amount bounds locally, then asks the backend for
//!   a payment session: a unique reference plus the hosted payment URL the
//!   browser fully navigates to. The app context is torn down at that point.
//! - Control returns on the callback route with the reference echoed in the
//!   query string, under either name the processor uses.
//! - `confirm` polls the public verify endpoint, keyed only by the
//!   reference, because the session may not exist in the new navigation
//!   context. Polling is bounded: a payment still pending after the last
//!   attempt resolves to the explicit `TimedOut` terminal state.

use super::Amount;
use crate::api::{envelope, ApiClient, ApiError};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

/// Smallest accepted top-up, in naira.
pub const MIN_TOPUP_NAIRA: u64 = 100;
/// Largest accepted top-up, in naira.
pub const MAX_TOPUP_NAIRA: u64 = 1_000_000;

/// Query parameter names the payment processor uses for the reference.
const REFERENCE_PARAMS: [&str; 2] = ["reference", "trxref"];

/// A payment session allocated by the backend.
#[derive(Clone, Debug, Default)]
pub struct TopUpSession {
    pub reference: String,
    pub amount: Amount,
    pub payment_url: String,
    pub access_code: Option<String>,
    pub public_key: Option<String>,
}

#[derive(Clone, Debug)]
pub enum TopUpError {
    /// The amount failed the client-side bounds; nothing was sent.
    InvalidAmount(String),
    Api(ApiError),
}

impl fmt::Display for TopUpError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAmount(message) => write!(formatter, "{message}"),
            Self::Api(err) => write!(formatter, "{}", err.user_message()),
        }
    }
}

impl std::error::Error for TopUpError {}

impl From<ApiError> for TopUpError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

/// Enforce the top-up bounds before any network call.
pub fn validate_amount(naira: u64) -> Result<(), TopUpError> {
    if naira < MIN_TOPUP_NAIRA {
        return Err(TopUpError::InvalidAmount(
            "Minimum top-up amount is ₦100".to_string(),
        ));
    }
    if naira > MAX_TOPUP_NAIRA {
        return Err(TopUpError::InvalidAmount(
            "Maximum top-up amount is ₦1,000,000".to_string(),
        ));
    }
    Ok(())
}

/// Ask the backend for a payment session.
pub async fn initiate(
    client: &ApiClient,
    naira: u64,
    callback_url: Option<&str>,
) -> Result<TopUpSession, TopUpError> {
    validate_amount(naira)?;

    let mut body = json!({ "amount": naira });
    if let Some(callback) = callback_url {
        body["callbackUrl"] = json!(callback);
    }

    let value = client
        .post(&client.prefixed("/wallet/topup"), &body)
        .await?;

    extract_session(&value).ok_or_else(|| {
        TopUpError::Api(ApiError::Parse(
            "Top-up response was missing its payment session".to_string(),
        ))
    })
}

fn extract_session(value: &Value) -> Option<TopUpSession> {
    let data = envelope::data(value);

    let reference = data["reference"]
        .as_str()
        .or_else(|| data["payment"]["reference"].as_str())?
        .to_string();
    let payment_url = data["payment"]["url"]
        .as_str()
        .or_else(|| data["paymentUrl"].as_str())?
        .to_string();
    let amount = serde_json::from_value(data["amount"].clone()).unwrap_or_default();

    Some(TopUpSession {
        reference,
        amount,
        payment_url,
        access_code: data["payment"]["accessCode"].as_str().map(str::to_string),
        public_key: data["publicKey"].as_str().map(str::to_string),
    })
}

/// Reference from a callback URL, under either query name the processor
/// uses. `None` when the redirect came back without one.
#[must_use]
pub fn extract_reference(callback_url: &str) -> Option<String> {
    let url = Url::parse(callback_url).ok()?;

    for param in REFERENCE_PARAMS {
        if let Some((_, value)) = url.query_pairs().find(|(name, _)| name == param) {
            if !value.trim().is_empty() {
                return Some(value.into_owned());
            }
        }
    }

    None
}

/// How long and how often to re-check a pending payment.
#[derive(Clone, Copy, Debug)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay: Duration::from_secs(3),
        }
    }
}

/// Terminal outcome of a top-up confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopUpOutcome {
    /// Payment confirmed; `amount_formatted` is the credited amount exactly
    /// as the backend renders it.
    Success {
        reference: String,
        amount_formatted: String,
    },
    /// The processor reported failure or abandonment, or the callback was
    /// unusable. Carries the most specific message available.
    Failed { message: String },
    /// Still pending after the last attempt.
    TimedOut { attempts: u32 },
}

/// Poll the public verify endpoint until the payment reaches a terminal
/// state or the policy is exhausted.
pub async fn confirm(
    client: &ApiClient,
    reference: &str,
    policy: PollPolicy,
) -> Result<TopUpOutcome, ApiError> {
    for attempt in 1..=policy.max_attempts {
        let value = client
            .get_public(&client.prefixed(&format!("/wallet/topup/verify/{reference}")))
            .await?;
        let transaction = extract_transaction(&value);

        match transaction["status"].as_str() {
            Some("success") => {
                let amount_formatted = transaction["amount"]["formatted"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                info!("Top-up {reference} confirmed");
                return Ok(TopUpOutcome::Success {
                    reference: reference.to_string(),
                    amount_formatted,
                });
            }
            Some("failed" | "abandoned") => {
                return Ok(TopUpOutcome::Failed {
                    message: failure_message(&value, transaction),
                });
            }
            status => {
                debug!(
                    "Top-up {reference} still {} (attempt {attempt}/{})",
                    status.unwrap_or("pending"),
                    policy.max_attempts
                );
                if attempt < policy.max_attempts {
                    sleep(policy.delay).await;
                }
            }
        }
    }

    Ok(TopUpOutcome::TimedOut {
        attempts: policy.max_attempts,
    })
}

/// Resolve a callback round-trip: extract the reference and confirm it.
/// A callback without a reference is terminal; no verification is attempted.
pub async fn resolve_callback(
    client: &ApiClient,
    callback_url: &str,
    policy: PollPolicy,
) -> Result<TopUpOutcome, ApiError> {
    match extract_reference(callback_url) {
        Some(reference) => confirm(client, &reference, policy).await,
        None => Ok(TopUpOutcome::Failed {
            message: "Invalid payment reference".to_string(),
        }),
    }
}

fn extract_transaction(value: &Value) -> &Value {
    let data = envelope::data(value);
    if data["transaction"].is_object() {
        &data["transaction"]
    } else {
        data
    }
}

fn failure_message(value: &Value, transaction: &Value) -> String {
    transaction["gatewayResponse"]
        .as_str()
        .or_else(|| envelope::data(value)["paystackStatus"].as_str())
        .map_or_else(
            || "Payment was not completed".to_string(),
            str::to_string,
        )
}
