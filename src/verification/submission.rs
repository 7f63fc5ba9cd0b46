//! Four-step business verification submission flow.
//!
//! Flow overview:
//! - Business info, compliance and contact person are each validated locally
//!   and then POSTed to their own endpoint; the backend persists every step
//!   before the next becomes reachable.
//! - Review finalizes with a `complete` call; the resulting status comes
//!   from the backend, never from the client.
//! - Drafts live only in memory. Leaving the flow discards them; re-entry
//!   re-fetches the authoritative record and gates on it.
//!
//! The state machine is a tagged union with a single transition method, so
//! submitting a step out of order is a structural error, not a late
//! server-side rejection.

use super::VerificationRecord;
use crate::api::{ApiClient, ApiError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Step one: who the business is. All eight fields are required free text.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessInfo {
    pub business_name: String,
    pub registration_number: String,
    pub business_type: String,
    pub industry: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Step two: the compliance questionnaire. The yes/no questions are radio
/// pairs defaulting to No; an unanswered question is recorded as No.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplianceAnswers {
    pub countries_of_operation: String,
    pub has_aml_policy: bool,
    pub has_data_protection_policy: bool,
    pub has_regulatory_license: bool,
    pub operates_in_restricted_industries: bool,
}

/// Step three: the person the reviewers can reach.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactPerson {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub website: Option<String>,
}

/// Client-side field validation failure. Never sent to the server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn required(field: &'static str, label: &str) -> Self {
        Self {
            field,
            message: format!("{label} is required"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.field, self.message)
    }
}

fn require(field: &'static str, label: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::required(field, label))
    } else {
        Ok(())
    }
}

/// Basic email format check.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email.trim()))
}

impl BusinessInfo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("businessName", "Business name", &self.business_name)?;
        require(
            "registrationNumber",
            "Registration number",
            &self.registration_number,
        )?;
        require("businessType", "Business type", &self.business_type)?;
        require("industry", "Industry", &self.industry)?;
        require("address", "Address", &self.address)?;
        require("city", "City", &self.city)?;
        require("state", "State", &self.state)?;
        require("country", "Country", &self.country)
    }
}

impl ComplianceAnswers {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(
            "countriesOfOperation",
            "Countries of operation",
            &self.countries_of_operation,
        )
    }
}

impl ContactPerson {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("fullName", "Full name", &self.full_name)?;
        require("email", "Email", &self.email)?;
        if !valid_email(&self.email) {
            return Err(ValidationError {
                field: "email",
                message: "Email is not a valid address".to_string(),
            });
        }
        require("phone", "Phone number", &self.phone)?;
        require("role", "Role", &self.role)
    }
}

/// Where the submission currently is. Advancing past `Review` is terminal;
/// the refreshed server status takes over from there.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmissionState {
    BusinessInfo,
    Compliance,
    ContactPerson,
    Review,
    Submitted,
}

impl SubmissionState {
    /// What the state accepts next, for out-of-order diagnostics.
    #[must_use]
    pub const fn expects(self) -> &'static str {
        match self {
            Self::BusinessInfo => "business info",
            Self::Compliance => "compliance answers",
            Self::ContactPerson => "contact person",
            Self::Review => "completion",
            Self::Submitted => "nothing, submission is complete",
        }
    }
}

/// Input for the next transition.
#[derive(Clone, Debug)]
pub enum StepInput {
    BusinessInfo(BusinessInfo),
    Compliance(ComplianceAnswers),
    ContactPerson(ContactPerson),
    Complete,
}

#[derive(Clone, Debug)]
pub enum SubmissionError {
    /// Local validation failed; no network call was made.
    Validation(ValidationError),
    /// Input does not match the current step; no network call was made.
    OutOfOrder { expected: &'static str },
    /// The backend rejected the step; the state is unchanged.
    Api(ApiError),
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(err) => write!(formatter, "{}", err.message),
            Self::OutOfOrder { expected } => {
                write!(formatter, "Out of order, the flow expects {expected}")
            }
            Self::Api(err) => write!(formatter, "{}", err.user_message()),
        }
    }
}

impl std::error::Error for SubmissionError {}

impl From<ValidationError> for SubmissionError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<ApiError> for SubmissionError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

/// Entry guard outcome: a live submission, or the read-only record when one
/// is already in flight or decided.
pub enum SubmissionGate {
    Open(Submission),
    ReadOnly(VerificationRecord),
}

/// Driver for one submission session.
pub struct Submission {
    client: Arc<ApiClient>,
    state: SubmissionState,
}

impl Submission {
    /// Apply the entry guard: only `inactive` and `rejected` records may
    /// start a submission, everything else renders read-only.
    #[must_use]
    pub fn begin(client: Arc<ApiClient>, record: &VerificationRecord) -> SubmissionGate {
        if record.status.can_submit() {
            SubmissionGate::Open(Self {
                client,
                state: SubmissionState::BusinessInfo,
            })
        } else {
            SubmissionGate::ReadOnly(record.clone())
        }
    }

    /// Re-enter a flow whose earlier steps the backend has already
    /// accepted, e.g. across separate invocations. The entry guard still
    /// applies; the backend remains the authority on step ordering.
    #[must_use]
    pub fn resume_at(
        client: Arc<ApiClient>,
        record: &VerificationRecord,
        state: SubmissionState,
    ) -> SubmissionGate {
        match Self::begin(client, record) {
            SubmissionGate::Open(mut submission) => {
                submission.state = state;
                SubmissionGate::Open(submission)
            }
            readonly @ SubmissionGate::ReadOnly(_) => readonly,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SubmissionState {
        self.state
    }

    /// Validate the input, persist it server-side, and only then advance.
    /// A failure of either gate leaves the state exactly where it was.
    pub async fn submit(&mut self, input: StepInput) -> Result<SubmissionState, SubmissionError> {
        let next = match (self.state, input) {
            (SubmissionState::BusinessInfo, StepInput::BusinessInfo(draft)) => {
                draft.validate()?;
                self.post("/verification/submit-business-info", &draft)
                    .await?;
                SubmissionState::Compliance
            }
            (SubmissionState::Compliance, StepInput::Compliance(draft)) => {
                draft.validate()?;
                self.post("/verification/submit-compliance", &draft).await?;
                SubmissionState::ContactPerson
            }
            (SubmissionState::ContactPerson, StepInput::ContactPerson(draft)) => {
                draft.validate()?;
                self.post("/verification/submit-contact-person", &draft)
                    .await?;
                SubmissionState::Review
            }
            (SubmissionState::Review, StepInput::Complete) => {
                self.post("/verification/complete", &json!({})).await?;
                info!("Verification submission completed");
                SubmissionState::Submitted
            }
            (state, _) => {
                return Err(SubmissionError::OutOfOrder {
                    expected: state.expects(),
                })
            }
        };

        self.state = next;
        Ok(next)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.client
            .post(&self.client.prefixed(path), body)
            .await
            .map(|_| ())
    }
}
