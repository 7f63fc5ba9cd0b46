//! Business verification domain records.
//!
//! The verification status is server-owned: clients never write it, they
//! read it and derive UI gating from it. The happy path walks
//! `inactive → cac_pending → admin_review → verified`; `rejected` drops the
//! account back into a re-submittable state.

pub mod status;
pub mod submission;

use crate::api::envelope;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-owned verification progress.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Inactive,
    Pending,
    CacPending,
    AdminReview,
    Verified,
    Rejected,
}

impl VerificationStatus {
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }

    /// In flight somewhere between submission and review.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending | Self::CacPending | Self::AdminReview)
    }

    #[must_use]
    pub const fn needs_verification(self) -> bool {
        matches!(self, Self::Inactive)
    }

    #[must_use]
    pub const fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }

    /// Whether a new submission may be started. Anything already in flight
    /// or decided (other than rejection) locks the submission flow out.
    #[must_use]
    pub const fn can_submit(self) -> bool {
        matches!(self, Self::Inactive | Self::Rejected)
    }
}

/// Result of the registry lookup performed during review.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacVerification {
    pub verified: bool,
    pub company_name: Option<String>,
    pub registration_number: Option<String>,
    pub verified_at: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationRecord {
    pub status: VerificationStatus,
    pub submitted_at: Option<String>,
    pub reviewed_at: Option<String>,
    pub rejection_reason: Option<String>,
    pub cac_verification: Option<CacVerification>,
}

/// Normalize the status envelope into a record. Unknown shapes degrade to an
/// `inactive` record instead of failing a background refresh.
#[must_use]
pub fn extract_record(value: &Value) -> VerificationRecord {
    serde_json::from_value(envelope::data(value).clone()).unwrap_or_default()
}
