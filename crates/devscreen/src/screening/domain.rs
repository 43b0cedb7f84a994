use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::questions::{DomainScores, RiskLevel};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id!(
    /// Identifier for a submitted screening.
    ScreeningId
);
uuid_id!(
    /// Identifier for a clinician's review.
    ReviewId
);
uuid_id!(
    /// The family that owns a screening; notification scope is checked against it.
    FamilyId
);
uuid_id!(
    /// Account identifier for family members and clinicians alike.
    UserId
);

/// Lifecycle position of a screening.
///
/// `PendingPayment -> PendingReview -> UnderReview -> Completed`; `UnderReview` is
/// optional and `Completed` is reached only by attaching a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreeningStatus {
    PendingPayment,
    #[serde(alias = "SETTLED")]
    PendingReview,
    UnderReview,
    Completed,
}

impl ScreeningStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingPayment => "Pending payment",
            Self::PendingReview => "Pending review",
            Self::UnderReview => "Under review",
            Self::Completed => "Completed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::PendingReview)
                | (Self::PendingReview, Self::UnderReview)
                | (Self::PendingReview, Self::Completed)
                | (Self::UnderReview, Self::Completed)
        )
    }
}

/// One child's developmental assessment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screening {
    pub id: ScreeningId,
    pub family_id: FamilyId,
    pub child_name: String,
    pub child_age_months: u16,
    pub domain_scores: DomainScores,
    pub risk_score: Option<f64>,
    pub status: ScreeningStatus,
    pub created_at: DateTime<Utc>,
}

impl Screening {
    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.risk_score.map(RiskLevel::classify)
    }

    pub fn view(&self) -> ScreeningView {
        ScreeningView {
            screening_id: self.id,
            child_name: self.child_name.clone(),
            child_age_months: self.child_age_months,
            status: self.status,
            status_label: self.status.label(),
            domain_scores: self.domain_scores,
            risk_score: self.risk_score,
            risk_level: self.risk_level(),
            created_at: self.created_at,
        }
    }
}

/// Family- and dashboard-facing projection of a screening.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningView {
    pub screening_id: ScreeningId,
    pub child_name: String,
    pub child_age_months: u16,
    pub status: ScreeningStatus,
    pub status_label: &'static str,
    pub domain_scores: DomainScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    pub created_at: DateTime<Utc>,
}

/// Clinician-assigned risk, finer grained than [`RiskLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinicalRiskLevel {
    Low,
    Moderate,
    High,
}

impl ClinicalRiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

/// A clinician's final determination; at most one exists per screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: ReviewId,
    pub screening_id: ScreeningId,
    pub clinical_notes: Option<String>,
    pub clinical_risk_level: Option<ClinicalRiskLevel>,
    pub reviewed_at: DateTime<Utc>,
    pub reviewed_by: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Settled,
    Failed,
}

/// Payment obligation attached to a screening. Settlement itself happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub screening_id: ScreeningId,
    pub status: PaymentStatus,
    pub amount_cents: u64,
}

impl PaymentIntent {
    pub fn pending(screening_id: ScreeningId, amount_cents: u64) -> Self {
        Self {
            screening_id,
            status: PaymentStatus::Pending,
            amount_cents,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == PaymentStatus::Settled
    }
}
