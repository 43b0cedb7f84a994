//! Screening intake, payment settlement, and the single-review lifecycle.

pub mod domain;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod submission;

#[cfg(test)]
mod tests;

pub use domain::{
    ClinicalRiskLevel, FamilyId, PaymentIntent, PaymentStatus, Review, ReviewId, Screening,
    ScreeningId, ScreeningStatus, ScreeningView, UserId,
};
pub use lifecycle::{LifecycleError, ReviewLifecycle};
pub use repository::ScreeningRepository;
pub use router::{lifecycle_router, submission_router, ReviewRequest};
pub use submission::{
    Answer, AnswerValue, DomainAnswers, ProportionalScorer, RiskAssessment, RiskScorer,
    ScoringError, ScreeningSubmission, SubmissionError, SubmissionService,
};
