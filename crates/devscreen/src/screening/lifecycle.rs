use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    ClinicalRiskLevel, Review, ReviewId, Screening, ScreeningId, ScreeningStatus, UserId,
};
use super::repository::ScreeningRepository;
use crate::storage::StorageError;

/// Gatekeeper for review eligibility and the single-review guarantee.
pub struct ReviewLifecycle<R> {
    repository: Arc<R>,
}

impl<R> ReviewLifecycle<R>
where
    R: ScreeningRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Screenings whose payment settled and that have no review yet, newest first.
    pub fn list_pending_reviews(&self) -> Result<Vec<Screening>, LifecycleError> {
        Ok(self.repository.pending_reviews()?)
    }

    pub fn screening(&self, screening_id: &ScreeningId) -> Result<Screening, LifecycleError> {
        self.repository
            .fetch_screening(screening_id)?
            .ok_or(LifecycleError::NotFound(*screening_id))
    }

    pub fn review_for(&self, screening_id: &ScreeningId) -> Result<Option<Review>, LifecycleError> {
        self.screening(screening_id)?;
        Ok(self.repository.fetch_review(screening_id)?)
    }

    /// Record payment settlement for a screening. Safe to repeat.
    pub fn settle_payment(&self, screening_id: &ScreeningId) -> Result<Screening, LifecycleError> {
        match self.repository.settle_payment(screening_id) {
            Ok(screening) => {
                info!(screening_id = %screening_id, status = ?screening.status, "payment settled");
                Ok(screening)
            }
            Err(StorageError::NotFound) => Err(LifecycleError::NotFound(*screening_id)),
            Err(other) => Err(other.into()),
        }
    }

    /// Advisory `PendingReview -> UnderReview` move when a clinician opens the case.
    /// Opening an already opened case is a no-op.
    pub fn open_review(&self, screening_id: &ScreeningId) -> Result<Screening, LifecycleError> {
        let screening = self.screening(screening_id)?;

        match screening.status {
            ScreeningStatus::UnderReview => Ok(screening),
            ScreeningStatus::PendingReview => {
                match self.repository.transition(
                    screening_id,
                    ScreeningStatus::PendingReview,
                    ScreeningStatus::UnderReview,
                ) {
                    Ok(opened) => Ok(opened),
                    Err(StorageError::Conflict) => {
                        let current = self.screening(screening_id)?;
                        if current.status == ScreeningStatus::UnderReview {
                            Ok(current)
                        } else {
                            Err(LifecycleError::precondition(
                                *screening_id,
                                format!("screening is {}", current.status.label()),
                            ))
                        }
                    }
                    Err(other) => Err(other.into()),
                }
            }
            other => Err(LifecycleError::precondition(
                *screening_id,
                format!("cannot open a review while {}", other.label()),
            )),
        }
    }

    /// Attach the single clinical review for a screening and complete it.
    ///
    /// Uniqueness is enforced by the repository's atomic insert, so when several
    /// clinicians race on the same screening exactly one call succeeds and every other
    /// caller gets [`LifecycleError::ConcurrencyConflict`]. Conflicts are final and
    /// should not be retried.
    pub fn create_review(
        &self,
        screening_id: ScreeningId,
        clinical_notes: Option<String>,
        clinical_risk_level: Option<ClinicalRiskLevel>,
        reviewer: UserId,
    ) -> Result<Review, LifecycleError> {
        self.screening(&screening_id)?;

        let settled = self
            .repository
            .fetch_payment(&screening_id)?
            .is_some_and(|payment| payment.is_settled());
        if !settled {
            return Err(LifecycleError::precondition(
                screening_id,
                "payment has not settled",
            ));
        }

        let review = Review {
            review_id: ReviewId::new(),
            screening_id,
            clinical_notes: clinical_notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            clinical_risk_level,
            reviewed_at: Utc::now(),
            reviewed_by: reviewer,
        };

        match self.repository.insert_review(review) {
            Ok((review, screening)) => {
                info!(
                    screening_id = %screening_id,
                    review_id = %review.review_id,
                    status = ?screening.status,
                    "clinical review recorded"
                );
                Ok(review)
            }
            Err(StorageError::Conflict) => {
                warn!(screening_id = %screening_id, "review rejected: screening already reviewed");
                Err(LifecycleError::ConcurrencyConflict(screening_id))
            }
            Err(StorageError::InvalidState(reason)) => {
                Err(LifecycleError::precondition(screening_id, reason))
            }
            Err(StorageError::NotFound) => Err(LifecycleError::NotFound(screening_id)),
            Err(other) => Err(other.into()),
        }
    }
}

/// Error raised by lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("screening {0} not found")]
    NotFound(ScreeningId),
    #[error("screening {screening_id} is not eligible: {reason}")]
    PreconditionFailed {
        screening_id: ScreeningId,
        reason: String,
    },
    #[error("screening {0} already has a clinical review")]
    ConcurrencyConflict(ScreeningId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LifecycleError {
    fn precondition(screening_id: ScreeningId, reason: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            screening_id,
            reason: reason.into(),
        }
    }
}
