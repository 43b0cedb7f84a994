use super::domain::{PaymentIntent, Review, Screening, ScreeningId, ScreeningStatus};
use crate::storage::StorageError;

/// Storage abstraction for screenings, their payments and their reviews.
///
/// Implementations own the atomicity guarantees the lifecycle relies on:
/// [`ScreeningRepository::insert_review`] must behave like an insert against a unique
/// index on `screening_id`, and [`ScreeningRepository::transition`] like a
/// compare-and-swap on the status column.
pub trait ScreeningRepository: Send + Sync {
    fn insert_screening(
        &self,
        screening: Screening,
        payment: PaymentIntent,
    ) -> Result<Screening, StorageError>;

    fn fetch_screening(&self, id: &ScreeningId) -> Result<Option<Screening>, StorageError>;

    fn fetch_payment(&self, id: &ScreeningId) -> Result<Option<PaymentIntent>, StorageError>;

    fn fetch_review(&self, id: &ScreeningId) -> Result<Option<Review>, StorageError>;

    /// Mark the payment settled and, in the same step, advance a `PendingPayment`
    /// screening to `PendingReview`. Settling twice is a no-op.
    fn settle_payment(&self, id: &ScreeningId) -> Result<Screening, StorageError>;

    /// Set the status to `next` only if it is currently `expected`.
    /// Returns `Conflict` when the stored status differs.
    fn transition(
        &self,
        id: &ScreeningId,
        expected: ScreeningStatus,
        next: ScreeningStatus,
    ) -> Result<Screening, StorageError>;

    /// Screenings with a settled payment and no review, newest first.
    fn pending_reviews(&self) -> Result<Vec<Screening>, StorageError>;

    /// Attach a review and complete its screening as one atomic step.
    /// Returns `Conflict` when a review already references the screening and
    /// `InvalidState` when the screening's status cannot move to `Completed`.
    fn insert_review(&self, review: Review) -> Result<(Review, Screening), StorageError>;
}
