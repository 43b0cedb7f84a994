use std::sync::Arc;

use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::questions::{DatasetSource, DomainScores, QuestionCatalog, QuestionId};
use crate::screening::{
    lifecycle_router, submission_router, Answer, AnswerValue, DomainAnswers, FamilyId,
    PaymentIntent, ProportionalScorer, Review, ReviewLifecycle, RiskAssessment, RiskScorer,
    ScoringError, Screening, ScreeningId, ScreeningRepository, ScreeningStatus,
    ScreeningSubmission, SubmissionService,
};
use crate::storage::{MemoryStore, StorageError};

pub(super) const PRICE_CENTS: u64 = 4_900;

pub(super) fn catalog() -> Arc<QuestionCatalog> {
    Arc::new(QuestionCatalog::new(DatasetSource::Bundled))
}

pub(super) fn answer(question_id: &str, value: AnswerValue) -> Answer {
    Answer {
        question_id: QuestionId(question_id.to_string()),
        value,
    }
}

/// Two-year-old with one answer per domain; the proportional scorer rates it 37.5.
pub(super) fn submission(family_id: FamilyId) -> ScreeningSubmission {
    ScreeningSubmission {
        family_id,
        child_name: " Ada ".to_string(),
        child_age_months: 24,
        answers: vec![
            answer("com-05", AnswerValue::Yes),
            answer("mot-05", AnswerValue::Sometimes),
            answer("soc-04", AnswerValue::NotYet),
            answer("cog-04", AnswerValue::Yes),
        ],
    }
}

pub(super) struct Harness {
    pub(super) store: Arc<MemoryStore>,
    pub(super) submissions: Arc<SubmissionService<MemoryStore, ProportionalScorer>>,
    pub(super) lifecycle: Arc<ReviewLifecycle<MemoryStore>>,
}

impl Harness {
    pub(super) fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let submissions = Arc::new(SubmissionService::new(
            store.clone(),
            catalog(),
            Arc::new(ProportionalScorer),
            PRICE_CENTS,
        ));
        let lifecycle = Arc::new(ReviewLifecycle::new(store.clone()));
        Self {
            store,
            submissions,
            lifecycle,
        }
    }

    pub(super) fn submitted(&self) -> Screening {
        self.submissions
            .submit(submission(FamilyId::new()))
            .expect("submission succeeds")
    }

    pub(super) fn settled(&self) -> Screening {
        let screening = self.submitted();
        self.lifecycle
            .settle_payment(&screening.id)
            .expect("settlement succeeds")
    }

    pub(super) fn router(&self) -> Router {
        submission_router(self.submissions.clone()).merge(lifecycle_router(self.lifecycle.clone()))
    }
}

/// Scorer that ignores the answers and reports a fixed overall score.
pub(super) struct FixedScorer(pub(super) f64);

impl RiskScorer for FixedScorer {
    fn assess(
        &self,
        _age_months: u16,
        _answers: &DomainAnswers,
    ) -> Result<RiskAssessment, ScoringError> {
        Ok(RiskAssessment {
            domain_scores: DomainScores::default(),
            risk_score: self.0,
        })
    }
}

pub(super) struct UnavailableRepository;

impl ScreeningRepository for UnavailableRepository {
    fn insert_screening(
        &self,
        _screening: Screening,
        _payment: PaymentIntent,
    ) -> Result<Screening, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn fetch_screening(&self, _id: &ScreeningId) -> Result<Option<Screening>, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn fetch_payment(&self, _id: &ScreeningId) -> Result<Option<PaymentIntent>, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn fetch_review(&self, _id: &ScreeningId) -> Result<Option<Review>, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn settle_payment(&self, _id: &ScreeningId) -> Result<Screening, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn transition(
        &self,
        _id: &ScreeningId,
        _expected: ScreeningStatus,
        _next: ScreeningStatus,
    ) -> Result<Screening, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn pending_reviews(&self) -> Result<Vec<Screening>, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn insert_review(&self, _review: Review) -> Result<(Review, Screening), StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
