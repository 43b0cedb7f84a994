use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{FamilyId, PaymentIntent, Screening, ScreeningId, ScreeningStatus};
use super::repository::ScreeningRepository;
use crate::questions::{
    DomainScores, Question, QuestionBankError, QuestionCatalog, QuestionDomain, QuestionId,
};
use crate::storage::StorageError;

/// A caregiver's response to a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    Yes,
    Sometimes,
    NotYet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub value: AnswerValue,
}

/// Intake payload submitted by a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningSubmission {
    pub family_id: FamilyId,
    pub child_name: String,
    pub child_age_months: u16,
    pub answers: Vec<Answer>,
}

/// Answers grouped under the four domains, in each domain's question order.
pub type DomainAnswers = BTreeMap<QuestionDomain, Vec<(Question, AnswerValue)>>;

/// Output of the scoring collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub domain_scores: DomainScores,
    pub risk_score: f64,
}

/// External scoring function. The formula is opaque to this crate; only the
/// resulting numbers are classified.
pub trait RiskScorer: Send + Sync {
    fn assess(
        &self,
        age_months: u16,
        answers: &DomainAnswers,
    ) -> Result<RiskAssessment, ScoringError>;
}

#[derive(Debug, thiserror::Error)]
#[error("risk scoring failed: {0}")]
pub struct ScoringError(pub String);

/// Demonstration scorer: percentage of concern points per domain, averaged over the
/// domains that received answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalScorer;

impl ProportionalScorer {
    const fn concern_points(value: AnswerValue) -> u32 {
        match value {
            AnswerValue::Yes => 0,
            AnswerValue::Sometimes => 5,
            AnswerValue::NotYet => 10,
        }
    }
}

impl RiskScorer for ProportionalScorer {
    fn assess(
        &self,
        _age_months: u16,
        answers: &DomainAnswers,
    ) -> Result<RiskAssessment, ScoringError> {
        let mut domain_scores = DomainScores::default();
        let mut answered_domains = 0u32;
        let mut total = 0.0;

        for (domain, responses) in answers {
            if responses.is_empty() {
                continue;
            }
            let points: u32 = responses
                .iter()
                .map(|(_, value)| Self::concern_points(*value))
                .sum();
            let ceiling = responses.len() as f64 * 10.0;
            let score = f64::from(points) / ceiling * 100.0;
            domain_scores.set(*domain, score);
            answered_domains += 1;
            total += score;
        }

        if answered_domains == 0 {
            return Err(ScoringError("no answered domains".to_string()));
        }

        Ok(RiskAssessment {
            domain_scores,
            risk_score: total / f64::from(answered_domains),
        })
    }
}

/// Intake service: validates answers against the age-gated bank, scores them, and
/// persists the screening awaiting payment.
pub struct SubmissionService<R, S> {
    repository: Arc<R>,
    catalog: Arc<QuestionCatalog>,
    scorer: Arc<S>,
    price_cents: u64,
}

impl<R, S> SubmissionService<R, S>
where
    R: ScreeningRepository + 'static,
    S: RiskScorer + 'static,
{
    pub fn new(
        repository: Arc<R>,
        catalog: Arc<QuestionCatalog>,
        scorer: Arc<S>,
        price_cents: u64,
    ) -> Self {
        Self {
            repository,
            catalog,
            scorer,
            price_cents,
        }
    }

    /// Group answers by domain, rejecting unknown, duplicate, or age-inappropriate
    /// questions.
    pub fn group_answers(
        &self,
        age_months: u16,
        answers: &[Answer],
    ) -> Result<DomainAnswers, SubmissionError> {
        if answers.is_empty() {
            return Err(SubmissionError::NoAnswers);
        }

        let bank = self.catalog.bank()?;
        let mut seen = HashSet::with_capacity(answers.len());
        let mut grouped: DomainAnswers = QuestionDomain::ordered()
            .into_iter()
            .map(|domain| (domain, Vec::new()))
            .collect();

        for answer in answers {
            if !seen.insert(answer.question_id.clone()) {
                return Err(SubmissionError::DuplicateAnswer(answer.question_id.clone()));
            }
            let question = bank
                .question_by_id(&answer.question_id.0)
                .ok_or_else(|| SubmissionError::UnknownQuestion(answer.question_id.clone()))?;
            if !question.age_range_months.contains(age_months) {
                return Err(SubmissionError::QuestionOutOfRange {
                    question_id: answer.question_id.clone(),
                    age_months,
                });
            }
            grouped
                .entry(question.domain)
                .or_default()
                .push((question.clone(), answer.value));
        }

        for responses in grouped.values_mut() {
            responses.sort_by_key(|(question, _)| question.order);
        }

        Ok(grouped)
    }

    pub fn submit(&self, submission: ScreeningSubmission) -> Result<Screening, SubmissionError> {
        let child_name = submission.child_name.trim().to_string();
        if child_name.is_empty() {
            return Err(SubmissionError::MissingChildName);
        }

        let grouped = self.group_answers(submission.child_age_months, &submission.answers)?;
        let assessment = self.scorer.assess(submission.child_age_months, &grouped)?;

        let screening = Screening {
            id: ScreeningId::new(),
            family_id: submission.family_id,
            child_name,
            child_age_months: submission.child_age_months,
            domain_scores: assessment.domain_scores,
            risk_score: Some(assessment.risk_score),
            status: ScreeningStatus::PendingPayment,
            created_at: Utc::now(),
        };
        let payment = PaymentIntent::pending(screening.id, self.price_cents);

        let stored = self.repository.insert_screening(screening, payment)?;
        info!(
            screening_id = %stored.id,
            answers = submission.answers.len(),
            risk_level = ?stored.risk_level(),
            "screening submitted"
        );
        Ok(stored)
    }
}

/// Error raised while accepting a submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("child name is required")]
    MissingChildName,
    #[error("at least one answer is required")]
    NoAnswers,
    #[error("question {0} answered more than once")]
    DuplicateAnswer(QuestionId),
    #[error("question {0} is not in the question bank")]
    UnknownQuestion(QuestionId),
    #[error("question {question_id} does not apply at {age_months} months")]
    QuestionOutOfRange {
        question_id: QuestionId,
        age_months: u16,
    },
    #[error(transparent)]
    QuestionBank(#[from] QuestionBankError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
