use super::common::*;
use crate::questions::{QuestionDomain, QuestionId, RiskLevel};
use crate::screening::{
    AnswerValue, FamilyId, PaymentStatus, ProportionalScorer, ScreeningRepository,
    ScreeningStatus, SubmissionError, SubmissionService,
};
use crate::storage::{Entity, EventKind, MemoryStore, StorageError};
use std::sync::Arc;

#[test]
fn submit_persists_pending_payment_screening() {
    let harness = Harness::new();
    let family_id = FamilyId::new();

    let screening = harness
        .submissions
        .submit(submission(family_id))
        .expect("submission succeeds");

    assert_eq!(screening.family_id, family_id);
    assert_eq!(screening.child_name, "Ada");
    assert_eq!(screening.status, ScreeningStatus::PendingPayment);
    assert_eq!(screening.risk_score, Some(37.5));
    assert_eq!(screening.risk_level(), Some(RiskLevel::Low));
    assert_eq!(screening.domain_scores.motor, 50.0);
    assert_eq!(screening.domain_scores.social_emotional, 100.0);

    let payment = harness
        .store
        .fetch_payment(&screening.id)
        .expect("fetch")
        .expect("payment created");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount_cents, PRICE_CENTS);

    assert!(harness
        .lifecycle
        .list_pending_reviews()
        .expect("pending")
        .is_empty());
}

#[test]
fn submit_publishes_an_insert_event() {
    let harness = Harness::new();
    let mut events = harness.store.feed().receiver();

    let screening = harness.submitted();

    let event = events.try_recv().expect("insert event published");
    assert_eq!(event.kind, EventKind::Insert);
    assert_eq!(event.entity, Entity::Screening);
    assert_eq!(
        event.payload["id"],
        serde_json::json!(screening.id.to_string())
    );
}

#[test]
fn score_at_threshold_classifies_high() {
    let store = Arc::new(MemoryStore::new());
    let service = SubmissionService::new(store, catalog(), Arc::new(FixedScorer(50.0)), 0);

    let screening = service
        .submit(submission(FamilyId::new()))
        .expect("submission succeeds");
    assert_eq!(screening.risk_level(), Some(RiskLevel::High));
}

#[test]
fn group_answers_keeps_every_domain_in_question_order() {
    let harness = Harness::new();
    let answers = vec![
        answer("com-06", AnswerValue::Yes),
        answer("com-04", AnswerValue::NotYet),
        answer("mot-05", AnswerValue::Yes),
    ];

    let grouped = harness
        .submissions
        .group_answers(24, &answers)
        .expect("answers group");

    assert_eq!(grouped.len(), 4);
    assert!(grouped[&QuestionDomain::SocialEmotional].is_empty());
    assert!(grouped[&QuestionDomain::Cognitive].is_empty());
    let communication: Vec<&str> = grouped[&QuestionDomain::Communication]
        .iter()
        .map(|(question, _)| question.id.0.as_str())
        .collect();
    assert_eq!(communication, vec!["com-04", "com-06"]);
}

#[test]
fn submit_rejects_invalid_answers() {
    let harness = Harness::new();

    let mut unknown = submission(FamilyId::new());
    unknown.answers.push(answer("zzz-99", AnswerValue::Yes));
    assert!(matches!(
        harness.submissions.submit(unknown),
        Err(SubmissionError::UnknownQuestion(QuestionId(id))) if id == "zzz-99"
    ));

    let mut too_young = submission(FamilyId::new());
    too_young.answers.push(answer("com-01", AnswerValue::Yes));
    assert!(matches!(
        harness.submissions.submit(too_young),
        Err(SubmissionError::QuestionOutOfRange { age_months: 24, .. })
    ));

    let mut duplicated = submission(FamilyId::new());
    duplicated.answers.push(answer("com-05", AnswerValue::NotYet));
    assert!(matches!(
        harness.submissions.submit(duplicated),
        Err(SubmissionError::DuplicateAnswer(_))
    ));

    let mut empty = submission(FamilyId::new());
    empty.answers.clear();
    assert!(matches!(
        harness.submissions.submit(empty),
        Err(SubmissionError::NoAnswers)
    ));

    let mut unnamed = submission(FamilyId::new());
    unnamed.child_name = "   ".to_string();
    assert!(matches!(
        harness.submissions.submit(unnamed),
        Err(SubmissionError::MissingChildName)
    ));
}

#[test]
fn submit_propagates_storage_errors() {
    let service = SubmissionService::new(
        Arc::new(UnavailableRepository),
        catalog(),
        Arc::new(ProportionalScorer),
        PRICE_CENTS,
    );

    assert!(matches!(
        service.submit(submission(FamilyId::new())),
        Err(SubmissionError::Storage(StorageError::Unavailable(_)))
    ));
}
