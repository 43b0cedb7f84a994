use crate::infra::{dataset_source, Services, SCREENING_PRICE_CENTS};
use clap::Args;
use devscreen::config::AppConfig;
use devscreen::error::AppError;
use devscreen::notifications::{Delivery, RefreshReason, Step, SubscriberScope};
use devscreen::questions::{DatasetSource, QuestionCatalog};
use devscreen::screening::{
    Answer, AnswerValue, ClinicalRiskLevel, FamilyId, ScreeningSubmission, UserId,
};
use devscreen::wallet::Asset;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Child's first name recorded on the screening
    #[arg(long, default_value = "Avery")]
    pub(crate) child_name: String,
    /// Child's age in months; selects the age-appropriate questions
    #[arg(long, default_value_t = 24)]
    pub(crate) age_months: u16,
    /// Reuse a family id instead of generating one
    #[arg(long)]
    pub(crate) family_id: Option<Uuid>,
    /// Load the question bank from a JSON file instead of the bundled dataset
    #[arg(long)]
    pub(crate) question_bank: Option<PathBuf>,
    /// Notes the demo clinician attaches to the review
    #[arg(long)]
    pub(crate) clinical_notes: Option<String>,
}

/// Deterministic spread of answers so the demo exercises every answer value.
fn demo_answer(index: usize) -> AnswerValue {
    match index % 3 {
        0 => AnswerValue::Yes,
        1 => AnswerValue::Sometimes,
        _ => AnswerValue::NotYet,
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        child_name,
        age_months,
        family_id,
        question_bank,
        clinical_notes,
    } = args;

    let config = AppConfig::load()?;
    let source = question_bank.map_or_else(
        || dataset_source(&config.questions),
        DatasetSource::Path,
    );
    let services = Services::in_memory(Arc::new(QuestionCatalog::new(source)), config.notifier);

    let scope = SubscriberScope {
        family_id: family_id.map_or_else(FamilyId::new, FamilyId),
        user_id: UserId::new(),
    };
    let refreshes = Arc::new(AtomicUsize::new(0));
    let refresh_counter = refreshes.clone();
    let mut notifier = services.review_notifier(scope, move |_reason: RefreshReason| {
        refresh_counter.fetch_add(1, Ordering::Relaxed);
    });

    println!("Developmental screening demo");
    println!("  family: {}", scope.family_id);

    let questions = services.catalog.questions_by_domain(age_months)?;
    let mut answers = Vec::new();
    println!("\nQuestions for {age_months} months");
    for (domain, domain_questions) in &questions {
        println!("  {:<20} {} question(s)", domain.label(), domain_questions.len());
        for question in domain_questions {
            answers.push(Answer {
                question_id: question.id.clone(),
                value: demo_answer(answers.len()),
            });
        }
    }

    let wallet = services
        .wallets
        .top_up(scope.user_id, Asset::Usd, SCREENING_PRICE_CENTS)?;
    println!(
        "\nWallet topped up: {} cents available",
        wallet.balance(Asset::Usd)
    );

    let screening = services.submissions.submit(ScreeningSubmission {
        family_id: scope.family_id,
        child_name,
        child_age_months: age_months,
        answers,
    })?;
    let view = screening.view();
    println!("\nSubmitted screening {}", view.screening_id);
    println!("  status:     {}", view.status_label);
    if let (Some(score), Some(level)) = (view.risk_score, view.risk_level) {
        println!("  risk score: {score:.1} ({})", level.label());
    }

    let settled = services.lifecycle.settle_payment(&screening.id)?;
    let pending = services.lifecycle.list_pending_reviews()?;
    println!("\nPayment settled; status now {}", settled.status.label());
    println!("  screenings awaiting review: {}", pending.len());

    let opened = services.lifecycle.open_review(&screening.id)?;
    let review = services.lifecycle.create_review(
        screening.id,
        clinical_notes,
        Some(ClinicalRiskLevel::Moderate),
        UserId::new(),
    )?;
    println!("\nClinician opened the case ({})", opened.status.label());
    println!("  review {} recorded", review.review_id);

    let delivery = loop {
        match tokio::time::timeout(Duration::from_secs(2), notifier.step()).await {
            Ok(Some(Step::Review(delivery))) => break Some(delivery),
            Ok(Some(Step::Refreshed)) => continue,
            Ok(None) | Err(_) => break None,
        }
    };
    notifier.close();

    match delivery {
        Some(Delivery::Notified(id)) => println!("\nFamily notified ({id})"),
        Some(other) => println!("\nReview event handled without notification: {other:?}"),
        None => println!("\nNo review event reached the family notifier"),
    }

    let inbox = services.inbox.recent(&scope.user_id.to_string())?;
    println!("\nInbox ({} message(s))", inbox.len());
    for notification in inbox {
        println!("  [{}] {}", notification.title, notification.message);
    }
    println!(
        "\nDashboard refreshes triggered: {}",
        refreshes.load(Ordering::Relaxed)
    );

    Ok(())
}
