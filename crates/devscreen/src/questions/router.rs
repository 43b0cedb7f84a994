use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::catalog::QuestionCatalog;
use super::domain::{Question, QuestionDomain};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AgeQuery {
    pub age_months: u16,
}

/// Age-appropriate questions partitioned into all four domains.
#[derive(Debug, Serialize)]
pub struct QuestionSet {
    pub age_months: u16,
    pub revision: Option<String>,
    pub domains: BTreeMap<QuestionDomain, Vec<Question>>,
}

#[derive(Debug, Serialize)]
pub struct ReloadSummary {
    pub questions: usize,
    pub revision: Option<String>,
}

pub fn question_router(catalog: Arc<QuestionCatalog>) -> Router {
    Router::new()
        .route("/api/v1/questions", get(questions_handler))
        .route("/api/v1/questions/reload", post(reload_handler))
        .with_state(catalog)
}

pub(crate) async fn questions_handler(
    State(catalog): State<Arc<QuestionCatalog>>,
    Query(query): Query<AgeQuery>,
) -> Result<Json<QuestionSet>, AppError> {
    let bank = catalog.bank()?;
    let domains = bank
        .questions_by_domain(query.age_months)
        .into_iter()
        .map(|(domain, questions)| (domain, questions.into_iter().cloned().collect()))
        .collect();

    Ok(Json(QuestionSet {
        age_months: query.age_months,
        revision: bank.revision().map(str::to_string),
        domains,
    }))
}

/// Drop the cached bank and load it again from its source.
pub(crate) async fn reload_handler(
    State(catalog): State<Arc<QuestionCatalog>>,
) -> Result<Json<ReloadSummary>, AppError> {
    catalog.invalidate();
    let bank = catalog.bank()?;
    info!(questions = bank.len(), "question bank reloaded");

    Ok(Json(ReloadSummary {
        questions: bank.len(),
        revision: bank.revision().map(str::to_string),
    }))
}
