use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{ClinicalRiskLevel, ScreeningId, ScreeningView, UserId};
use super::lifecycle::ReviewLifecycle;
use super::repository::ScreeningRepository;
use super::submission::{RiskScorer, ScreeningSubmission, SubmissionService};
use crate::error::AppError;
use crate::validation::parse_canonical_uuid;

/// Body of a clinician's review submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    /// Canonical UUID text; checked like every path identifier.
    pub reviewer_id: String,
    #[serde(default)]
    pub clinical_notes: Option<String>,
    #[serde(default)]
    pub clinical_risk_level: Option<ClinicalRiskLevel>,
}

/// Family-facing intake endpoint.
pub fn submission_router<R, S>(service: Arc<SubmissionService<R, S>>) -> Router
where
    R: ScreeningRepository + 'static,
    S: RiskScorer + 'static,
{
    Router::new()
        .route("/api/v1/screenings", post(submit_handler::<R, S>))
        .with_state(service)
}

/// Payment settlement and clinician review endpoints.
pub fn lifecycle_router<R>(lifecycle: Arc<ReviewLifecycle<R>>) -> Router
where
    R: ScreeningRepository + 'static,
{
    Router::new()
        .route("/api/v1/reviews/pending", get(pending_handler::<R>))
        .route(
            "/api/v1/screenings/:screening_id/settle",
            post(settle_handler::<R>),
        )
        .route(
            "/api/v1/screenings/:screening_id/open",
            post(open_handler::<R>),
        )
        .route(
            "/api/v1/screenings/:screening_id/review",
            post(review_handler::<R>),
        )
        .with_state(lifecycle)
}

fn screening_id(raw: &str) -> Result<ScreeningId, AppError> {
    Ok(ScreeningId(parse_canonical_uuid("screening_id", raw)?))
}

pub(crate) async fn submit_handler<R, S>(
    State(service): State<Arc<SubmissionService<R, S>>>,
    Json(submission): Json<ScreeningSubmission>,
) -> Result<Response, AppError>
where
    R: ScreeningRepository + 'static,
    S: RiskScorer + 'static,
{
    let screening = service.submit(submission)?;
    Ok((StatusCode::CREATED, Json(screening.view())).into_response())
}

pub(crate) async fn pending_handler<R>(
    State(lifecycle): State<Arc<ReviewLifecycle<R>>>,
) -> Result<Json<Vec<ScreeningView>>, AppError>
where
    R: ScreeningRepository + 'static,
{
    let pending = lifecycle.list_pending_reviews()?;
    Ok(Json(pending.iter().map(|screening| screening.view()).collect()))
}

pub(crate) async fn settle_handler<R>(
    State(lifecycle): State<Arc<ReviewLifecycle<R>>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ScreeningView>, AppError>
where
    R: ScreeningRepository + 'static,
{
    let id = screening_id(&raw_id)?;
    Ok(Json(lifecycle.settle_payment(&id)?.view()))
}

pub(crate) async fn open_handler<R>(
    State(lifecycle): State<Arc<ReviewLifecycle<R>>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ScreeningView>, AppError>
where
    R: ScreeningRepository + 'static,
{
    let id = screening_id(&raw_id)?;
    Ok(Json(lifecycle.open_review(&id)?.view()))
}

pub(crate) async fn review_handler<R>(
    State(lifecycle): State<Arc<ReviewLifecycle<R>>>,
    Path(raw_id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<Response, AppError>
where
    R: ScreeningRepository + 'static,
{
    let id = screening_id(&raw_id)?;
    let reviewer = UserId(parse_canonical_uuid("reviewer_id", &request.reviewer_id)?);
    let review = lifecycle.create_review(
        id,
        request.clinical_notes,
        request.clinical_risk_level,
        reviewer,
    )?;
    Ok((StatusCode::CREATED, Json(review)).into_response())
}
