use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use devscreen::notifications::notification_router;
use devscreen::questions::question_router;
use devscreen::screening::{lifecycle_router, submission_router};
use serde_json::json;

pub(crate) fn with_service_routes(services: &Services) -> axum::Router {
    question_router(services.catalog.clone())
        .merge(submission_router(services.submissions.clone()))
        .merge(lifecycle_router(services.lifecycle.clone()))
        .merge(notification_router(services.inbox.clone()))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use devscreen::config::NotifierConfig;
    use devscreen::questions::{DatasetSource, QuestionCatalog};
    use devscreen::screening::{FamilyId, UserId};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (axum::Router, Arc<AtomicBool>) {
        let services = Services::in_memory(
            Arc::new(QuestionCatalog::new(DatasetSource::Bundled)),
            NotifierConfig::default(),
        );
        let readiness = Arc::new(AtomicBool::new(false));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        (
            with_service_routes(&services).layer(Extension(state)),
            readiness,
        )
    }

    async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("route executes");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let payload = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, payload)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_and_readiness_report_state() {
        let (router, readiness) = app();

        let (status, body) = send(&router, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(&router, Request::get("/ready").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        readiness.store(true, Ordering::Release);
        let (status, _) = send(&router, Request::get("/ready").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn notification_routes_validate_identifiers() {
        let (router, _) = app();

        let (status, body) = send(
            &router,
            Request::get("/api/v1/notifications/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("user_id"));

        let (status, body) = send(
            &router,
            Request::get(format!("/api/v1/notifications/{}", UserId::new()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = send(
            &router,
            Request::post(format!("/api/v1/notifications/{}/read", UserId::new()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn screening_flows_through_the_merged_router() {
        let (router, _) = app();

        let submission = json!({
            "family_id": FamilyId::new(),
            "child_name": "Jun",
            "child_age_months": 18,
            "answers": [
                {"question_id": "com-05", "value": "yes"},
                {"question_id": "mot-03", "value": "not_yet"},
            ],
        });
        let (status, created) = send(&router, post_json("/api/v1/screenings", submission)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["screening_id"].as_str().expect("screening id").to_string();

        let (status, _) = send(
            &router,
            Request::post(format!("/api/v1/screenings/{id}/settle"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, pending) = send(
            &router,
            Request::get("/api/v1/reviews/pending").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(pending.as_array().map(Vec::len), Some(1));

        let (status, _) = send(
            &router,
            post_json(
                &format!("/api/v1/screenings/{id}/review"),
                json!({"reviewer_id": UserId::new(), "clinical_risk_level": "MODERATE"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, pending) = send(
            &router,
            Request::get("/api/v1/reviews/pending").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(pending, json!([]));
    }

    #[tokio::test]
    async fn question_reload_reports_bank_size() {
        let (router, _) = app();

        let (status, body) = send(
            &router,
            Request::post("/api/v1/questions/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"], 28);
        assert_eq!(body["revision"], "2025.1");
    }
}
