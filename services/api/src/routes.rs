use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use loan_bre::error::AppError;
use loan_bre::workflows::eligibility::{
    eligibility_router, AccessPolicy, ConfigurationStore, EligibilityApi, EligibilityStore,
    LeadId, LeadRepository, LenderAssignmentHistory, RecommendationError, RecommendationService,
    RepositoryError,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_eligibility_routes<L, C, S, P>(api: Arc<EligibilityApi<L, C, S, P>>) -> Router
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    let history = Router::new()
        .route(
            "/api/v1/leads/:lead_id/assignments",
            get(assignment_history_endpoint::<L, C, S>),
        )
        .with_state(api.service.clone());

    eligibility_router(api)
        .merge(history)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
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

/// Assignment audit trail for a known lead, oldest entry first.
pub(crate) async fn assignment_history_endpoint<L, C, S>(
    State(service): State<Arc<RecommendationService<L, C, S>>>,
    Path(lead_id): Path<String>,
) -> Result<Json<Vec<LenderAssignmentHistory>>, AppError>
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
{
    let lead_id = LeadId(lead_id);
    service
        .leads()
        .fetch(&lead_id)
        .map_err(RecommendationError::from)?
        .ok_or(RecommendationError::Repository(RepositoryError::NotFound))?;

    Ok(Json(service.assignment_history(&lead_id)?))
}
