use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::batch::{AccessPolicy, BatchError, BatchRecompute, BatchRequest};
use super::configuration::{LenderConfig, ScoreWeights};
use super::domain::{Caller, CallerRole, LeadId, LenderId};
use super::repository::{ConfigurationStore, EligibilityStore, LeadRepository, RepositoryError};
use super::service::{RecommendationError, RecommendationService};
use super::trigger::{RecomputeQueue, TriggerDecision};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Everything the eligibility endpoints need, shared as router state.
pub struct EligibilityApi<L, C, S, P> {
    pub service: Arc<RecommendationService<L, C, S>>,
    pub queue: RecomputeQueue,
    pub batch: BatchRecompute<L, C, S, P>,
}

type ApiState<L, C, S, P> = State<Arc<EligibilityApi<L, C, S, P>>>;

#[derive(Debug, Deserialize)]
pub struct FieldChange {
    pub field: String,
    #[serde(default)]
    pub old_value: Value,
    #[serde(default)]
    pub new_value: Value,
}

#[derive(Debug, Deserialize)]
pub struct LenderReassignment {
    pub lender_id: LenderId,
    pub change_reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub score: u8,
    pub lender_name: String,
    #[serde(default)]
    pub top_lender_name: Option<String>,
    #[serde(default)]
    pub gap_reason: Option<String>,
}

/// Router builder exposing recommendation, configuration, and insight endpoints.
pub fn eligibility_router<L, C, S, P>(api: Arc<EligibilityApi<L, C, S, P>>) -> Router
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    Router::new()
        .route(
            "/api/v1/leads/:lead_id/recommendation",
            post(recommendation_handler::<L, C, S, P>),
        )
        .route(
            "/api/v1/leads/:lead_id/eligibility",
            get(eligibility_handler::<L, C, S, P>),
        )
        .route(
            "/api/v1/leads/:lead_id/field-changes",
            post(field_change_handler::<L, C, S, P>),
        )
        .route(
            "/api/v1/leads/:lead_id/lender",
            put(reassign_handler::<L, C, S, P>),
        )
        .route(
            "/api/v1/recommendations/batch",
            post(batch_handler::<L, C, S, P>),
        )
        .route(
            "/api/v1/insights/explain",
            post(explain_handler::<L, C, S, P>),
        )
        .route(
            "/api/v1/config/score-weights",
            put(score_weights_handler::<L, C, S, P>),
        )
        .route(
            "/api/v1/lenders/:lender_id/config",
            put(lender_config_handler::<L, C, S, P>),
        )
        .with_state(api)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, axum::Json(payload)).into_response()
}

/// Maps service failures; configuration faults are the caller's fault only on save paths.
fn service_error_response(error: RecommendationError, saving: bool) -> Response {
    let status = match &error {
        RecommendationError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        RecommendationError::Configuration(_) if saving => StatusCode::UNPROCESSABLE_ENTITY,
        RecommendationError::NoActiveLenders => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

pub(crate) fn caller_from_headers(headers: &HeaderMap) -> Option<Caller> {
    let user_id = headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .to_string();
    if user_id.is_empty() {
        return None;
    }
    let role = CallerRole::parse(headers.get(USER_ROLE_HEADER)?.to_str().ok()?)?;
    Some(Caller { user_id, role })
}

/// Resolves the caller and checks the access policy.
fn admin_caller<P: AccessPolicy>(headers: &HeaderMap, access: &P) -> Result<Caller, Response> {
    let caller = caller_from_headers(headers).ok_or_else(|| {
        error_response(
            StatusCode::UNAUTHORIZED,
            "missing or invalid caller identity headers",
        )
    })?;
    access
        .authorize(&caller)
        .map_err(|err| error_response(StatusCode::FORBIDDEN, err.to_string()))?;
    Ok(caller)
}

pub(crate) async fn recommendation_handler<L, C, S, P>(
    State(api): ApiState<L, C, S, P>,
    Path(lead_id): Path<String>,
) -> Response
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    match api.service.compute_recommendation(&LeadId(lead_id)) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => service_error_response(error, false),
    }
}

pub(crate) async fn eligibility_handler<L, C, S, P>(
    State(api): ApiState<L, C, S, P>,
    Path(lead_id): Path<String>,
) -> Response
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    let id = LeadId(lead_id);
    match api.service.eligibility(&id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(RecommendationError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "lead_id": id.0,
                "error": "eligibility not computed yet",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error, false),
    }
}

pub(crate) async fn field_change_handler<L, C, S, P>(
    State(api): ApiState<L, C, S, P>,
    Path(lead_id): Path<String>,
    axum::Json(change): axum::Json<FieldChange>,
) -> Response
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    let id = LeadId(lead_id);
    let decision = api.queue.trigger_recompute_on_change(
        &id,
        &change.field,
        &change.old_value,
        &change.new_value,
    );
    let status = match decision {
        TriggerDecision::Scheduled => StatusCode::ACCEPTED,
        TriggerDecision::UnwatchedField | TriggerDecision::InsignificantChange => StatusCode::OK,
    };
    let payload = json!({
        "lead_id": id.0,
        "field": change.field,
        "decision": decision,
        "state": api.queue.state(&id),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn reassign_handler<L, C, S, P>(
    State(api): ApiState<L, C, S, P>,
    Path(lead_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<LenderReassignment>,
) -> Response
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    let caller = match admin_caller(&headers, api.batch.access().as_ref()) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match api.service.reassign_lender(
        &LeadId(lead_id),
        &request.lender_id,
        &caller.user_id,
        &request.change_reason,
        request.notes,
    ) {
        Ok(entry) => {
            let payload = json!({
                "changed": entry.is_some(),
                "history_entry": entry,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error, true),
    }
}

pub(crate) async fn batch_handler<L, C, S, P>(
    State(api): ApiState<L, C, S, P>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<BatchRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    let Some(caller) = caller_from_headers(&headers) else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "missing or invalid caller identity headers",
        );
    };

    match api.batch.run(&caller, request).await {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(BatchError::Forbidden(error)) => {
            error_response(StatusCode::FORBIDDEN, error.to_string())
        }
        Err(BatchError::Repository(error)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

pub(crate) async fn explain_handler<L, C, S, P>(
    State(api): ApiState<L, C, S, P>,
    axum::Json(request): axum::Json<ExplainRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    if request.score > 100 {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("score {} is outside 0-100", request.score),
        );
    }
    let insight = api.service.explain_score(
        request.score,
        &request.lender_name,
        request.top_lender_name.as_deref(),
        request.gap_reason.as_deref(),
    );
    (StatusCode::OK, axum::Json(insight)).into_response()
}

pub(crate) async fn score_weights_handler<L, C, S, P>(
    State(api): ApiState<L, C, S, P>,
    headers: HeaderMap,
    axum::Json(weights): axum::Json<ScoreWeights>,
) -> Response
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    if let Err(response) = admin_caller(&headers, api.batch.access().as_ref()) {
        return response;
    }

    match api.service.save_score_weights(weights) {
        Ok(saved) => (StatusCode::OK, axum::Json(saved)).into_response(),
        Err(error) => service_error_response(error, true),
    }
}

pub(crate) async fn lender_config_handler<L, C, S, P>(
    State(api): ApiState<L, C, S, P>,
    Path(lender_id): Path<String>,
    headers: HeaderMap,
    axum::Json(config): axum::Json<LenderConfig>,
) -> Response
where
    L: LeadRepository + 'static,
    C: ConfigurationStore + 'static,
    S: EligibilityStore + 'static,
    P: AccessPolicy + 'static,
{
    if let Err(response) = admin_caller(&headers, api.batch.access().as_ref()) {
        return response;
    }

    let id = LenderId(lender_id);
    match api.service.save_lender_config(&id, config) {
        Ok(revision) => {
            let payload = json!({
                "lender_id": id.0,
                "config_revision": revision,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error, true),
    }
}
