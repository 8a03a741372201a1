use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::time::Instant;

use vigil_engine::wire::{AlertResponse, ErrorType, RuleResponse};
use vigil_engine::RawParams;

use super::caller::caller_from_headers;
use super::AppState;

/// HTTP status for an envelope: 200 on success, 400 for bad data, 500 when
/// a collaborator failed.
pub fn status_code(error_type: Option<ErrorType>) -> StatusCode {
    match error_type {
        None => StatusCode::OK,
        Some(ErrorType::BadData) => StatusCode::BAD_REQUEST,
        Some(ErrorType::Server) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn rule_statuses(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> (StatusCode, Json<RuleResponse>) {
    let start = Instant::now();
    state.metrics.inc_rule_requests();

    let resp = match caller_from_headers(&headers, state.default_org_id) {
        Ok(caller) => {
            state
                .service
                .rule_statuses(&caller, &RawParams::from(pairs))
                .await
        }
        Err(e) => RuleResponse::failure(ErrorType::BadData, e.to_string()),
    };

    if let Some(kind) = resp.error_type {
        state.metrics.inc_errors(kind);
        if kind == ErrorType::Server {
            tracing::warn!(error = %resp.error, "rule status request failed");
        }
    }
    state.metrics.record_rule_latency(start);
    (status_code(resp.error_type), Json(resp))
}

pub async fn alert_statuses(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> (StatusCode, Json<AlertResponse>) {
    state.metrics.inc_alert_requests();
    let resp = match caller_from_headers(&headers, state.default_org_id) {
        Ok(caller) => {
            state
                .service
                .alert_statuses(caller.org_id, &RawParams::from(pairs))
                .await
        }
        Err(e) => AlertResponse::failure(ErrorType::BadData, e.to_string()),
    };

    if let Some(kind) = resp.error_type {
        state.metrics.inc_errors(kind);
    }
    (status_code(resp.error_type), Json(resp))
}
