use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use vigil_engine::RuleStatusService;

use super::{health, metrics, rules};
use crate::metrics::server_metrics::ServerMetrics;
use crate::store::Stores;

pub const RULES_PATH: &str = "/api/prometheus/grafana/api/v1/rules";
pub const ALERTS_PATH: &str = "/api/prometheus/grafana/api/v1/alerts";

#[derive(Clone)]
pub struct AppState {
    pub service: RuleStatusService,
    pub stores: Stores,
    pub metrics: Arc<ServerMetrics>,
    /// Org used when a request names none.
    pub default_org_id: i64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/ready", get(health::ready))
        .route("/metrics", get(metrics::metrics))
        .route(RULES_PATH, get(rules::rule_statuses))
        .route(ALERTS_PATH, get(rules::alert_statuses))
        .with_state(state)
}
