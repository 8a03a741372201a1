use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use vigil_server::config::PaginationMode;
use vigil_server::metrics::server_metrics::ServerMetrics;
use vigil_server::rest::{router, AppState, ALERTS_PATH, ORG_ID_HEADER, RULES_PATH, USER_HEADER};
use vigil_server::store::{Fixtures, Stores};

const FIXTURES: &str = r#"
folders:
  - uid: infra
    title: Infra
    denied: [intern]
  - uid: payments
    title: Payments
rules:
  - org_id: 1
    uid: r1
    namespace_uid: infra
    rule_group: cpu
    rule_group_index: 1
    title: High CPU
    labels:
      team: infra
      __alert_rule_uid__: r1
    data:
      - refId: A
        datasourceUid: prom
        model:
          expr: avg(cpu) > 0.9
  - org_id: 1
    uid: r2
    namespace_uid: infra
    rule_group: cpu
    rule_group_index: 2
    title: CPU steal
  - org_id: 1
    uid: r3
    namespace_uid: infra
    rule_group: disk
    title: Disk full
  - org_id: 1
    uid: r4
    namespace_uid: payments
    rule_group: latency
    title: Slow checkout
statuses:
  - rule_uid: r3
    health: error
    last_error: datasource down
instances:
  - org_id: 1
    rule_uid: r1
    state: Alerting
    starts_at: 2024-05-01T10:00:00Z
    labels:
      host: db-1
      __alert_rule_uid__: r1
    last_evaluation_values:
      A: 0.95
  - org_id: 1
    rule_uid: r1
    state: Normal
    starts_at: 2024-05-01T09:00:00Z
    labels:
      host: db-2
  - org_id: 1
    rule_uid: r4
    state: Pending
    starts_at: 2024-05-01T11:00:00Z
provenances:
  - rule_uid: r4
    provenance: api
"#;

// Folder uids sort opposite to their display paths.
const CROSSED_FOLDERS: &str = r#"
folders:
  - uid: aaa
    title: Zeta
  - uid: zzz
    title: Alpha
rules:
  - org_id: 1
    uid: z1
    namespace_uid: aaa
    rule_group: g
    title: Zeta rule
  - org_id: 1
    uid: a1
    namespace_uid: zzz
    rule_group: g
    title: Alpha rule
"#;

fn app_state(mode: PaginationMode) -> AppState {
    app_state_from(FIXTURES, mode)
}

fn app_state_from(fixtures: &str, mode: PaginationMode) -> AppState {
    let stores = Stores::new();
    Fixtures::load_from_str(fixtures).unwrap().apply(&stores);
    AppState {
        service: stores.service(mode),
        stores,
        metrics: ServerMetrics::new(),
        default_org_id: 1,
    }
}

fn app() -> axum::Router {
    router(app_state(PaginationMode::Cursor))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    get_as(app, uri, &[]).await
}

async fn get_as(app: axum::Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
    let mut req = Request::builder().uri(uri);
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn group_names(body: &Value) -> Vec<String> {
    body["data"]["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| format!("{}/{}", g["file"].as_str().unwrap(), g["name"].as_str().unwrap()))
        .collect()
}

#[tokio::test]
async fn healthz_returns_ok() {
    let (status, body) = get(app(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn ready_reports_store_sizes() {
    let (status, body) = get(app(), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rules"], 4);
    assert_eq!(body["folders"], 2);
}

#[tokio::test]
async fn rules_unpaginated_with_totals() {
    let (status, body) = get(app(), RULES_PATH).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(body.get("errorType").is_none());
    assert!(body["data"].get("groupNextToken").is_none());

    assert_eq!(
        group_names(&body),
        vec!["Infra/cpu", "Infra/disk", "Payments/latency"]
    );

    let totals = &body["data"]["totals"];
    assert_eq!(totals["firing"], 1);
    assert_eq!(totals["inactive"], 2);
    assert_eq!(totals["pending"], 1);
    assert_eq!(totals["error"], 1);

    let cpu = &body["data"]["groups"][0];
    assert_eq!(cpu["folderUid"], "infra");
    assert_eq!(cpu["interval"], 60.0);
    let r1 = &cpu["rules"][0];
    assert_eq!(r1["uid"], "r1");
    assert_eq!(r1["state"], "firing");
    assert_eq!(r1["health"], "ok");
    assert_eq!(r1["type"], "alerting");
    assert_eq!(r1["query"], "avg(cpu) > 0.9");
    assert_eq!(r1["queriedDatasourceUIDs"][0], "prom");
    assert_eq!(r1["activeAt"], "2024-05-01T10:00:00Z");
    assert!(r1["labels"].get("__alert_rule_uid__").is_none());
    assert_eq!(r1["alerts"][0]["state"], "Alerting");
    assert_eq!(r1["alerts"][0]["value"], "9.5e-01");
    assert_eq!(r1["alerts"][1]["value"], "");

    let disk = &body["data"]["groups"][1]["rules"][0];
    assert_eq!(disk["health"], "error");
    assert_eq!(disk["lastError"], "datasource down");

    let latency = &body["data"]["groups"][2]["rules"][0];
    assert_eq!(latency["state"], "pending");
    assert_eq!(latency["provenance"], "api");
}

#[tokio::test]
async fn repeated_state_params_filter_rules_not_totals() {
    let (status, body) = get(app(), &format!("{RULES_PATH}?state=firing&state=pending")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(group_names(&body), vec!["Infra/cpu", "Payments/latency"]);
    assert_eq!(body["data"]["groups"][0]["rules"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["totals"]["inactive"], 2);
    assert_eq!(body["data"]["groups"][0]["totals"]["inactive"], 1);
}

#[tokio::test]
async fn health_filter() {
    let (_, body) = get(app(), &format!("{RULES_PATH}?health=error")).await;
    assert_eq!(group_names(&body), vec!["Infra/disk"]);
}

#[tokio::test]
async fn include_internal_labels() {
    let (_, body) = get(app(), &format!("{RULES_PATH}?includeInternalLabels=true&rule_name=High%20CPU")).await;
    let r1 = &body["data"]["groups"][0]["rules"][0];
    assert_eq!(r1["labels"]["__alert_rule_uid__"], "r1");
    assert_eq!(r1["alerts"][0]["labels"]["__alert_rule_uid__"], "r1");
}

#[tokio::test]
async fn matcher_limits_surfaced_alerts() {
    let matcher = "%7B%22name%22%3A%22host%22%2C%22value%22%3A%22db-2%22%7D";
    let (status, body) = get(app(), &format!("{RULES_PATH}?matcher={matcher}")).await;
    assert_eq!(status, StatusCode::OK);
    let r1 = &body["data"]["groups"][0]["rules"][0];
    assert_eq!(r1["alerts"].as_array().unwrap().len(), 1);
    assert_eq!(r1["alerts"][0]["labels"]["host"], "db-2");
    assert_eq!(r1["totals"]["alerting"], 1);
    assert_eq!(r1["totalsFiltered"]["normal"], 1);
}

#[tokio::test]
async fn panel_without_dashboard_is_bad_request() {
    let (status, body) = get(app(), &format!("{RULES_PATH}?panel_id=5")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errorType"], "bad_data");
    assert!(body["error"].as_str().unwrap().contains("dashboard_uid"));
}

#[tokio::test]
async fn malformed_matcher_is_bad_request() {
    let (status, body) = get(app(), &format!("{RULES_PATH}?matcher=not-json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "bad_data");
}

#[tokio::test]
async fn unknown_state_is_bad_request() {
    let (status, body) = get(app(), &format!("{RULES_PATH}?state=exploded")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exploded"));
}

#[tokio::test]
async fn group_limit_zero_is_empty() {
    let (status, body) = get(app(), &format!("{RULES_PATH}?group_limit=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["groups"].as_array().unwrap().is_empty());
    assert!(body["data"].get("groupNextToken").is_none());
}

#[tokio::test]
async fn denied_user_sees_only_allowed_folders() {
    let (status, body) = get_as(app(), RULES_PATH, &[(USER_HEADER, "intern")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(group_names(&body), vec!["Payments/latency"]);
}

#[tokio::test]
async fn other_org_sees_nothing() {
    let (status, body) = get_as(app(), RULES_PATH, &[(ORG_ID_HEADER, "2")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(body["data"]["groups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_org_header_is_bad_request() {
    let (status, body) = get_as(app(), RULES_PATH, &[(ORG_ID_HEADER, "abc")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "bad_data");
}

#[tokio::test]
async fn folder_search_narrows_namespaces() {
    let (_, body) = get(app(), &format!("{RULES_PATH}?search.folder=pay")).await;
    assert_eq!(group_names(&body), vec!["Payments/latency"]);

    let (status, body) = get(app(), &format!("{RULES_PATH}?search.folder=nothing")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["groups"].as_array().unwrap().is_empty());
}

async fn follow_pages(mode: PaginationMode) -> Vec<String> {
    follow_pages_in(app_state(mode)).await
}

async fn follow_pages_in(state: AppState) -> Vec<String> {
    let mut seen = Vec::new();
    let mut token = String::new();
    for _ in 0..10 {
        let mut uri = format!("{RULES_PATH}?group_limit=1");
        if !token.is_empty() {
            uri.push_str(&format!("&group_next_token={}", token.replace('=', "%3D")));
        }
        let (status, body) = get(router(state.clone()), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].get("totals").is_none());
        seen.extend(group_names(&body));
        match body["data"]["groupNextToken"].as_str() {
            Some(next) => token = next.to_string(),
            None => return seen,
        }
    }
    panic!("pagination did not terminate");
}

#[tokio::test]
async fn pages_cover_all_groups_in_both_modes() {
    let expected = vec!["Infra/cpu", "Infra/disk", "Payments/latency"];
    assert_eq!(follow_pages(PaginationMode::Cursor).await, expected);
    assert_eq!(follow_pages(PaginationMode::Scan).await, expected);
}

#[tokio::test]
async fn pages_follow_folder_path_not_uid() {
    for mode in [PaginationMode::Cursor, PaginationMode::Scan] {
        let state = app_state_from(CROSSED_FOLDERS, mode);
        let (_, body) = get(router(state.clone()), RULES_PATH).await;
        let full = group_names(&body);
        assert_eq!(full, vec!["Alpha/g", "Zeta/g"]);
        assert_eq!(follow_pages_in(state).await, full);
    }
}

#[tokio::test]
async fn alerts_invalid_org_header_uses_alert_envelope() {
    let (status, body) = get_as(app(), ALERTS_PATH, &[(ORG_ID_HEADER, "abc")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errorType"], "bad_data");
    assert_eq!(body["data"]["alerts"], serde_json::json!([]));
    assert!(body["data"].get("groups").is_none());
}

#[tokio::test]
async fn alerts_listing() {
    let (status, body) = get(app(), ALERTS_PATH).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let alerts = body["data"]["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 3);
    assert_eq!(alerts[0]["state"], "Alerting");
    assert!(alerts[0]["labels"].get("__alert_rule_uid__").is_none());
}

#[tokio::test]
async fn metrics_count_requests_and_errors() {
    let state = app_state(PaginationMode::Scan);
    get(router(state.clone()), RULES_PATH).await;
    get(router(state.clone()), &format!("{RULES_PATH}?panel_id=1")).await;

    let resp = router(state)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("vigil_server_rule_status_requests_total 2"));
    assert!(text.contains("vigil_server_bad_data_errors_total 1"));
    assert!(text.contains("vigil_server_rule_status_latency_us_count 2"));
}
