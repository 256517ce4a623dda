#![allow(clippy::unwrap_used)]
// Integration tests for `Dashboard` against a wiremock backend.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chemviz_core::{
    CoreError, Dashboard, DashboardConfig, FailureKind, FileTokenStore, ListQuery, LoadOutcome,
    MemoryTokenStore, OperationKind, OperationState, SessionStatus,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> DashboardConfig {
    DashboardConfig::new(Url::parse(&server.uri()).unwrap())
}

/// Dashboard with a persisted token already restored.
fn logged_in(server: &MockServer) -> Dashboard {
    let store = MemoryTokenStore::with_token(SecretString::from("abc123".to_string()));
    let dashboard = Dashboard::new(config(server), store).unwrap();
    dashboard.restore_session();
    dashboard
}

fn anonymous(server: &MockServer) -> Dashboard {
    Dashboard::new(config(server), MemoryTokenStore::default()).unwrap()
}

fn page_json(names: &[&str], next: Option<String>, previous: Option<String>) -> serde_json::Value {
    let results: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "id": i + 1,
                "name": name,
                "type": "Pump",
                "material": "Steel",
                "pressure": 5.2,
                "temperature": 110,
                "flowrate": 120
            })
        })
        .collect();
    json!({ "count": results.len(), "next": next, "previous": previous, "results": results })
}

fn datasets_json() -> serde_json::Value {
    json!([{
        "id": 7,
        "name": "plant.csv",
        "uploaded_at": "2024-06-15T10:30:00Z",
        "equipment_count": 3,
        "avg_flowrate": 100.0,
        "avg_pressure": 5.0,
        "avg_temperature": 100.0,
        "type_distribution": { "Pump": 3 }
    }])
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn single_record_page_has_no_cursors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": 1, "name": "Pump-1", "material": "Steel",
                "pressure": 5.2, "temperature": 110
            }],
            "next": null,
            "previous": null
        })))
        .mount(&server)
        .await;

    let dashboard = anonymous(&server);
    let outcome = dashboard.apply_query(ListQuery::default()).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Applied);

    let page = dashboard.page();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Pump-1");
    assert!(!page.has_next());
    assert!(!page.has_previous());
    assert_eq!(dashboard.next_page().await.unwrap(), LoadOutcome::NoCursor);
    assert_eq!(dashboard.previous_page().await.unwrap(), LoadOutcome::NoCursor);
}

#[tokio::test]
async fn newer_query_wins_over_slow_older_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .and(query_param("search", "slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(&["Slow-1"], None, None))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .and(query_param("search", "fast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&["Fast-1"], None, None)))
        .mount(&server)
        .await;

    let dashboard = anonymous(&server);
    let first = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move {
            dashboard
                .apply_query(ListQuery {
                    search: "slow".into(),
                    ..ListQuery::default()
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = dashboard
        .apply_query(ListQuery {
            search: "fast".into(),
            ..ListQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(second, LoadOutcome::Applied);
    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Superseded);

    // Give the slow response time to arrive; it must not land.
    tokio::time::sleep(Duration::from_millis(600)).await;
    let page = dashboard.page();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Fast-1");
    assert_eq!(dashboard.query().search, "fast");
}

#[tokio::test]
async fn changing_filter_after_paging_fetches_first_page() {
    let server = MockServer::start().await;
    let next = format!("{}/api/equipment/?page=2&pressure__gte=10", server.uri());

    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .and(query_param("pressure__gte", "10"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            &["P1"],
            Some(next.clone()),
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            &["P11"],
            Some(format!("{}/api/equipment/?page=3&pressure__gte=10", server.uri())),
            Some(format!("{}/api/equipment/?pressure__gte=10", server.uri())),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .and(query_param("pressure__gte", "20"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&["P20"], None, None)))
        .expect(1)
        .mount(&server)
        .await;

    let dashboard = anonymous(&server);
    let mut query = ListQuery {
        min_pressure: Some(10.0),
        ..ListQuery::default()
    };
    dashboard.apply_query(query.clone()).await.unwrap();
    assert_eq!(dashboard.next_page().await.unwrap(), LoadOutcome::Applied);
    assert_eq!(dashboard.page().items[0].name, "P11");
    assert!(dashboard.page().has_next());

    query.min_pressure = Some(20.0);
    dashboard.apply_query(query).await.unwrap();
    let page = dashboard.page();
    assert_eq!(page.items[0].name, "P20");
    assert!(!page.has_next());
}

#[tokio::test]
async fn failed_load_keeps_previous_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .and(query_param_is_missing("search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&["Pump-1"], None, None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .and(query_param("search", "boom"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let dashboard = anonymous(&server);
    dashboard.apply_query(ListQuery::default()).await.unwrap();

    let err = dashboard
        .apply_query(ListQuery {
            search: "boom".into(),
            ..ListQuery::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Server { status: Some(500), .. }));

    assert_eq!(dashboard.page().items[0].name, "Pump-1");
    let state = dashboard.operation_state(OperationKind::Listing);
    let failure = state.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Server);
    assert!(failure.is_retryable());
}

#[tokio::test]
async fn listing_401_invalidates_session_and_clears_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Invalid token."
        })))
        .mount(&server)
        .await;

    let dashboard = logged_in(&server);
    let err = dashboard.refresh_list().await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(dashboard.session().status(), SessionStatus::Expired);
    assert!(dashboard.page().is_empty());
    assert_eq!(dashboard.operation_state(OperationKind::Listing), OperationState::Idle);
}

#[tokio::test]
async fn slow_listing_times_out_as_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(&["Pump-1"], None, None))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.timeout = Duration::from_millis(300);
    let dashboard = Dashboard::new(cfg, MemoryTokenStore::default()).unwrap();

    let err = dashboard.refresh_list().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Timeout { timeout: Some(t) } if t == Duration::from_millis(300)
    ));
    assert_eq!(err.to_string(), "Request timed out after 300ms");

    let state = dashboard.operation_state(OperationKind::Listing);
    let failure = state.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Network);
    assert!(failure.is_retryable());
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn start_with_token_loads_list_and_datasets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .and(header("Authorization", "Token abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&["Pump-1"], None, None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(datasets_json()))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryTokenStore::with_token(SecretString::from("abc123".to_string()));
    let dashboard = Dashboard::new(config(&server), store).unwrap();
    let session = dashboard.start().await.unwrap();

    assert_eq!(session.status(), SessionStatus::Authenticated);
    assert_eq!(dashboard.page().items.len(), 1);
    assert_eq!(dashboard.datasets().len(), 1);
    assert_eq!(dashboard.datasets()[0].type_distribution.get("Pump"), Some(&3));
}

#[tokio::test]
async fn start_without_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dashboard = anonymous(&server);
    let session = dashboard.start().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Anonymous);
}

#[tokio::test]
async fn login_persists_token_and_logout_removes_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api-token-auth/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "fresh" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("default.token.json");
    let dashboard = Dashboard::new(config(&server), FileTokenStore::new(&token_path)).unwrap();

    let session = dashboard
        .login("tester", &SecretString::from("password".to_string()))
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Authenticated);
    let raw = std::fs::read_to_string(&token_path).unwrap();
    assert_eq!(raw, r#"{"token":"fresh"}"#);

    let session = dashboard.logout();
    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert!(!token_path.exists());
}

#[tokio::test]
async fn rejected_login_is_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api-token-auth/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "non_field_errors": ["Unable to log in with provided credentials."]
        })))
        .mount(&server)
        .await;

    let dashboard = anonymous(&server);
    let err = dashboard
        .login("tester", &SecretString::from("wrong".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    assert!(err.to_string().contains("Unable to log in"));
    assert!(!dashboard.session().is_authenticated());
}

#[tokio::test]
async fn dataset_refresh_finishing_after_invalidate_is_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(datasets_json())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/7/report/pdf/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dashboard = logged_in(&server);
    let pending = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.refresh_datasets().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = dashboard.download_report(7).await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(dashboard.session().status(), SessionStatus::Expired);
    assert!(dashboard.datasets().is_empty());

    // The late reply still reaches its caller but must not repopulate
    // the cleared catalog.
    assert_eq!(pending.await.unwrap().unwrap().len(), 1);
    assert!(dashboard.datasets().is_empty());
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn upload_without_file_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dashboard = logged_in(&server);
    let err = dashboard.upload_csv(None).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    let state = dashboard.operation_state(OperationKind::Upload);
    assert_eq!(state.failure().unwrap().kind, FailureKind::Validation);
}

#[tokio::test]
async fn upload_success_refreshes_list_and_datasets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload/"))
        .and(header("Authorization", "Token abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "created": 3 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            &["Pump-1", "Pump-2", "Pump-3"],
            None,
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(datasets_json()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("plant.csv");
    std::fs::write(&csv, "Equipment Name,Type\nPump-1,Pump\n").unwrap();

    let dashboard = logged_in(&server);
    let resp = dashboard.upload_csv(Some(&csv)).await.unwrap();
    assert_eq!(resp.created, 3);

    match dashboard.operation_state(OperationKind::Upload) {
        OperationState::Succeeded(message) => assert!(message.contains('3'), "got: {message}"),
        other => panic!("expected success, got: {other:?}"),
    }
    assert_eq!(dashboard.page().items.len(), 3);
    assert_eq!(dashboard.datasets().len(), 1);
}

#[tokio::test]
async fn export_uses_current_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&["Pump-1"], None, None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/export/csv/"))
        .and(query_param("material", "Steel"))
        .and(query_param_is_missing("ordering"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("Name\nPump-1\n", "text/csv"))
        .expect(1)
        .mount(&server)
        .await;

    let dashboard = anonymous(&server);
    let mut query = ListQuery {
        material: Some("Steel".into()),
        ..ListQuery::default()
    };
    query.toggle_sort(chemviz_core::SortField::Name);
    dashboard.apply_query(query).await.unwrap();

    let download = dashboard.export_current().await.unwrap();
    assert_eq!(download.file_name, "equipment_export.csv");
    assert!(matches!(
        dashboard.operation_state(OperationKind::Export),
        OperationState::Succeeded(_)
    ));
}

#[tokio::test]
async fn export_401_invalidates_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/equipment/export/csv/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Invalid token."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dashboard = logged_in(&server);
    let err = dashboard.export_csv(&ListQuery::default()).await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(dashboard.session().status(), SessionStatus::Expired);

    let state = dashboard.operation_state(OperationKind::Export);
    assert_eq!(state.failure().unwrap().kind, FailureKind::Auth);
}

#[tokio::test]
async fn report_401_clears_session_and_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/7/report/pdf/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dashboard = logged_in(&server);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("report.pdf");

    let err = dashboard.download_report_to(7, &dest).await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(!dest.exists());
    assert!(!dashboard.session().is_authenticated());
    assert_eq!(dashboard.session().status(), SessionStatus::Expired);

    let state = dashboard.operation_state(OperationKind::Report);
    assert_eq!(state.failure().unwrap().kind, FailureKind::Auth);
}

#[tokio::test]
async fn report_501_is_capability_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/7/report/pdf/"))
        .respond_with(ResponseTemplate::new(501).set_body_json(json!({
            "detail": "PDF generation not available (reportlab missing)."
        })))
        .mount(&server)
        .await;

    let dashboard = logged_in(&server);
    let err = dashboard.download_report(7).await.unwrap_err();
    assert!(matches!(err, CoreError::CapabilityUnavailable { .. }));
    assert!(dashboard.session().is_authenticated());

    let state = dashboard.operation_state(OperationKind::Report);
    assert_eq!(state.failure().unwrap().kind, FailureKind::CapabilityUnavailable);

    dashboard.dismiss(OperationKind::Report);
    assert_eq!(dashboard.operation_state(OperationKind::Report), OperationState::Idle);
}

#[tokio::test]
async fn report_server_error_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/7/report/pdf/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let dashboard = logged_in(&server);
    let dir = tempfile::tempdir().unwrap();
    let err = dashboard.download_report_to(7, dir.path()).await.unwrap_err();
    assert!(matches!(err, CoreError::Server { status: Some(500), .. }));
    assert!(dashboard.session().is_authenticated());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    let state = dashboard.operation_state(OperationKind::Report);
    assert_eq!(state.failure().unwrap().kind, FailureKind::Server);
}

#[tokio::test]
async fn report_success_is_saved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/7/report/pdf/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"dataset_7.pdf\"")
                .set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let dashboard = logged_in(&server);
    let dir = tempfile::tempdir().unwrap();
    let saved = dashboard.download_report_to(7, dir.path()).await.unwrap();
    assert_eq!(saved, dir.path().join("dataset_7.pdf"));
    assert_eq!(std::fs::read(saved).unwrap(), b"%PDF-1.4");
}

#[tokio::test]
async fn dataset_summary_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/99/summary/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;

    let dashboard = anonymous(&server);
    let err = dashboard.dataset_summary(99).await.unwrap_err();
    assert!(matches!(err, CoreError::Server { status: Some(404), .. }));
}
