use super::*;
use crate::state::request::Phase;
use crate::test_support::{MockServer, Reply, session};
use serde_json::json;

fn signed_in() -> SessionStore {
    let store = SessionStore::new();
    store.set_session(Some(session("tok", "a@b.c")));
    store
}

#[tokio::test]
async fn scan_reads_findings() {
    let server = MockServer::always(Reply::json(
        200,
        json!({
            "status": "ok",
            "results": {
                "scan_type": "cwpp",
                "timestamp": "2025-01-01T00:00:00",
                "findings": [{ "type": "A", "message": "B", "severity": "C" }],
            },
        }),
    ))
    .await;
    let mut page = CwppPage::default();
    page.scan(&ApiClient::new(&server.url), &signed_in()).await;

    assert_eq!(page.request.phase, Phase::Succeeded);
    let report = page.report.as_ref().unwrap();
    assert_eq!(report.scan_type_label(), "CWPP");
    assert_eq!(report.findings.len(), 1);

    let now = OffsetDateTime::from_unix_timestamp(1).unwrap();
    let download = page.export_csv(now).unwrap();
    assert_eq!(download.filename, "cwpp_scan_1000.csv");
    assert_eq!(download.body, "Type,Message,Severity\nA,B,C");
}

#[tokio::test]
async fn missing_token_fails_without_request() {
    let server = MockServer::always(Reply::json(200, json!({}))).await;
    let mut page = CwppPage::default();
    page.scan(&ApiClient::new(&server.url), &SessionStore::new()).await;
    assert_eq!(page.request.error.as_deref(), Some(NO_TOKEN));
    assert!(!page.request.is_busy());
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn missing_results_are_invalid() {
    let server = MockServer::always(Reply::json(200, json!({ "status": "ok", "results": null }))).await;
    let mut page = CwppPage::default();
    page.scan(&ApiClient::new(&server.url), &signed_in()).await;
    assert_eq!(page.request.error.as_deref(), Some(INVALID_RESULTS));
    assert!(page.export_csv(OffsetDateTime::UNIX_EPOCH).is_none());
}

#[tokio::test]
async fn non_ok_status_is_invalid_even_with_results() {
    let server = MockServer::always(Reply::json(200, json!({ "status": "error", "results": { "findings": [] } }))).await;
    let mut page = CwppPage::default();
    page.scan(&ApiClient::new(&server.url), &signed_in()).await;
    assert_eq!(page.request.error.as_deref(), Some(INVALID_RESULTS));
}

#[tokio::test]
async fn server_error_is_shown() {
    let server = MockServer::always(Reply::json(500, json!({ "error": "agent offline" }))).await;
    let mut page = CwppPage::default();
    page.scan(&ApiClient::new(&server.url), &signed_in()).await;
    assert_eq!(page.request.error.as_deref(), Some("Error: agent offline"));
}

#[tokio::test]
async fn garbled_body_shows_fixed_message() {
    let server = MockServer::always(Reply::text(200, "<html>gateway</html>")).await;
    let mut page = CwppPage::default();
    page.scan(&ApiClient::new(&server.url), &signed_in()).await;
    assert_eq!(page.request.error.as_deref(), Some(FETCH_FAILED));
}
