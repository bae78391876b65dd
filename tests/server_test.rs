mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{settings, soap_result, waybill_list, SOAP_PATH};
use httpmock::prelude::*;
use rs_waybill_proxy::core::operations::OperationAllowList;
use rs_waybill_proxy::{app, AppState, LocalStorage, MemoryDocumentStore, SoapClient};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

fn state(server: &MockServer, report_dir: &TempDir) -> AppState {
    let client = SoapClient::new(settings(server).with_credentials("svc", "secret")).unwrap();
    let mut state = AppState::new(
        Arc::new(client),
        Arc::new(MemoryDocumentStore::new()),
        OperationAllowList::default(),
    );
    state.report_storage = LocalStorage::new(report_dir.path());
    state.batch_delay = Duration::ZERO;
    state
}

fn router(server: &MockServer) -> Router {
    let report_dir = TempDir::new().unwrap();
    app(state(server, &report_dir))
}

async fn send(router: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start();
    let (status, body) = send(&router(&server), "GET", "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "service": "rs-waybill-proxy"}));
}

#[tokio::test]
async fn test_operation_not_allowed_never_reaches_upstream() {
    let server = MockServer::start();
    let upstream = server.mock(|when, then| {
        when.method(POST).path(SOAP_PATH);
        then.status(200).body(soap_result("del_waybill", "1"));
    });

    let (status, body) = send(&router(&server), "POST", "/api/rs/del_waybill", "{}").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("del_waybill"));
    upstream.assert_hits(0);
}

#[tokio::test]
async fn test_proxy_call_returns_unwrapped_result() {
    let server = MockServer::start();
    let upstream = server.mock(|when, then| {
        when.method(POST)
            .path(SOAP_PATH)
            .body_contains("<waybill_id>901</waybill_id><su>svc</su>");
        then.status(200).body(soap_result(
            "get_waybill",
            "<WAYBILL><ID>901</ID><STATUS>1</STATUS></WAYBILL>",
        ));
    });

    let (status, body) = send(
        &router(&server),
        "POST",
        "/api/rs/get_waybill",
        r#"{"waybill_id": "901"}"#,
    )
    .await;

    upstream.assert();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"WAYBILL": {"ID": "901", "STATUS": "1"}}));
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let server = MockServer::start();
    let (status, _) = send(&router(&server), "POST", "/api/rs/get_waybills", "[1]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upstream_fault_is_server_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(SOAP_PATH);
        then.status(500).body(common::soap_body(
            "<soap:Fault><faultcode>soap:Client</faultcode><faultstring>bad su</faultstring></soap:Fault>",
        ));
    });

    let (status, body) = send(&router(&server), "POST", "/api/rs/get_server_time", "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "bad su"}));
}

#[tokio::test]
async fn test_store_put_then_get() {
    let server = MockServer::start();
    let router = router(&server);

    let (status, _) = send(&router, "GET", "/api/store/uid1/payments", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let document = r#"{"123456789": [{"amount": 50, "date": "2024-01-10"}]}"#;
    let (status, body) = send(&router, "PUT", "/api/store/uid1/payments", document).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = send(&router, "GET", "/api/store/uid1/payments", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["123456789"][0]["amount"], 50);
}

#[tokio::test]
async fn test_store_rejects_bad_identifiers() {
    let server = MockServer::start();
    let (status, _) = send(&router(&server), "GET", "/api/store/uid1/a.b", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_debt_report_endpoint() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path(SOAP_PATH)
            .body_contains("<create_date_e>2024-01-31T23:59:59</create_date_e>");
        then.status(200).body(waybill_list("get_waybills", &["1", "2"]));
    });

    let report_dir = TempDir::new().unwrap();
    let router = app(state(&server, &report_dir));
    let (status, body) = send(
        &router,
        "GET",
        "/api/reports/debts?user_id=uid1&start=2024-01-01&end=2024-01-31",
        "",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["tin"], "123456789");
    assert_eq!(body[0]["sales_total"], 20.0);
    assert_eq!(body[0]["waybill_count"], 2);

    let stem = "debts_uid1_20240101-20240131";
    assert!(report_dir.path().join(format!("{}.csv", stem)).exists());
    let saved: Value =
        serde_json::from_slice(&std::fs::read(report_dir.path().join(format!("{}.json", stem))).unwrap())
            .unwrap();
    assert_eq!(saved, body);
}
