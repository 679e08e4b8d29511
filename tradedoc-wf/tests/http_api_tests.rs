//! HTTP API integration tests
//!
//! Drives the router the way UI collaborators do: open a workflow, read the
//! combined model, set modes and variants, and validate error mapping on
//! the upload endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use tradedoc_common::events::EventBus;
use tradedoc_wf::upload::UploadChannel;
use tradedoc_wf::workflow::{LoggingPopulator, WorkflowController};
use tradedoc_wf::{build_router, AppState};

/// Router wired to a backend that refuses connections
fn test_app() -> axum::Router {
    let bus = EventBus::new(64);
    let channel = UploadChannel::new(
        "http://127.0.0.1:1".to_string(),
        Duration::from_millis(50),
        None,
    )
    .unwrap();
    let controller = Arc::new(WorkflowController::new(
        channel,
        bus.clone(),
        Arc::new(LoggingPopulator),
        0,
    ));
    build_router(AppState::new(controller, bus))
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_module_and_workflow_state() {
    let app = test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tradedoc-wf");
    assert_eq!(body["workflow_open"], false);
}

#[tokio::test]
async fn workflow_read_before_open_is_404() {
    let app = test_app();

    let response = app
        .oneshot(Request::builder().uri("/workflow").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn open_then_read_round_trips_the_model() {
    let app = test_app();

    // Open with pre-existing content under keys 1 and 3
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/workflow/open",
            json!({
                "title": "PO-2291 docs",
                "contents": {"1": {"incoterm": "CIF"}, "3": {"signed": true}},
                "active_variant": "ci"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/workflow").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["title"], "PO-2291 docs");
    assert_eq!(body["active_variant"], "ci");
    assert_eq!(body["modified_steps"], json!([1, 3]));
    assert_eq!(body["dirty"], false);
    // Step 4 resolves to the commercial invoice key under variant ci
    assert_eq!(body["steps"][3]["doc_key"], 4);
    assert_eq!(body["steps"][0]["upload"]["status"], "idle");
}

#[tokio::test]
async fn step_mode_and_variant_endpoints_update_the_model() {
    let app = test_app();
    app.clone()
        .oneshot(json_request(Method::POST, "/workflow/open", json!({})))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/workflow/steps/2/mode",
            json!({"mode": "skip"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["steps"][1]["mode"], "skip");
    assert_eq!(body["steps"][1]["complete"], true);
    assert_eq!(body["dirty"], true);

    let response = app
        .oneshot(json_request(
            Method::PUT,
            "/workflow/variant",
            json!({"variant": "pl"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["active_variant"], "pl");
    assert_eq!(body["steps"][3]["doc_key"], 5);
}

#[tokio::test]
async fn out_of_range_step_is_400() {
    let app = test_app();
    app.clone()
        .oneshot(json_request(Method::POST, "/workflow/open", json!({})))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            Method::PUT,
            "/workflow/steps/9/mode",
            json!({"mode": "manual"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn content_on_undecided_step_four_is_400() {
    let app = test_app();
    app.clone()
        .oneshot(json_request(Method::POST, "/workflow/open", json!({})))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            Method::PUT,
            "/workflow/steps/4/content",
            json!({"content": {"cartons": 12}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_start_validates_payload_and_accepts() {
    let app = test_app();
    app.clone()
        .oneshot(json_request(Method::POST, "/workflow/open", json!({})))
        .await
        .unwrap();

    // Invalid base64 is rejected up front
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/workflow/steps/1/upload",
            json!({
                "remote_id": uuid::Uuid::new_v4(),
                "filename": "offer.pdf",
                "content": "!!! not base64 !!!"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A valid payload is accepted asynchronously
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/workflow/steps/1/upload",
            json!({
                "remote_id": uuid::Uuid::new_v4(),
                "filename": "offer.pdf",
                "content": "JVBERi0xLjc="
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["accepted"], true);
}

#[tokio::test]
async fn retry_without_failed_upload_reports_noop() {
    let app = test_app();
    app.clone()
        .oneshot(json_request(Method::POST, "/workflow/open", json!({})))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/workflow/steps/3/upload/retry")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["retried"], false);
}

#[tokio::test]
async fn restore_endpoint_seeds_ready_state() {
    let app = test_app();
    app.clone()
        .oneshot(json_request(Method::POST, "/workflow/open", json!({})))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/workflow/steps/2/upload/restore",
            json!({
                "filename": "pi-2024-03.pdf",
                "primary_url": "https://files.example/pi.pdf"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/workflow").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["steps"][1]["upload"]["status"], "ready");
    assert_eq!(body["steps"][1]["upload"]["filename"], "pi-2024-03.pdf");
    assert_eq!(body["steps"][1]["upload"]["error"], Value::Null);
}
