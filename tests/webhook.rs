//! Integration tests for the webhook receiver routes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use surmado::ReportStatus;
use surmado::webhook::{ReceiverConfig, WebhookHandler, WebhookPayload, router};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Records every payload it is handed, optionally failing or stalling.
#[derive(Default)]
struct Recorder {
    completed: Mutex<Vec<WebhookPayload>>,
    failed: Mutex<Vec<WebhookPayload>>,
    other: Mutex<Vec<WebhookPayload>>,
    reject: bool,
    stall: Option<Duration>,
}

impl WebhookHandler for Recorder {
    fn on_completed(&self, payload: &WebhookPayload) -> anyhow::Result<()> {
        if let Some(stall) = self.stall {
            std::thread::sleep(stall);
        }
        self.completed.lock().unwrap().push(payload.clone());
        if self.reject {
            bail!("disk full");
        }
        Ok(())
    }

    fn on_failed(&self, payload: &WebhookPayload) -> anyhow::Result<()> {
        self.failed.lock().unwrap().push(payload.clone());
        Ok(())
    }

    fn on_other(&self, payload: &WebhookPayload) -> anyhow::Result<()> {
        self.other.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

fn app(handler: Arc<Recorder>) -> Router {
    router(handler, &ReceiverConfig::default())
}

async fn post(app: &Router, body: impl Into<Body>) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/webhook")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn completed_payload() -> Value {
    json!({
        "report_id": "rpt_abc123",
        "status": "completed",
        "product": "signal",
        "brand_slug": "example_brand",
        "brand_name": "Example Brand",
        "download_url": "https://cdn.example/rpt_abc123.pdf",
        "pptx_download_url": "https://cdn.example/rpt_abc123.pptx",
        "intelligence_download_url": "https://cdn.example/rpt_abc123.json",
        "completed_at": "2025-01-15T10:45:00Z"
    })
}

// ---------------------------------------------------------------------------
// Test: completed delivery is acknowledged and handled once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completed_delivery_is_acknowledged() {
    let handler = Arc::new(Recorder::default());
    let app = app(Arc::clone(&handler));

    let (status, body) = post(&app, completed_payload().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ack, json!({"received": true}));

    let completed = handler.completed.lock().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(serde_json::to_value(&completed[0]).unwrap(), completed_payload());
    assert!(handler.failed.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: failed delivery reaches the failure path with the remote error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_delivery_reports_error() {
    let handler = Arc::new(Recorder::default());
    let app = app(Arc::clone(&handler));

    let body = json!({
        "report_id": "rpt_def456",
        "status": "failed",
        "product": "scan",
        "error": "Website unreachable"
    });
    let (status, _) = post(&app, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    let failed = handler.failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].status, ReportStatus::Failed);
    assert_eq!(failed[0].error.as_deref(), Some("Website unreachable"));
    assert!(handler.completed.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: other statuses are accepted without terminal handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_terminal_status_is_only_acknowledged() {
    let handler = Arc::new(Recorder::default());
    let app = app(Arc::clone(&handler));

    let body = json!({"report_id": "rpt_1", "status": "processing"});
    let (status, _) = post(&app, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(handler.other.lock().unwrap().len(), 1);
    assert!(handler.completed.lock().unwrap().is_empty());
    assert!(handler.failed.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: malformed bodies get an empty 500 and the receiver keeps serving
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_body_returns_empty_500() {
    let handler = Arc::new(Recorder::default());
    let app = app(Arc::clone(&handler));

    for body in ["not json", "[1, 2, 3]", r#"{"status": "completed"}"#] {
        let (status, bytes) = post(&app, body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {body}");
        assert!(bytes.is_empty(), "body: {body}");
    }
    assert!(handler.completed.lock().unwrap().is_empty());

    let (status, _) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(handler.completed.lock().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: a redelivery of the same (report_id, status) is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_delivery_is_handled_once() {
    let handler = Arc::new(Recorder::default());
    let app = app(Arc::clone(&handler));

    for _ in 0..3 {
        let (status, body) = post(&app, completed_payload().to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()["received"], true);
    }

    assert_eq!(handler.completed.lock().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: handler errors answer 500 and allow a later redelivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn handler_error_returns_500_and_allows_retry() {
    let handler = Arc::new(Recorder {
        reject: true,
        ..Recorder::default()
    });
    let app = app(Arc::clone(&handler));

    let (status, body) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty());

    let (status, _) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(handler.completed.lock().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Test: a handler slower than the acknowledgment deadline answers 500
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_handler_hits_ack_deadline() {
    let handler = Arc::new(Recorder {
        stall: Some(Duration::from_millis(300)),
        ..Recorder::default()
    });
    let config = ReceiverConfig {
        ack_deadline: Duration::from_millis(50),
        ..ReceiverConfig::default()
    };
    let app = router(Arc::clone(&handler), &config);

    let (status, _) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ---------------------------------------------------------------------------
// Test: a handler that fails after the deadline leaves the delivery retryable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn late_handler_failure_allows_redelivery() {
    let handler = Arc::new(Recorder {
        stall: Some(Duration::from_millis(200)),
        reject: true,
        ..Recorder::default()
    });
    let config = ReceiverConfig {
        ack_deadline: Duration::from_millis(50),
        ..ReceiverConfig::default()
    };
    let app = router(Arc::clone(&handler), &config);

    let (status, _) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let (status, _) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(handler.completed.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn late_handler_success_acknowledges_redelivery() {
    let handler = Arc::new(Recorder {
        stall: Some(Duration::from_millis(200)),
        ..Recorder::default()
    });
    let config = ReceiverConfig {
        ack_deadline: Duration::from_millis(50),
        ..ReceiverConfig::default()
    };
    let app = router(Arc::clone(&handler), &config);

    let (status, _) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let (status, body) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()["received"], true);
    assert_eq!(handler.completed.lock().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: a duplicate arriving mid-run is not acknowledged before the outcome
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_during_failing_run_is_retried() {
    let handler = Arc::new(Recorder {
        stall: Some(Duration::from_millis(200)),
        reject: true,
        ..Recorder::default()
    });
    let app = app(Arc::clone(&handler));

    let first = {
        let app = app.clone();
        tokio::spawn(async move { post(&app, completed_payload().to_string()).await.0 })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, body) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty());

    assert_eq!(first.await.unwrap(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(handler.completed.lock().unwrap().len(), 1);

    // The failed run released its claim, so the next redelivery runs again.
    let (status, _) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(handler.completed.lock().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Test: oversized bodies get an empty 500
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oversized_body_returns_empty_500() {
    let handler = Arc::new(Recorder::default());
    let config = ReceiverConfig {
        max_body_bytes: 64,
        ..ReceiverConfig::default()
    };
    let app = router(Arc::clone(&handler), &config);

    let (status, bytes) = post(&app, completed_payload().to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(bytes.is_empty());
    assert!(handler.completed.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: concurrent deliveries are all answered
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_deliveries_are_independent() {
    let handler = Arc::new(Recorder::default());
    let app = app(Arc::clone(&handler));

    let mut tasks = Vec::new();
    for i in 0..5 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            let body = json!({"report_id": format!("rpt_{i}"), "status": "completed"});
            post(&app, body.to_string()).await.0
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(handler.completed.lock().unwrap().len(), 5);
}

// ---------------------------------------------------------------------------
// Test: only POST is accepted on the webhook route
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_on_webhook_is_method_not_allowed() {
    let app = app(Arc::new(Recorder::default()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ---------------------------------------------------------------------------
// Test: health endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok() {
    let app = app(Arc::new(Recorder::default()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}
