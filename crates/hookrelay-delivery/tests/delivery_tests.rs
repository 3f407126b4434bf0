//! Integration tests for the delivery attempt path.
//!
//! Drive the real HTTP execution against wiremock targets and run the
//! resulting outcomes through the worker's classification, verifying the
//! state machine transitions of the delivery pipeline.

#![cfg(feature = "integration")]

mod common;

use std::time::Duration;

use common::*;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

use hookrelay_db::models::EventStatus;
use hookrelay_delivery::services::delivery_service::{
    classify_outcome, post_payload, TaskDisposition,
};

/// Test: a 2xx response is captured as a successful attempt with the
/// payload and event header intact.
#[tokio::test]
async fn test_delivery_posts_payload_verbatim() {
    let mock_server = MockServer::start().await;
    let capture = CaptureResponder::new();

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(capture.clone())
        .mount(&mock_server)
        .await;

    let client = test_client(Duration::from_secs(5));
    let event_id = Uuid::new_v4();
    let payload = meeting_ended_payload();
    let url = format!("{}/hook", mock_server.uri());

    let result = post_payload(&client, &url, event_id, &payload).await;

    assert!(result.is_success());
    assert_eq!(result.status_code, Some(200));
    assert!(result.error.is_none());

    let requests = capture.requests();
    assert_eq!(requests.len(), 1);

    let delivered: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(delivered, payload);
    assert_eq!(
        requests[0].header("x-event-id"),
        Some(event_id.to_string().as_str())
    );
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
}

/// Test: a non-2xx response is a defined outcome, not an error.
#[tokio::test]
async fn test_non_2xx_is_not_exceptional() {
    let mock_server = MockServer::start().await;
    let capture = CaptureResponder::with_status(500);

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(capture.clone())
        .mount(&mock_server)
        .await;

    let client = test_client(Duration::from_secs(5));
    let url = format!("{}/hook", mock_server.uri());

    let result = post_payload(&client, &url, Uuid::new_v4(), &meeting_ended_payload()).await;

    assert!(!result.is_success());
    assert_eq!(result.status_code, Some(500));
    assert!(result.error.is_none(), "HTTP 500 must not raise an error");
    assert_eq!(capture.request_count(), 1);
}

/// Test: a stalled target hits the fixed timeout and records a transport
/// error instead of blocking the worker.
#[tokio::test]
async fn test_timeout_records_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(DelayedResponder::new(2_000))
        .mount(&mock_server)
        .await;

    let client = test_client(Duration::from_millis(200));
    let url = format!("{}/hook", mock_server.uri());

    let result = post_payload(&client, &url, Uuid::new_v4(), &meeting_ended_payload()).await;

    assert!(!result.is_success());
    assert_eq!(result.status_code, None);
    assert!(result.error.unwrap().contains("timed out"));
}

/// Test: a connection failure records a transport error.
#[tokio::test]
async fn test_connection_refused_records_transport_error() {
    let client = test_client(Duration::from_secs(2));

    // Port 9 (discard) is essentially never listening.
    let result = post_payload(
        &client,
        "http://127.0.0.1:9/hook",
        Uuid::new_v4(),
        &meeting_ended_payload(),
    )
    .await;

    assert!(!result.is_success());
    assert_eq!(result.status_code, None);
    assert!(result.error.is_some());
}

/// Test: a target that always answers 500 exhausts the full retry budget —
/// 5 attempts, the first 4 classified as retrying, the last as terminal
/// failure.
#[tokio::test]
async fn test_always_500_exhausts_budget_after_five_attempts() {
    let mock_server = MockServer::start().await;
    let capture = CaptureResponder::with_status(500);

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(capture.clone())
        .mount(&mock_server)
        .await;

    let client = test_client(Duration::from_secs(5));
    let url = format!("{}/hook", mock_server.uri());
    let event_id = Uuid::new_v4();
    let payload = meeting_ended_payload();

    let max_attempts = 5;
    let mut statuses = Vec::new();

    for attempt in 1..=max_attempts {
        let result = post_payload(&client, &url, event_id, &payload).await;
        assert_eq!(result.status_code, Some(500));

        let (status, disposition) =
            classify_outcome(result.is_success(), attempt, max_attempts, 60);
        statuses.push(status);

        if attempt < max_attempts {
            assert!(matches!(disposition, TaskDisposition::RetryAfter(_)));
        } else {
            assert_eq!(disposition, TaskDisposition::Abandon);
        }
    }

    assert_eq!(capture.request_count(), 5);
    assert_eq!(
        statuses,
        vec![
            EventStatus::Retrying,
            EventStatus::Retrying,
            EventStatus::Retrying,
            EventStatus::Retrying,
            EventStatus::Failed,
        ]
    );
}

/// Test: a target that recovers after two failures reaches success in
/// exactly one more execution — no further retries are scheduled.
#[tokio::test]
async fn test_eventual_success_stops_retries() {
    let mock_server = MockServer::start().await;
    let failing = FailingResponder::fail_times(2);

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(failing.clone())
        .mount(&mock_server)
        .await;

    let client = test_client(Duration::from_secs(5));
    let url = format!("{}/hook", mock_server.uri());
    let event_id = Uuid::new_v4();
    let payload = meeting_ended_payload();

    let max_attempts = 5;
    let mut attempt = 0;

    let final_status = loop {
        attempt += 1;
        let result = post_payload(&client, &url, event_id, &payload).await;
        let (status, disposition) =
            classify_outcome(result.is_success(), attempt, max_attempts, 60);

        match disposition {
            TaskDisposition::RetryAfter(_) => continue,
            TaskDisposition::Ack | TaskDisposition::Abandon => break status,
        }
    };

    assert_eq!(final_status, EventStatus::Success);
    assert_eq!(failing.attempt_count(), 3);
    assert_eq!(attempt, 3, "success must terminate in one execution");
}
