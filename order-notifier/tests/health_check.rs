//! Health and metrics endpoint tests.

mod common;

use chrono::DateTime;
use common::TestApp;
use wiremock::MockServer;

#[tokio::test]
async fn health_check_returns_ok_and_iso_time() {
    // Arrange
    let telegram = MockServer::start().await;
    let app = TestApp::spawn(&telegram).await;

    // Act
    let response = app
        .client()
        .get(format!("{}/api/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["ok"], true);

    let time = body["time"].as_str().expect("time is a string");
    assert!(time.ends_with('Z'));
    assert!(DateTime::parse_from_rfc3339(time).is_ok());
}

#[tokio::test]
async fn health_check_does_not_need_telegram_credentials() {
    let telegram = MockServer::start().await;
    let app = TestApp::spawn_with(&telegram, None, None, 5).await;

    let response = app
        .client()
        .get(format!("{}/api/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn metrics_endpoint_serves_text() {
    let telegram = MockServer::start().await;
    let app = TestApp::spawn(&telegram).await;

    let response = app
        .client()
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/plain")));
}
