//! Health, readiness and metrics endpoints.
//!
//! The in-memory tests always run. `full_stack_health_check` builds the real
//! application and needs MongoDB on localhost; set SKIP_MONGO_TESTS to skip it.

mod common;

use common::TestApp;
use statement_service::config::StatementConfig;
use statement_service::startup::Application;
use std::time::Duration;

#[tokio::test]
async fn health_check_reports_service_and_version() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "statement-service");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn readiness_and_metrics_respond() {
    let app = TestApp::spawn().await;

    let ready = app
        .client()
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(ready.status(), 200);
    let ready: serde_json::Value = ready.json().await.expect("Failed to parse JSON");
    assert_eq!(ready["status"], "ready");

    let metrics = app
        .client()
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(metrics.status(), 200);
    assert!(metrics
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/plain")));
}

#[tokio::test]
async fn readiness_fails_when_a_model_is_unreachable() {
    let app = TestApp::spawn().await;
    app.strong.set_healthy(false);

    let response = app
        .client()
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 503);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["models"]["fast-test"], "ok");
    assert!(body["models"]["strong-test"]
        .as_str()
        .is_some_and(|s| s.contains("unreachable")));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .get(format!("{}/health", app.address))
        .header("x-request-id", "req-123")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-123")
    );
}

#[tokio::test]
async fn full_stack_health_check() {
    // Skip if MongoDB is not available
    if std::env::var("SKIP_MONGO_TESTS").is_ok() {
        eprintln!("Skipping test: SKIP_MONGO_TESTS is set");
        return;
    }

    std::env::set_var("ENVIRONMENT", "test");
    std::env::set_var("APP__PORT", "0");
    std::env::set_var("MONGODB_URI", "mongodb://localhost:27017");
    std::env::set_var("MONGODB_DATABASE", "statement_test_db");
    std::env::set_var("GOOGLE_API_KEY", "test-api-key");

    let config = StatementConfig::load().expect("Failed to load config");
    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = reqwest::Client::new()
        .get(format!("http://localhost:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["service"], "statement-service");
}
