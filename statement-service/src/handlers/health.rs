use crate::services::metrics::get_metrics;
use crate::services::TextProvider;
use crate::startup::AppState;
use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse, Json};
use futures::future::join_all;
use serde_json::json;

/// Liveness plus a store ping; 503 when the store is unreachable.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.transactions.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "statement-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "service": "statement-service",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
    }
}

/// Ready once every configured model passes its health check.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let checks = join_all(state.models.iter().map(|provider| async move {
        (provider.model().to_string(), provider.health_check().await)
    }))
    .await;

    let mut models = serde_json::Map::new();
    let mut ready = true;
    for (model, result) in checks {
        let status = match result {
            Ok(()) => "ok".to_string(),
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "Model provider not ready");
                ready = false;
                e.to_string()
            }
        };
        models.insert(model, json!(status));
    }

    let (code, status) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };
    (code, Json(json!({ "status": status, "models": models })))
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        get_metrics(),
    )
}
