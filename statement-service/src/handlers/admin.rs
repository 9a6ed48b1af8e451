use crate::middleware::AdminGuard;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use service_core::error::AppError;

/// Drop a shared merchant -> category entry so the next lookup re-asks the model.
pub async fn invalidate_category_cache(
    State(state): State<AppState>,
    _admin: AdminGuard,
    Path(merchant_key): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.cache.invalidate(&merchant_key).await? {
        tracing::info!(merchant_key = %merchant_key, "Category cache entry invalidated");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!(
            "No cache entry for {}",
            merchant_key
        )))
    }
}
