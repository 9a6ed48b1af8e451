use crate::startup::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Proof that the request carried the configured admin token.
#[derive(Debug, Clone, Copy)]
pub struct AdminGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Admin routes are disabled"
            )));
        };

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing X-Admin-Token header")))?;

        if provided != expected {
            tracing::warn!("Rejected admin request with invalid token");
            return Err(AppError::Forbidden(anyhow::anyhow!("Invalid admin token")));
        }

        Ok(AdminGuard)
    }
}
