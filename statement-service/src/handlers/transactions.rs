use crate::dtos::{CategoryOverrideRequest, CategoryOverrideResponse};
use crate::middleware::UserId;
use crate::models::Category;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// User correction of a stored transaction's category. The merchant cache is
/// left alone; shared entries are corrected through the admin route.
pub async fn override_category(
    State(state): State<AppState>,
    user_id: UserId,
    Path(transaction_id): Path<String>,
    Json(request): Json<CategoryOverrideRequest>,
) -> Result<Json<CategoryOverrideResponse>, AppError> {
    request.validate()?;
    let category = Category::from_name(&request.category)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Unknown category")))?;

    let updated = state
        .transactions
        .override_category(&user_id.0, &transaction_id, category)
        .await?;

    if !updated {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Transaction {} not found",
            transaction_id
        )));
    }

    tracing::info!(
        user_id = %user_id.0,
        transaction_id = %transaction_id,
        category = %category,
        "Category overridden by user"
    );

    Ok(Json(CategoryOverrideResponse {
        id: transaction_id,
        category,
        user_overridden: true,
    }))
}
