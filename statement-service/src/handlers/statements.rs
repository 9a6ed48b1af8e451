use crate::dtos::{ConfirmRequest, ConfirmResponse, PreviewResponse};
use crate::error::PipelineError;
use crate::middleware::UserId;
use crate::models::UploadedFile;
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use service_core::error::AppError;

/// Multipart parts carrying statement files.
const FILE_FIELDS: [&str; 2] = ["file", "files"];

pub async fn preview_statement(
    State(state): State<AppState>,
    user_id: UserId,
    mut multipart: Multipart,
) -> Result<Json<PreviewResponse>, PipelineError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        if !field.name().is_some_and(|name| FILE_FIELDS.contains(&name)) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("statement").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read file data: {}", e))
        })?;

        if bytes.len() > state.max_upload_bytes {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "{} exceeds the {} byte upload limit",
                file_name,
                state.max_upload_bytes
            ))
            .into());
        }

        tracing::debug!(file_name = %file_name, size = bytes.len(), "Received statement file");
        files.push(UploadedFile::new(file_name, content_type, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("No file uploaded")).into());
    }

    let outcome = state.pipeline.preview(&user_id.0, files).await?;

    Ok(Json(PreviewResponse {
        transactions: outcome.transactions,
        warnings: outcome.warnings,
    }))
}

pub async fn confirm_statement(
    State(state): State<AppState>,
    user_id: UserId,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, PipelineError> {
    let inserted = state
        .pipeline
        .confirm(&user_id.0, request.transactions)
        .await?;

    Ok(Json(ConfirmResponse {
        success: true,
        inserted,
    }))
}
