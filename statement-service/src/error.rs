//! Typed outcomes of preview and confirm that the client must act on.

use crate::models::QuotaKind;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Daily {} limit of {limit} reached. Upgrade your plan to continue.", .kind.as_str())]
    QuotaExceeded { kind: QuotaKind, limit: u32 },

    #[error("{0}")]
    UnsupportedFile(String),

    #[error("{0}")]
    NoExtractableText(String),

    #[error("No transactions were found in the uploaded statement. Please review the file.")]
    NoTransactionsFound,

    #[error("{0}")]
    InvalidBatch(String),

    #[error("One or more cards do not belong to this account")]
    CardOwnership,

    #[error(transparent)]
    App(#[from] AppError),
}

/// Body shape the upload UI understands for every preview/confirm failure.
#[derive(Debug, Serialize)]
pub struct PipelineErrorBody {
    pub upgrade: bool,
    pub message: String,
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::UnsupportedFile(_)
            | Self::NoExtractableText(_)
            | Self::NoTransactionsFound
            | Self::InvalidBatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CardOwnership => StatusCode::FORBIDDEN,
            Self::App(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label for preview outcomes.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "quota",
            Self::UnsupportedFile(_) => "unsupported",
            Self::NoExtractableText(_) => "no_text",
            Self::NoTransactionsFound => "empty",
            Self::InvalidBatch(_) => "invalid",
            Self::CardOwnership => "forbidden",
            Self::App(_) => "error",
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let upgrade = matches!(self, Self::QuotaExceeded { .. });

        match self {
            Self::App(err) => err.into_response(),
            other => (
                status,
                Json(PipelineErrorBody {
                    upgrade,
                    message: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
