use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::inference::InferenceError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Document not found: {0}")]
    NotFound(Uuid),

    #[error("Document {0} is already being processed or is not eligible for analysis")]
    AlreadyProcessing(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("Failed to persist document: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Analysis did not finish within {}s", .0.as_secs())]
    DeadlineExceeded(Duration),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalysisError::AlreadyProcessing(_) => StatusCode::CONFLICT,
            AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
            AnalysisError::Inference(_) => StatusCode::BAD_GATEWAY,
            AnalysisError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            AnalysisError::Storage(_)
            | AnalysisError::Persistence(_)
            | AnalysisError::Database(_)
            | AnalysisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AnalysisError::NotFound(_) => "not_found",
            AnalysisError::AlreadyProcessing(_) => "already_processing",
            AnalysisError::Storage(_) => "storage",
            AnalysisError::Inference(_) => "inference",
            AnalysisError::Persistence(_) => "persistence",
            AnalysisError::Database(_) => "database",
            AnalysisError::DeadlineExceeded(_) => "deadline_exceeded",
            AnalysisError::Validation(_) => "validation",
            AnalysisError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<sea_orm::DbErr> for AnalysisError {
    fn from(err: sea_orm::DbErr) -> Self {
        AnalysisError::Database(err.to_string())
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AnalysisError {
    fn from(err: tokio::task::JoinError) -> Self {
        AnalysisError::Internal(format!("background task failed: {err}"))
    }
}
