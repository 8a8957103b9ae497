use crate::format::{ErrorBody, FormatError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inference::{DecodeError, InferenceError};
use thiserror::Error;

/// Everything that can go wrong while serving `POST /detect`.
///
/// Every variant is reported to the client the same way: a 500 with
/// `{"error": "An error occurred: <message>"}`.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("invalid upload: {0}")]
    Upload(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("failed to format detections: {0}")]
    Format(#[from] FormatError),

    #[error("detection worker failed: {0}")]
    Worker(String),
}

impl DetectError {
    /// Short label used as the `kind` attribute on failure metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectError::Upload(_) => "upload",
            DetectError::Decode(_) => "decode",
            DetectError::Inference(_) => "inference",
            DetectError::Format(_) => "format",
            DetectError::Worker(_) => "worker",
        }
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        match &self {
            DetectError::Upload(_) | DetectError::Decode(_) => {
                tracing::warn!(kind = self.kind(), error = %self, "Rejected upload");
            }
            _ => {
                tracing::error!(kind = self.kind(), error = %self, "Detection request failed");
            }
        }

        let body = ErrorBody {
            error: format!("An error occurred: {self}"),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
