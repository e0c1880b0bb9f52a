//! API error type and its JSON rendering.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::identity::IdentityError;
use crate::service::ServiceError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// A problem with the submitted photo; reported with HTTP 200 so the
    /// dashboard can show its own message.
    #[error("{0}")]
    Soft(String),
    #[error("{0}")]
    Validation(String),
    #[error("Invalid action")]
    UnknownAction,
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    Multipart(#[from] MultipartError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Soft(_) => StatusCode::OK,
            ApiError::Validation(_) | ApiError::UnknownAction => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(e) => e.status(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Multipart(e) => e.body_text(),
            other => other.to_string(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        if e.is_user_correctable() {
            ApiError::Soft(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else if status.is_client_error() {
            tracing::warn!(%status, error = %message, "request rejected");
        } else {
            tracing::debug!(error = %message, "soft error");
        }

        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodlens_core::PipelineError;
    use moodlens_store::StoreError;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Soft("x".into()).status_code(), StatusCode::OK);
        assert_eq!(ApiError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::UnknownAction.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_pipeline_errors_split_soft_and_hard() {
        let soft: ApiError = ServiceError::Pipeline(PipelineError::NoFaceDetected).into();
        assert!(matches!(&soft, ApiError::Soft(m) if m == "No face detected"));

        let hard: ApiError = ServiceError::Pipeline(PipelineError::ModelUnavailable).into();
        assert_eq!(hard.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hard.to_string(), "Model not loaded");

        let store: ApiError = ServiceError::Persistence(StoreError::UnknownUser(3)).into();
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unknown_action_message() {
        assert_eq!(ApiError::UnknownAction.message(), "Invalid action");
    }
}
