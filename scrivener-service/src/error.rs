use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::ocr::OcrError;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("File must be an image, got content type: {content_type}")]
    InvalidContentType { content_type: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Upload not found: {upload_id}")]
    UploadNotFound { upload_id: String },

    #[error("Failed to persist upload")]
    Persist(#[source] std::io::Error),

    #[error("Text extraction failed")]
    Extraction(#[from] OcrError),
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidContentType { .. } | ServiceError::InvalidRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::UploadNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Persist(_) | ServiceError::Extraction(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::InvalidContentType { .. } => "invalid_content_type",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::UploadNotFound { .. } => "upload_not_found",
            ServiceError::Persist(_) => "persist_error",
            ServiceError::Extraction(_) => "extraction_error",
        }
    }

    /// Message safe to return to the client. Server-side failures collapse to
    /// a generic description; the detail is logged where the error occurred.
    fn client_message(&self) -> String {
        match self {
            ServiceError::Persist(_) => "Processing failed while saving the upload".to_string(),
            ServiceError::Extraction(_) => "Processing failed while extracting text".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "Request failed");
        }

        let response = ErrorResponse {
            message: self.client_message(),
            code: Some(self.error_code().to_string()),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = ServiceError::InvalidContentType {
            content_type: "text/plain".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ServiceError::InvalidRequest {
            message: "No file provided".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ServiceError::UploadNotFound {
            upload_id: "missing".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ServiceError::Persist(std::io::Error::other("disk full"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_client_messages_do_not_leak_internal_detail() {
        let err = ServiceError::Persist(std::io::Error::other("disk full"));
        assert!(!err.client_message().contains("disk full"));

        // Client errors keep their descriptive message
        let err = ServiceError::InvalidContentType {
            content_type: "text/plain".to_string(),
        };
        assert!(err.client_message().contains("must be an image"));
        assert!(err.client_message().contains("text/plain"));
    }
}
