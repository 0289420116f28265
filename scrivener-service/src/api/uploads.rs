//! Upload API endpoints.
//!
//! Handlers for submitting an image for text extraction and for looking up
//! a stored extraction result.

use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::service::UploadResponse;

use super::AppState;

/// Upload an image for text extraction
///
/// Expects a multipart body with one `file` field. The part's declared
/// content type decides whether the upload is accepted at all; the pipeline
/// does the rest.
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServiceError> {
    let mut file_data: Option<(Vec<u8>, String, String)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServiceError::InvalidRequest {
                        message: e.to_string(),
                    })?;
                file_data = Some((data.to_vec(), filename, content_type));
            }
            _ => {}
        }
    }

    let (data, filename, content_type) = file_data.ok_or_else(|| ServiceError::InvalidRequest {
        message: "No file provided".to_string(),
    })?;

    let response = state
        .service
        .handle_upload(&data, &filename, &content_type)
        .await?;

    Ok(Json(response))
}

/// Get the stored extraction result for an upload identifier
pub async fn get_extraction_handler(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<String>,
) -> Result<Json<UploadResponse>, ServiceError> {
    let extraction = state.service.extraction(&upload_id)?;
    Ok(Json(extraction))
}
