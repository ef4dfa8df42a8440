//! Multipart upload extraction

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use flarewatch_core::AppError;
use flarewatch_processing::UploadedFile;

const FILE_FIELD: &str = "file";

fn multipart_error(err: MultipartError) -> AppError {
    tracing::debug!(error = %err, status = %err.status(), "Failed to read multipart body");
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the maximum allowed size".to_string())
    } else {
        AppError::InvalidInput("Error retrieving the file".to_string())
    }
}

/// Extract the uploaded file from the multipart form.
/// Only one field named "file" is accepted, and it must carry a filename.
/// Other fields are ignored.
pub async fn extract_multipart_file(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        if upload.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidInput("Error retrieving the file".to_string()))?;

        let data = field.bytes().await.map_err(multipart_error)?;

        upload = Some(UploadedFile { filename, data });
    }

    upload.ok_or_else(|| AppError::InvalidInput("Error retrieving the file".to_string()))
}
