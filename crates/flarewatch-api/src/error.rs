//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Errors render as
//! a short plain-text body with the status from `ErrorMetadata`; internal
//! details only go to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use flarewatch_core::{AppError, ErrorMetadata, LogLevel};
use flarewatch_processing::{AnalysisError, PipelineError, ResultParseError, ValidationError};
use flarewatch_storage::StorageError;

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rule: IntoResponse and AppError both live in other crates)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let error_code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type, error_code, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type, error_code, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error.detailed_message(),
                error_type,
                error_code,
                "Request failed"
            );
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        (status, format!("{}\n", app_error.client_message())).into_response()
    }
}

// Domain errors into HttpAppError

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::Unavailable(_) => AppError::StorageUnavailable(Box::new(err)),
            StorageError::WriteFailed(_) => AppError::StorageWriteFailed(Box::new(err)),
            StorageError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ReadFailed(msg) => AppError::Internal(msg),
        };
        HttpAppError(app)
    }
}

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        let app = match err {
            ValidationError::InvalidFileType { extension, .. } => {
                AppError::InvalidFileType(format!("'{}'", extension))
            }
            ValidationError::FileTooLarge { max, .. } => AppError::PayloadTooLarge(format!(
                "File size exceeds maximum allowed size of {} MB",
                max / 1024 / 1024
            )),
        };
        HttpAppError(app)
    }
}

impl From<AnalysisError> for HttpAppError {
    fn from(err: AnalysisError) -> Self {
        let app = match err {
            AnalysisError::Spawn { .. } => AppError::AnalysisSpawnFailed(Box::new(err)),
            AnalysisError::TimedOut { .. } => AppError::AnalysisTimedOut(Box::new(err)),
            AnalysisError::Io { .. } | AnalysisError::NonZeroExit { .. } => {
                AppError::AnalysisFailed(Box::new(err))
            }
        };
        HttpAppError(app)
    }
}

impl From<ResultParseError> for HttpAppError {
    fn from(err: ResultParseError) -> Self {
        HttpAppError(AppError::ResultParseFailed(Box::new(err)))
    }
}

impl From<PipelineError> for HttpAppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => e.into(),
            PipelineError::Storage(e) => e.into(),
            PipelineError::Analysis(e) => e.into(),
            PipelineError::Parse(e) => e.into(),
        }
    }
}
