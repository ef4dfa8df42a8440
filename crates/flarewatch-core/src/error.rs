//! Error types module
//!
//! All failures that can reach an HTTP caller are unified under `AppError`.
//! Lower layers (storage, processing) keep their own error enums and are
//! converted into `AppError` at the API boundary. Backend failures keep the
//! lower-layer error as their source so the full chain reaches the log.

/// Lower-layer error kept as the source of a backend failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code, used in logs only
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details must stay out of the response body
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable")]
    StorageUnavailable(#[source] BoxError),

    #[error("Storage write failed")]
    StorageWriteFailed(#[source] BoxError),

    #[error("Failed to start analysis program")]
    AnalysisSpawnFailed(#[source] BoxError),

    #[error("Analysis program failed")]
    AnalysisFailed(#[source] BoxError),

    #[error("Analysis program timed out")]
    AnalysisTimedOut(#[source] BoxError),

    #[error("Failed to parse analysis output")]
    ResultParseFailed(#[source] BoxError),

    #[error("Failed to write result CSV")]
    CsvWriteFailed(#[source] BoxError),

    #[error("Failed to encode response")]
    ResponseEncodingFailed(#[source] BoxError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Static metadata for each variant: (http_status, error_code, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::InvalidFileType(_) => (400, "INVALID_FILE_TYPE", false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::PayloadTooLarge(_) => (413, "PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::StorageUnavailable(_) => (500, "STORAGE_UNAVAILABLE", true, LogLevel::Error),
        AppError::StorageWriteFailed(_) => (500, "STORAGE_WRITE_FAILED", true, LogLevel::Error),
        AppError::AnalysisSpawnFailed(_) => (500, "ANALYSIS_SPAWN_FAILED", true, LogLevel::Error),
        AppError::AnalysisFailed(_) => (500, "ANALYSIS_FAILED", true, LogLevel::Error),
        AppError::AnalysisTimedOut(_) => (500, "ANALYSIS_TIMED_OUT", true, LogLevel::Error),
        AppError::ResultParseFailed(_) => (500, "RESULT_PARSE_FAILED", true, LogLevel::Error),
        AppError::CsvWriteFailed(_) => (500, "CSV_WRITE_FAILED", true, LogLevel::Error),
        AppError::ResponseEncodingFailed(_) => {
            (500, "RESPONSE_ENCODING_FAILED", true, LogLevel::Error)
        }
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name for log output
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidFileType(_) => "InvalidFileType",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::NotFound(_) => "NotFound",
            AppError::StorageUnavailable(_) => "StorageUnavailable",
            AppError::StorageWriteFailed(_) => "StorageWriteFailed",
            AppError::AnalysisSpawnFailed(_) => "AnalysisSpawnFailed",
            AppError::AnalysisFailed(_) => "AnalysisFailed",
            AppError::AnalysisTimedOut(_) => "AnalysisTimedOut",
            AppError::ResultParseFailed(_) => "ResultParseFailed",
            AppError::CsvWriteFailed(_) => "CsvWriteFailed",
            AppError::ResponseEncodingFailed(_) => "ResponseEncodingFailed",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidFileType(_) => "Invalid file type".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::StorageUnavailable(_) => "Unable to create uploads directory".to_string(),
            AppError::StorageWriteFailed(_) => "Error saving the file".to_string(),
            AppError::AnalysisSpawnFailed(_) => "Failed to start analysis program".to_string(),
            AppError::AnalysisFailed(_) => "Analysis program finished with error".to_string(),
            AppError::AnalysisTimedOut(_) => "Analysis program timed out".to_string(),
            AppError::ResultParseFailed(_) => "Failed to parse analysis output".to_string(),
            AppError::CsvWriteFailed(_) => "Failed to save result to CSV".to_string(),
            AppError::ResponseEncodingFailed(_) => "Failed to send result as JSON".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}
