//! Shared HTTP error body for Nova services.
//!
//! Every service renders failures with the same JSON shape so clients can
//! route on `type` and `code` without parsing messages.

use serde::{Deserialize, Serialize};

/// JSON error body returned by every HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Reason phrase for the status ("Bad Request", "Request Timeout", ...)
    pub error: String,

    /// Human readable description
    pub message: String,

    /// HTTP status code
    pub status: u16,

    /// Coarse error category, one of [`error_types`]
    #[serde(rename = "type")]
    pub error_type: String,

    /// Stable machine readable code, one of [`error_codes`]
    pub code: String,

    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Stable error codes.
pub mod error_codes {
    // Upload validation
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const NO_FILES_UPLOADED: &str = "NO_FILES_UPLOADED";
    pub const UPLOAD_TOO_LARGE: &str = "UPLOAD_TOO_LARGE";

    // Processing pipeline
    pub const MEDIA_NOT_FOUND: &str = "MEDIA_NOT_FOUND";
    pub const MEDIA_PROCESSING_TIMEOUT: &str = "MEDIA_PROCESSING_TIMEOUT";
    pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
    pub const BROKER_UNAVAILABLE: &str = "BROKER_UNAVAILABLE";
    pub const STORAGE_UNAVAILABLE: &str = "STORAGE_UNAVAILABLE";
    pub const STORAGE_IO_ERROR: &str = "STORAGE_IO_ERROR";

    // System
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
}

/// Error categories.
pub mod error_types {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const NOT_FOUND_ERROR: &str = "not_found_error";
    pub const TIMEOUT_ERROR: &str = "timeout_error";
    pub const SERVER_ERROR: &str = "server_error";
    pub const SERVICE_UNAVAILABLE_ERROR: &str = "service_unavailable_error";
}
