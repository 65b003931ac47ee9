/// Error types for image-gateway
///
/// Component errors (store, broker, correlator, renderer) convert into
/// `AppError`, which renders the shared JSON error body.
use crate::kafka::BrokerError;
use crate::services::{CorrelationError, RenderError, StoreError};
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use error_types::{error_codes, error_types as kinds, ErrorResponse};
use std::time::Duration;
use thiserror::Error;

/// Result type for image-gateway operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed form or too many files
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The form carried no image files
    #[error("No files uploaded")]
    NoFiles,

    /// A file exceeds the per-file limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// No worker reply before the deadline
    #[error("Timed out after {0:?} waiting for processed image")]
    Timeout(Duration),

    /// The service is shutting down
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    fn kind_and_code(&self) -> (&'static str, &'static str) {
        match self {
            AppError::BadRequest(_) => (kinds::VALIDATION_ERROR, error_codes::INVALID_REQUEST),
            AppError::NoFiles => (kinds::VALIDATION_ERROR, error_codes::NO_FILES_UPLOADED),
            AppError::PayloadTooLarge(_) => (kinds::VALIDATION_ERROR, error_codes::UPLOAD_TOO_LARGE),
            AppError::Serialization(_) => (kinds::SERVER_ERROR, error_codes::SERIALIZATION_ERROR),
            AppError::BrokerUnavailable(_) => (kinds::SERVER_ERROR, error_codes::BROKER_UNAVAILABLE),
            AppError::StoreUnavailable(_) => (kinds::SERVER_ERROR, error_codes::STORAGE_UNAVAILABLE),
            AppError::Io(_) => (kinds::SERVER_ERROR, error_codes::STORAGE_IO_ERROR),
            AppError::NotFound(_) => (kinds::NOT_FOUND_ERROR, error_codes::MEDIA_NOT_FOUND),
            AppError::Timeout(_) => (kinds::TIMEOUT_ERROR, error_codes::MEDIA_PROCESSING_TIMEOUT),
            AppError::ServiceUnavailable(_) => (
                kinds::SERVICE_UNAVAILABLE_ERROR,
                error_codes::SERVICE_UNAVAILABLE,
            ),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::NoFiles => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            // A missing result object is the pipeline's fault, not the client's.
            AppError::Serialization(_)
            | AppError::BrokerUnavailable(_)
            | AppError::StoreUnavailable(_)
            | AppError::Io(_)
            | AppError::NotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (error_type, code) = self.kind_and_code();

        let response = ErrorResponse::new(
            status.canonical_reason().unwrap_or("Error"),
            &self.to_string(),
            status.as_u16(),
            error_type,
            code,
        );

        HttpResponse::build(status).json(response)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => AppError::NotFound(key),
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::Io(msg) => AppError::Io(msg),
        }
    }
}

impl From<BrokerError> for AppError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Serialization(e) => AppError::Serialization(e.to_string()),
            BrokerError::Unavailable(msg) => AppError::BrokerUnavailable(msg),
            BrokerError::Closed | BrokerError::AlreadySubscribed => {
                AppError::ServiceUnavailable(err.to_string())
            }
        }
    }
}

impl From<CorrelationError> for AppError {
    fn from(err: CorrelationError) -> Self {
        match err {
            CorrelationError::Timeout(after) => AppError::Timeout(after),
            CorrelationError::Closed => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Store(e) => e.into(),
            RenderError::Io(e) => AppError::Io(e.to_string()),
        }
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Error parsing multipart form: {err}"))
    }
}
