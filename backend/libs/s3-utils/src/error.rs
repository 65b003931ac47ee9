//! Error types for S3 operations.

use thiserror::Error;

pub type S3Result<T> = Result<T, S3Error>;

/// Failures surfaced by [`crate::S3Operations`].
#[derive(Error, Debug)]
pub enum S3Error {
    /// The object key does not exist in the bucket
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The store could not be reached or rejected the request
    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    /// The request reached the store but the body could not be streamed
    #[error("Object store I/O error: {0}")]
    Io(String),
}
