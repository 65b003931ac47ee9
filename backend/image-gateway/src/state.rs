use crate::config::UploadConfig;
use crate::services::UploadPipeline;

/// Limits applied to one multipart upload.
#[derive(Clone, Copy, Debug)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_bytes: usize,
}

impl From<&UploadConfig> for UploadLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_files: config.max_files,
            max_file_bytes: config.max_file_bytes,
        }
    }
}

/// Shared state handed to every HTTP worker.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: UploadPipeline,
    pub limits: UploadLimits,
}

impl AppState {
    pub fn new(pipeline: UploadPipeline, limits: UploadLimits) -> Self {
        Self { pipeline, limits }
    }
}
