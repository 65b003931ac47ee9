/// S3 configuration shared across services
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Custom endpoint (MinIO, or `https://storage.googleapis.com` for GCS interop)
    pub endpoint: Option<String>,
    /// Whether to use path-style URLs (false = virtual-hosted-style)
    pub path_style: bool,
    /// Prefix prepended to every object key
    pub key_prefix: String,
}

impl S3Config {
    /// Load S3 configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bucket: std::env::var("S3_BUCKET")
                .or_else(|_| std::env::var("GCS_BUCKET_NAME"))
                .unwrap_or_else(|_| "image-uploads".to_string()),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: std::env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
            path_style: std::env::var("S3_PATH_STYLE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            key_prefix: std::env::var("S3_KEY_PREFIX").unwrap_or_default(),
        }
    }

    /// Full object key for a caller supplied name
    pub fn object_key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }
}
