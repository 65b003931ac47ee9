/// Configuration management for image-gateway
///
/// Loads configuration from environment variables with sensible defaults.
use s3_utils::S3Config;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub kafka: KafkaConfig,
    pub s3: S3Config,
    pub upload: UploadConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

#[derive(Clone, Debug)]
pub struct KafkaConfig {
    pub brokers: String,
    pub job_topic: String,
    pub reply_topic: String,
    pub client_id: String,
    pub consumer_group: String,
}

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub max_files: usize,
    pub max_file_bytes: usize,
    pub reply_timeout: Duration,
    pub render_dir: PathBuf,
    pub public_prefix: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_file_bytes: 5 * 1024 * 1024,
            reply_timeout: Duration::from_secs(30),
            render_dir: PathBuf::from("./static/images"),
            public_prefix: "/images".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let upload_defaults = UploadConfig::default();

        Config {
            app: AppConfig {
                host: env_or("IMAGE_GATEWAY_HOST", "0.0.0.0"),
                port: env_parse("IMAGE_GATEWAY_PORT", 8080),
                env: env_or("APP_ENV", "development"),
            },
            kafka: KafkaConfig {
                brokers: env_or("KAFKA_BROKER_ADDR", "localhost:9092"),
                job_topic: env_or("KAFKA_PRODUCE_TOPIC", "image-jobs"),
                reply_topic: env_or("KAFKA_CONSUME_TOPIC", "image-results"),
                client_id: env_or("KAFKA_CLIENT_ID", "producer-1"),
                consumer_group: env_or("KAFKA_CONSUMER_GROUP", "image-gateway"),
            },
            s3: S3Config::from_env(),
            upload: UploadConfig {
                max_files: env_parse("UPLOAD_MAX_FILES", upload_defaults.max_files),
                max_file_bytes: env_parse("UPLOAD_MAX_FILE_BYTES", upload_defaults.max_file_bytes),
                reply_timeout: Duration::from_secs(env_parse(
                    "REPLY_TIMEOUT_SECS",
                    upload_defaults.reply_timeout.as_secs(),
                )),
                render_dir: std::env::var("RENDER_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(upload_defaults.render_dir),
                public_prefix: std::env::var("RENDER_PUBLIC_PREFIX")
                    .unwrap_or(upload_defaults.public_prefix),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self.app.env.to_ascii_lowercase().as_str(),
            "production" | "staging"
        )
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
