/// S3 operations for image upload and download
use crate::config::S3Config;
use crate::error::{S3Error, S3Result};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct S3Operations {
    client: Arc<Client>,
    config: S3Config,
}

impl S3Operations {
    pub fn new(client: Arc<Client>, config: S3Config) -> Self {
        Self { client, config }
    }

    /// Upload an object under `name`, returning the name as its locator
    pub async fn put_object(&self, name: &str, body: Bytes, content_type: &str) -> S3Result<String> {
        let key = self.config.object_key(name);
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(unavailable)?;

        debug!(bucket = %self.config.bucket, key = %key, size, "Object uploaded");
        Ok(name.to_string())
    }

    /// Download the object stored under `name`
    pub async fn get_object(&self, name: &str) -> S3Result<Bytes> {
        let key = self.config.object_key(name);

        let response = match self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => {
                return Err(S3Error::NotFound(key));
            }
            Err(err) => return Err(unavailable(err)),
        };

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| S3Error::Io(format!("Failed to read object {key}: {e}")))?;

        Ok(body.into_bytes())
    }

    /// Check the bucket is reachable
    pub async fn head_bucket(&self) -> S3Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }
}

fn unavailable<E, R>(err: SdkError<E, R>) -> S3Error
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    S3Error::Unavailable(DisplayErrorContext(&err).to_string())
}
