//! Per-file upload pipeline
//!
//! store → build job → register slot → publish → wait → fetch and render

use super::correlator::ResponseCorrelator;
use super::job_builder::JobDescriptorBuilder;
use super::renderer::ResultRenderer;
use super::storage::BlobStore;
use crate::error::Result;
use crate::kafka::BrokerGateway;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

/// One file taken from the upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<dyn BlobStore>,
    gateway: Arc<BrokerGateway>,
    correlator: Arc<ResponseCorrelator>,
    jobs: JobDescriptorBuilder,
    renderer: ResultRenderer,
}

impl UploadPipeline {
    pub fn new(
        store: Arc<dyn BlobStore>,
        gateway: Arc<BrokerGateway>,
        correlator: Arc<ResponseCorrelator>,
        jobs: JobDescriptorBuilder,
        renderer: ResultRenderer,
    ) -> Self {
        Self {
            store,
            gateway,
            correlator,
            jobs,
            renderer,
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub fn correlator(&self) -> &Arc<ResponseCorrelator> {
        &self.correlator
    }

    /// Run one file through the worker and return its HTML fragment.
    pub async fn process(&self, file: UploadedFile) -> Result<String> {
        let locator = self.store.put(file.bytes, &file.file_name).await?;
        debug!(file_name = %file.file_name, locator = %locator, "Stored upload");

        let job = self.jobs.build(&locator);

        // The slot must exist before the job is visible to the worker.
        let pending = self.correlator.register()?;
        self.gateway.publish(&job).await?;

        debug!(slot = %pending.slot(), image = %locator, "Waiting for worker reply");
        let reply = pending.wait().await?;
        info!(
            image = %locator,
            result_locator = %reply.result_locator,
            "Received worker reply"
        );

        Ok(self.renderer.render(self.store.as_ref(), &reply).await?)
    }
}
