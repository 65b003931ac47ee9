/// Business logic behind the upload endpoint
///
/// - `job_builder`: upload locator → job descriptor
/// - `correlator`: FIFO pairing of worker replies with waiting requests
/// - `storage`: blob store seam (S3 and in-memory)
/// - `renderer`: result staging and HTML fragment
/// - `pipeline`: the per-file flow tying the above to the broker
pub mod correlator;
pub mod job_builder;
pub mod pipeline;
pub mod renderer;
pub mod storage;

pub use correlator::{CorrelationError, Dispatch, PendingReply, ResponseCorrelator, SlotId};
pub use job_builder::JobDescriptorBuilder;
pub use pipeline::{UploadPipeline, UploadedFile};
pub use renderer::{RenderConfig, RenderError, ResultRenderer};
pub use storage::{BlobStore, InMemoryBlobStore, S3BlobStore, StoreError};
