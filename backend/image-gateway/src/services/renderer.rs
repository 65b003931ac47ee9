//! Result staging and HTML rendering
//!
//! Pulls the processed object named by a worker reply out of the blob store,
//! writes it into the local render directory under a unique name, and
//! renders the fragment the upload page swaps in.

use super::storage::{BlobStore, StoreError};
use crate::models::ReplyMessage;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to stage processed image: {0}")]
    Io(#[from] io::Error),
}

/// Where staged results live and how clients reach them.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub render_dir: PathBuf,
    pub public_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            render_dir: PathBuf::from("./static/images"),
            public_prefix: "/images".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResultRenderer {
    config: RenderConfig,
}

impl ResultRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn render_dir(&self) -> &Path {
        &self.config.render_dir
    }

    /// Fetch the reply's object, stage it, and return the HTML fragment.
    pub async fn render(
        &self,
        store: &dyn BlobStore,
        reply: &ReplyMessage,
    ) -> Result<String, RenderError> {
        let bytes = store.get(&reply.result_locator).await?;

        let file_name = staged_file_name(&reply.result_locator);
        tokio::fs::create_dir_all(&self.config.render_dir).await?;
        tokio::fs::write(self.config.render_dir.join(&file_name), &bytes).await?;

        info!(
            result_locator = %reply.result_locator,
            staged = %file_name,
            size = bytes.len(),
            "Processed image staged"
        );

        Ok(self.fragment(&file_name))
    }

    pub fn fragment(&self, file_name: &str) -> String {
        format!(
            "<div><img src='{}/{}' class='uploaded-image' alt='Processed Image'></div>",
            self.config.public_prefix.trim_end_matches('/'),
            file_name
        )
    }
}

/// `processed_image_<UTC timestamp>_<8 hex>.<ext>`, extension from the locator
fn staged_file_name(locator: &str) -> String {
    let ext = Path::new(locator)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "png".to_string());

    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "processed_image_{}_{}.{}",
        chrono::Utc::now().format("%Y%m%d%H%M%S"),
        &suffix[..8],
        ext
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::InMemoryBlobStore;
    use bytes::Bytes;

    #[test]
    fn test_staged_file_name_keeps_extension() {
        let name = staged_file_name("results/bar.JPG");
        assert!(name.starts_with("processed_image_"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_staged_file_name_defaults_to_png() {
        assert!(staged_file_name("bar").ends_with(".png"));
        assert!(staged_file_name("bar.p?g").ends_with(".png"));
    }

    #[test]
    fn test_staged_file_names_are_unique() {
        assert_ne!(staged_file_name("a.png"), staged_file_name("a.png"));
    }

    #[test]
    fn test_fragment_format() {
        let renderer = ResultRenderer::new(RenderConfig {
            render_dir: PathBuf::from("/tmp"),
            public_prefix: "/images/".to_string(),
        });
        assert_eq!(
            renderer.fragment("x.png"),
            "<div><img src='/images/x.png' class='uploaded-image' alt='Processed Image'></div>"
        );
    }

    #[tokio::test]
    async fn test_render_stages_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryBlobStore::new();
        store
            .put(Bytes::from_static(b"processed"), "bar.png")
            .await
            .unwrap();

        let renderer = ResultRenderer::new(RenderConfig {
            render_dir: dir.path().join("images"),
            public_prefix: "/images".to_string(),
        });
        let html = renderer
            .render(&store, &ReplyMessage::new("bar.png"))
            .await
            .unwrap();

        let staged: Vec<_> = std::fs::read_dir(dir.path().join("images"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(staged.len(), 1);
        assert_eq!(std::fs::read(&staged[0]).unwrap(), b"processed");

        let file_name = staged[0].file_name().unwrap().to_str().unwrap();
        assert!(html.contains(&format!("/images/{file_name}")));
    }

    #[tokio::test]
    async fn test_render_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryBlobStore::new();
        let renderer = ResultRenderer::new(RenderConfig {
            render_dir: dir.path().to_path_buf(),
            public_prefix: "/images".to_string(),
        });

        let err = renderer
            .render(&store, &ReplyMessage::new("missing.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Store(StoreError::NotFound(_))));
    }
}
