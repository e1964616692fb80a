//! Media loading seam.
//!
//! Image references are opaque strings; the host decides what "loaded" means.
//! The engine only orders and times the reveal.

use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    Loaded,
    Failed,
}

#[async_trait(?Send)]
pub trait MediaLoader {
    async fn load(&self, src: &str) -> MediaStatus;
}

/// Resolves image references as files relative to the story's directory.
#[derive(Debug, Clone)]
pub struct FsMediaLoader {
    root: PathBuf,
}

impl FsMediaLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsMediaLoader { root: root.into() }
    }
}

#[async_trait(?Send)]
impl MediaLoader for FsMediaLoader {
    async fn load(&self, src: &str) -> MediaStatus {
        if self.root.join(src).is_file() {
            MediaStatus::Loaded
        } else {
            tracing::debug!(src, root = %self.root.display(), "image not found");
            MediaStatus::Failed
        }
    }
}
