//! Filesystem-backed content store for fetched documents
//!
//! Artifacts are keyed by [`artifact_key`](tolldata_common::content_address::artifact_key)
//! so concurrent workers never contend on the same file within a sweep.
//! Writes overwrite silently; a later sweep replacing an artifact is normal.

use std::path::{Path, PathBuf};
use tolldata_common::Result;
use tracing::debug;

/// A successfully persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub path: PathBuf,
    pub size: u64,
}

/// Directory of content-addressed PDF artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an artifact with this key lives at.
    pub fn artifact_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.pdf", key))
    }

    /// Write the artifact, replacing any previous content under the key.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<StoredArtifact> {
        let path = self.artifact_path(key);
        tokio::fs::write(&path, bytes).await?;

        debug!(path = %path.display(), bytes = bytes.len(), "stored artifact");

        Ok(StoredArtifact {
            path,
            size: bytes.len() as u64,
        })
    }
}
