use std::path::PathBuf;
use tracing::info;

/// Storage for synthesized audio artifacts. `put` returns a stable
/// reference that is recorded on the job's steps.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> anyhow::Result<String>;
}

/// Filesystem-backed artifact store. Keys become paths under the root
/// directory; the returned ref is the absolute path.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        info!("artifact stored: {} ({} bytes)", path.display(), bytes.len());
        Ok(path.display().to_string())
    }
}
