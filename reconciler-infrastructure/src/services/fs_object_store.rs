use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use reconciler_domain::ObjectStore;

/// Buckets are directories under `root`; object keys are relative paths inside them.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|part| !matches!(part, Component::Normal(_)));
        if bucket.is_empty() || bucket.contains(['/', '\\']) || key.is_empty() || escapes {
            return Err(anyhow!("invalid object location {}/{}", bucket, key));
        }
        Ok(self.root.join(bucket).join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, source: &Path) -> Result<()> {
        let target = self.object_path(bucket, key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let staging = target.with_extension("partial");
        fs::copy(source, &staging)
            .await
            .with_context(|| format!("failed to stage {}", source.display()))?;
        fs::rename(&staging, &target).await?;
        debug!(path = %target.display(), "stored object");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let target = self.object_path(bucket, key)?;
        fs::read(&target)
            .await
            .with_context(|| format!("failed to read object {}/{}", bucket, key))
    }
}
