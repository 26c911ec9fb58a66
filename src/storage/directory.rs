use super::BlobStore;
use crate::error::{CreateDataDirSnafu, FeebookResult, ReadBlobSnafu, WriteBlobSnafu};
use async_trait::async_trait;
use snafu::ResultExt;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs;

/// One file per key, relative to `root`.
#[derive(Debug, Clone)]
pub struct DirectoryBlobStore {
    root: PathBuf,
}

impl DirectoryBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> FeebookResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .context(CreateDataDirSnafu { path: root.clone() })?;
        info!(root = %root.display(), "Using data directory");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

#[async_trait]
impl BlobStore for DirectoryBlobStore {
    async fn get(&self, key: &str) -> FeebookResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context(ReadBlobSnafu { key }),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> FeebookResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context(CreateDataDirSnafu { path: parent })?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, bytes).await.context(WriteBlobSnafu { key })?;
        fs::rename(&tmp, &path)
            .await
            .context(WriteBlobSnafu { key })?;

        debug!(%key, "Wrote blob");
        Ok(())
    }
}
