use crate::prelude::*;

use crate::base::record::BlobRef;
use crate::blobs::{BlobStore, check_key};
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Stores blobs as files below a root directory.
///
/// References are `file://` URLs with absolute paths; `get` refuses any
/// reference that resolves outside the root.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| {
            Error::blob(format!("failed to create blob root {}: {e}", root.display()))
        })?;
        let root = root.canonicalize().map_err(|e| {
            Error::blob(format!("failed to resolve blob root {}: {e}", root.display()))
        })?;
        info!(root = %root.display(), "local blob store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for_ref(&self, blob_ref: &BlobRef) -> Result<PathBuf> {
        let path = blob_ref
            .as_str()
            .strip_prefix(FILE_SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| Error::blob(format!("not a file blob reference: {blob_ref}")))?;
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| Error::blob(format!("blob reference outside store root: {blob_ref}")))?;
        let key = relative.to_string_lossy().replace('\\', "/");
        check_key(&key)?;
        Ok(path)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: Option<&str>) -> Result<BlobRef> {
        check_key(key)?;
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::blob(format!("failed to create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| Error::blob(format!("failed to write {}: {e}", path.display())))?;
        debug!(path = %path.display(), size = data.len(), "blob written");
        Ok(BlobRef(format!("{FILE_SCHEME}{}", path.display())))
    }

    async fn get(&self, blob_ref: &BlobRef) -> Result<Bytes> {
        let path = self.path_for_ref(blob_ref)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::blob(format!("failed to read {}: {e}", path.display())))?;
        Ok(Bytes::from(data))
    }
}
