//! Byte storage for transferred files.
//!
//! The relay never inspects blob content. It hands bytes to a [`BlobStore`]
//! under a key it chose and persists the returned [`BlobRef`] in the record.

use crate::prelude::*;

use crate::base::record::BlobRef;

pub mod local;
pub mod memory;
pub mod s3;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return a reference that `get` accepts.
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<BlobRef>;

    async fn get(&self, blob_ref: &BlobRef) -> Result<Bytes>;
}

/// Reject keys that could escape a prefix or address a directory.
pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return Err(Error::blob(format!("invalid blob key `{key}`")));
    }
    if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(Error::blob(format!("invalid blob key `{key}`")));
    }
    Ok(())
}
