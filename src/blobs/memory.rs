use crate::prelude::*;

use crate::base::record::BlobRef;
use crate::blobs::{BlobStore, check_key};
use std::collections::HashMap;

const MEMORY_SCHEME: &str = "mem://";

/// Keeps blobs in process memory. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: Option<&str>) -> Result<BlobRef> {
        check_key(key)?;
        self.blobs.lock().unwrap().insert(key.to_string(), data);
        Ok(BlobRef(format!("{MEMORY_SCHEME}{key}")))
    }

    async fn get(&self, blob_ref: &BlobRef) -> Result<Bytes> {
        let key = blob_ref
            .as_str()
            .strip_prefix(MEMORY_SCHEME)
            .ok_or_else(|| Error::blob(format!("not a memory blob reference: {blob_ref}")))?;
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::blob(format!("blob not found: {blob_ref}")))
    }
}
