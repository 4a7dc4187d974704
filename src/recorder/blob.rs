//! Recorded blobs and in-memory object URLs

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Finished recording bytes with their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Maps `blob:<origin>/<uuid>` URLs to blobs for the lifetime of the registry
#[derive(Debug, Clone)]
pub struct ObjectUrlRegistry {
    origin: String,
    entries: Arc<RwLock<HashMap<String, Arc<Blob>>>>,
}

impl ObjectUrlRegistry {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register `blob` and return its URL
    pub fn create(&self, blob: Blob) -> String {
        let url = format!("blob:{}/{}", self.origin, Uuid::new_v4());
        tracing::debug!("Created object URL {} ({} bytes)", url, blob.size());
        self.entries.write().insert(url.clone(), Arc::new(blob));
        url
    }

    pub fn resolve(&self, url: &str) -> Option<Arc<Blob>> {
        self.entries.read().get(url).cloned()
    }

    /// Forget a URL. Returns false if it was unknown.
    pub fn revoke(&self, url: &str) -> bool {
        self.entries.write().remove(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for ObjectUrlRegistry {
    fn default() -> Self {
        Self::new("snappy")
    }
}
