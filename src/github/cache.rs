use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// The last validated representation of one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub etag: String,
    pub body: String,
}

/// URL -> last ETag (and the body it validated) seen from upstream.
///
/// One entry per URL, last write wins, never evicted. The lock is only held
/// for the map operation itself, never across a request.
#[derive(Debug, Default)]
pub struct RevalidationCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl RevalidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn etag(&self, url: &str) -> Option<String> {
        self.read(url).map(|entry| entry.etag)
    }

    pub fn body(&self, url: &str) -> Option<String> {
        self.read(url).map(|entry| entry.body)
    }

    pub fn store(&self, url: &str, etag: String, body: String) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(url.to_string(), CachedResponse { etag, body });
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn read(&self, url: &str) -> Option<CachedResponse> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }
}
