//! Transient, revocable references to in-memory blobs
//!
//! A handle is what a renderer uses as an image source or a save target. The
//! party that creates a handle owns its release; everyone else receives it by
//! value and must not revoke it.

use crate::types::Blob;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle to a blob registered in an [`ObjectUrlStore`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live object URLs
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct ObjectUrlStore {
    entries: Arc<Mutex<HashMap<ObjectUrl, Blob>>>,
}

impl ObjectUrlStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ObjectUrl, Blob>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a blob and return a fresh handle to it
    pub fn create(&self, blob: &Blob) -> ObjectUrl {
        let url = ObjectUrl(format!("blob:bgremove/{}", uuid::Uuid::new_v4()));
        self.lock().insert(url.clone(), blob.clone());
        tracing::trace!(url = %url, bytes = blob.len(), "object URL created");
        url
    }

    /// Look up the blob behind a handle
    #[must_use]
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.lock().get(url).cloned()
    }

    /// Release a handle
    ///
    /// Returns `false` when the handle was not live; revoking twice is harmless.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.lock().remove(url).is_some();
        if removed {
            tracing::trace!(url = %url, "object URL revoked");
        }
        removed
    }

    #[must_use]
    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.lock().contains_key(url)
    }

    /// Number of handles not yet revoked
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }
}

impl fmt::Debug for ObjectUrlStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectUrlStore")
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_resolve_revoke() {
        let store = ObjectUrlStore::new();
        let blob = Blob::new(vec![7u8; 4], "image/png");

        let url = store.create(&blob);
        assert!(url.as_str().starts_with("blob:bgremove/"));
        assert_eq!(store.resolve(&url), Some(blob));
        assert_eq!(store.live_count(), 1);

        assert!(store.revoke(&url));
        assert!(!store.is_live(&url));
        assert_eq!(store.resolve(&url), None);
        assert!(!store.revoke(&url));
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_handles_are_unique() {
        let store = ObjectUrlStore::new();
        let blob = Blob::new(vec![1u8], "image/png");
        let a = store.create(&blob);
        let b = store.create(&blob);
        assert_ne!(a, b);
        assert_eq!(store.live_count(), 2);
    }

    #[test]
    fn test_clones_share_registry() {
        let store = ObjectUrlStore::new();
        let other = store.clone();
        let url = store.create(&Blob::new(vec![1u8], "image/png"));
        assert!(other.is_live(&url));
        other.revoke(&url);
        assert_eq!(store.live_count(), 0);
    }
}
