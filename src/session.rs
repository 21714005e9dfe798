//! Transient state of one upload-to-download cycle

use crate::{
    object_url::{ObjectUrl, ObjectUrlStore},
    types::{Blob, ImageFile},
};

/// Current file, its result, and the two preview handles
///
/// Owned by the orchestrator. At most one original/result handle pair is live
/// at a time; both are released before a new pair is created and on clear.
#[derive(Debug, Default)]
pub struct SessionState {
    current_file: Option<ImageFile>,
    result: Option<Blob>,
    original_url: Option<ObjectUrl>,
    result_url: Option<ObjectUrl>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle for `file`
    ///
    /// Releases every handle of the previous cycle and drops its result.
    pub fn begin(&mut self, file: ImageFile, original_url: ObjectUrl, urls: &ObjectUrlStore) {
        self.clear(urls);
        self.current_file = Some(file);
        self.original_url = Some(original_url);
    }

    /// Record the processed result and its preview handle
    ///
    /// A previous result handle, if any, is released first.
    pub fn set_result(&mut self, result: Blob, result_url: ObjectUrl, urls: &ObjectUrlStore) {
        if let Some(previous) = self.result_url.take() {
            urls.revoke(&previous);
        }
        self.result = Some(result);
        self.result_url = Some(result_url);
    }

    /// Revoke both preview handles
    pub fn release_urls(&mut self, urls: &ObjectUrlStore) {
        for url in [self.original_url.take(), self.result_url.take()]
            .into_iter()
            .flatten()
        {
            urls.revoke(&url);
        }
    }

    /// Release handles and forget the file and result
    pub fn clear(&mut self, urls: &ObjectUrlStore) {
        self.release_urls(urls);
        self.current_file = None;
        self.result = None;
    }

    #[must_use]
    pub fn current_file(&self) -> Option<&ImageFile> {
        self.current_file.as_ref()
    }

    #[must_use]
    pub fn result(&self) -> Option<&Blob> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn original_url(&self) -> Option<&ObjectUrl> {
        self.original_url.as_ref()
    }

    #[must_use]
    pub fn result_url(&self) -> Option<&ObjectUrl> {
        self.result_url.as_ref()
    }

    /// True when nothing is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current_file.is_none()
            && self.result.is_none()
            && self.original_url.is_none()
            && self.result_url.is_none()
    }
}
