//! Inference backend abstraction and the adapter the orchestrator calls

use crate::{
    error::{AppError, Result},
    progress::ProgressEvent,
    types::{Blob, PNG_MIME},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Progress callback handed to a backend: `(key, current, total)`
pub type ProgressFn<'a> = dyn Fn(&str, u64, u64) + Send + Sync + 'a;

/// Trait for background removal engines
///
/// An engine is a black box: it receives the input image and returns a PNG
/// whose alpha channel carries the foreground mask. It may call `progress` any
/// number of times, from any thread, while it works.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// Remove the background of `input`
    ///
    /// # Errors
    /// - Model fetch failures
    /// - Undecodable input images
    /// - Execution failures (out of memory, crashed engine)
    async fn remove_background(&self, input: &Blob, progress: &ProgressFn<'_>) -> Result<Blob>;
}

/// Calls a backend and reshapes its progress callbacks into [`ProgressEvent`]s
///
/// Events are relayed as they arrive; nothing is throttled, merged or reordered.
#[derive(Clone)]
pub struct InferenceAdapter {
    backend: Arc<dyn InferenceBackend>,
}

impl InferenceAdapter {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run the backend on `input`
    ///
    /// # Errors
    /// Any backend failure, or a result that is not a PNG, becomes
    /// [`AppError::Inference`].
    pub async fn process<F>(&self, input: &Blob, on_progress: F) -> Result<Blob>
    where
        F: Fn(ProgressEvent) + Send + Sync,
    {
        let relay = move |key: &str, current: u64, total: u64| {
            on_progress(ProgressEvent::new(key, current, total));
        };

        let output = self
            .backend
            .remove_background(input, &relay)
            .await
            .map_err(|e| match e {
                AppError::Inference(_) => e,
                other => AppError::inference_error_with_engine(
                    self.backend.name(),
                    "Background removal",
                    &other.to_string(),
                ),
            })?;

        match image::guess_format(output.bytes()) {
            Ok(image::ImageFormat::Png) => Ok(output.with_mime_type(PNG_MIME)),
            Ok(other) => Err(AppError::inference(format!(
                "{} returned {:?} instead of PNG",
                self.backend.name(),
                other
            ))),
            Err(_) => Err(AppError::inference(format!(
                "{} returned {} bytes of unrecognised data",
                self.backend.name(),
                output.len()
            ))),
        }
    }
}

impl std::fmt::Debug for InferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceAdapter")
            .field("backend", &self.backend.name())
            .finish()
    }
}
