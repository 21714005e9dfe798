//! Scripted backend for tests and demos
//!
//! Replays a fixed list of progress events, then resolves with a prepared blob
//! or fails with a message. Lets the orchestrator be exercised without invoking
//! a real model.

use crate::{
    error::{AppError, Result},
    inference::{InferenceBackend, ProgressFn},
    progress::ProgressEvent,
    types::{Blob, PNG_MIME},
};
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
enum Outcome {
    Succeed(Blob),
    Fail(String),
}

/// Backend whose behavior is fixed up front
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    progress: Vec<ProgressEvent>,
    outcome: Outcome,
    step_delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    /// Input sizes of every call, for verification in tests
    call_history: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedBackend {
    /// A backend that resolves with `result`
    #[must_use]
    pub fn succeeding(result: Blob) -> Self {
        Self {
            progress: Vec::new(),
            outcome: Outcome::Succeed(result),
            step_delay: None,
            gate: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A backend that fails with `message`
    #[must_use]
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            outcome: Outcome::Fail(message.into()),
            ..Self::succeeding(Blob::new(Vec::new(), PNG_MIME))
        }
    }

    /// Progress events to emit before resolving
    #[must_use]
    pub fn with_progress<I: IntoIterator<Item = ProgressEvent>>(mut self, events: I) -> Self {
        self.progress = events.into_iter().collect();
        self
    }

    /// Sleep between progress events
    #[must_use]
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    /// Hold every call after its progress events until [`Self::release`] is called
    #[must_use]
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Let one held call resolve
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Number of calls made so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_history.lock().unwrap().len()
    }

    /// Input size of every call made so far
    #[must_use]
    pub fn call_history(&self) -> Vec<usize> {
        self.call_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn remove_background(&self, input: &Blob, progress: &ProgressFn<'_>) -> Result<Blob> {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(input.len());
        }

        for event in &self.progress {
            progress(&event.key, event.current, event.total);
            if let Some(delay) = self.step_delay {
                tokio::time::sleep(delay).await;
            }
        }

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match &self.outcome {
            Outcome::Succeed(blob) => Ok(blob.clone()),
            Outcome::Fail(message) => Err(AppError::inference(message.clone())),
        }
    }
}

/// Encode a small transparent-background PNG
///
/// The left half is opaque red, the right half fully transparent.
#[must_use]
pub fn test_png(width: u32, height: u32) -> Blob {
    let image = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encoding an in-memory PNG cannot fail");
    Blob::new(bytes.into_inner(), PNG_MIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_success_records_calls() {
        let backend = ScriptedBackend::succeeding(test_png(4, 4))
            .with_progress([ProgressEvent::new("compute:inference", 1, 1)]);
        let seen = Mutex::new(Vec::new());
        let progress = |key: &str, current: u64, total: u64| {
            seen.lock().unwrap().push((key.to_string(), current, total));
        };

        let input = Blob::new(vec![0u8; 12], "image/jpeg");
        let output = backend.remove_background(&input, &progress).await.unwrap();

        assert!(!output.is_empty());
        assert_eq!(backend.call_history(), vec![12]);
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![("compute:inference".to_string(), 1, 1)]
        );
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let backend = ScriptedBackend::failing("network unreachable");
        let input = Blob::new(vec![0u8], "image/png");
        let err = backend
            .remove_background(&input, &|_: &str, _: u64, _: u64| {})
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Inference error: network unreachable");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_gated_call_waits_for_release() {
        let backend = ScriptedBackend::succeeding(test_png(2, 2)).gated();
        let worker = backend.clone();
        let task = tokio::spawn(async move {
            let input = Blob::new(vec![0u8], "image/png");
            worker
                .remove_background(&input, &|_: &str, _: u64, _: u64| {})
                .await
        });

        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        backend.release();
        assert!(task.await.unwrap().is_ok());
    }

    #[test]
    fn test_png_fixture_has_transparency() {
        let blob = test_png(4, 2);
        let image = blob.decode_rgba().unwrap();
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(image.get_pixel(0, 0)[3], 255);
        assert_eq!(image.get_pixel(3, 1)[3], 0);
    }
}
