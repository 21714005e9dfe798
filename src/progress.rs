//! Progress events from the inference engine and their human-readable mapping

use serde::{Deserialize, Serialize};

/// One progress callback from the inference engine
///
/// `current` and `total` are non-decreasing within one inference call. A `total`
/// of zero means the amount of work is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Opaque stage key, e.g. `fetch:model.onnx` or `compute:inference`
    pub key: String,
    pub current: u64,
    pub total: u64,
}

impl ProgressEvent {
    pub fn new<S: Into<String>>(key: S, current: u64, total: u64) -> Self {
        Self {
            key: key.into(),
            current,
            total,
        }
    }

    /// Completion percentage, or `None` when indeterminate
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        percent(self.current, self.total)
    }

    /// Status bucket for this event's key
    #[must_use]
    pub fn status(&self) -> StatusText {
        StatusText::classify(&self.key)
    }
}

/// Status line shown while processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusText {
    /// Shown when inference starts, before any progress arrives
    LoadingModel,
    /// Model assets are being fetched
    DownloadingModel,
    /// The model is running
    RemovingBackground,
    /// Anything else
    Processing,
}

impl StatusText {
    /// Classify a progress key by substring
    ///
    /// Download-related keys win over compute-related ones when both appear.
    #[must_use]
    pub fn classify(key: &str) -> Self {
        const DOWNLOAD: [&str; 3] = ["fetch", "download", "load"];
        const COMPUTE: [&str; 3] = ["compute", "infer", "process"];

        if DOWNLOAD.iter().any(|needle| key.contains(needle)) {
            Self::DownloadingModel
        } else if COMPUTE.iter().any(|needle| key.contains(needle)) {
            Self::RemovingBackground
        } else {
            Self::Processing
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadingModel => "Loading AI model…",
            Self::DownloadingModel => "Downloading AI model…",
            Self::RemovingBackground => "Removing background…",
            Self::Processing => "Processing…",
        }
    }
}

impl std::fmt::Display for StatusText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `current / total` as a rounded percentage, capped at 100
///
/// Halves round up. Returns `None` when `total` is zero.
#[must_use]
pub fn percent(current: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let value = (current as f64 / total as f64 * 100.0).round();
    Some(value.min(100.0) as u8)
}
