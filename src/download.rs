//! Saving the processed result as a file
//!
//! The output name is derived from the original: the last extension is
//! stripped and `<suffix>.png` appended. Saving goes through a transient object
//! URL that is revoked a short, bounded time after the save.

use crate::{
    error::{AppError, Result},
    object_url::ObjectUrlStore,
    types::Blob,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Suffix used when none is configured
pub const DEFAULT_SUFFIX: &str = "_no_bg";

/// Derive the download name for a processed image
///
/// Only the last extension is removed: `archive.tar.gz` becomes
/// `archive.tar_no_bg.png`. A trailing extension never spans a `/`, and a
/// leading dot counts as an extension (`.png` becomes `_no_bg.png`).
#[must_use]
pub fn output_filename(original: &str, suffix: &str) -> String {
    let base = match original.rfind('.') {
        Some(dot) if dot + 1 < original.len() && !original[dot + 1..].contains('/') => {
            &original[..dot]
        },
        _ => original,
    };
    format!("{}{}.png", base, suffix)
}

/// Destination for a user-initiated save
pub trait SaveSink: Send + Sync {
    /// Persist `bytes` under `filename`, returning where they went
    ///
    /// Called synchronously from the orchestrator's command loop, so an
    /// implementation must finish quickly. Slow destinations should hand the
    /// bytes to their own task and return.
    ///
    /// # Errors
    /// - Destination not writable
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Saves into a directory, creating it on demand
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's download directory, or the current directory
    #[must_use]
    pub fn downloads() -> Self {
        Self::new(dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveSink for DirectorySink {
    /// Blocking `std::fs` write of one PNG on the calling thread
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AppError::file_io_error("create output directory", &self.dir, &e))?;

        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)
            .map_err(|e| AppError::file_io_error("write result", &path, &e))?;
        Ok(path)
    }
}

/// Serializes a result blob to a user-initiated save
#[derive(Clone)]
pub struct DownloadTrigger {
    urls: ObjectUrlStore,
    sink: Arc<dyn SaveSink>,
    suffix: String,
    revoke_delay: Duration,
}

impl DownloadTrigger {
    pub fn new(urls: ObjectUrlStore, sink: Arc<dyn SaveSink>) -> Self {
        Self {
            urls,
            sink,
            suffix: DEFAULT_SUFFIX.to_string(),
            revoke_delay: Duration::from_millis(100),
        }
    }

    #[must_use]
    pub fn with_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn with_revoke_delay(mut self, delay: Duration) -> Self {
        self.revoke_delay = delay;
        self
    }

    /// Save `result` under a name derived from `original_name`
    ///
    /// Returns `Ok(None)` without doing anything when there is no result. The
    /// transient URL is revoked `revoke_delay` after the save on the current
    /// tokio runtime, or right after the save when there is none.
    ///
    /// # Errors
    /// - The sink failed to persist the file
    pub fn trigger(&self, result: Option<&Blob>, original_name: &str) -> Result<Option<PathBuf>> {
        let Some(result) = result else {
            log::debug!("Download requested without a result; ignoring");
            return Ok(None);
        };

        let filename = output_filename(original_name, &self.suffix);
        let url = self.urls.create(result);

        let saved = match self.urls.resolve(&url) {
            Some(blob) => self.sink.save(&filename, blob.bytes()),
            None => Err(AppError::internal(format!("object URL {} vanished", url))),
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let urls = self.urls.clone();
                let delay = self.revoke_delay;
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    urls.revoke(&url);
                });
            },
            Err(_) => {
                self.urls.revoke(&url);
            },
        }

        let path = saved?;
        log::info!("Saved {} ({} bytes)", path.display(), result.len());
        Ok(Some(path))
    }
}

impl std::fmt::Debug for DownloadTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadTrigger")
            .field("suffix", &self.suffix)
            .field("revoke_delay", &self.revoke_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<(String, usize)>>,
    }

    impl SaveSink for MemorySink {
        fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
            self.saved
                .lock()
                .unwrap()
                .push((filename.to_string(), bytes.len()));
            Ok(PathBuf::from(filename))
        }
    }

    struct FailingSink;

    impl SaveSink for FailingSink {
        fn save(&self, _filename: &str, _bytes: &[u8]) -> Result<PathBuf> {
            Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(output_filename("photo.JPG", "_no_bg"), "photo_no_bg.png");
        assert_eq!(
            output_filename("archive.tar.gz", "_no_bg"),
            "archive.tar_no_bg.png"
        );
        assert_eq!(output_filename("image", "_no_bg"), "image_no_bg.png");
        assert_eq!(output_filename("portrait.png", "_no_bg"), "portrait_no_bg.png");
    }

    #[test]
    fn test_output_filename_edge_cases() {
        assert_eq!(output_filename("trailing.", "_no_bg"), "trailing._no_bg.png");
        assert_eq!(output_filename(".png", "_no_bg"), "_no_bg.png");
        assert_eq!(output_filename("dir.v2/file", "_no_bg"), "dir.v2/file_no_bg.png");
        assert_eq!(output_filename("a.png", "_cutout"), "a_cutout.png");
    }

    #[test]
    fn test_no_result_is_silent_noop() {
        let urls = ObjectUrlStore::new();
        let sink = Arc::new(MemorySink::default());
        let trigger = DownloadTrigger::new(urls.clone(), sink.clone());

        assert_eq!(trigger.trigger(None, "photo.jpg").unwrap(), None);
        assert!(sink.saved.lock().unwrap().is_empty());
        assert_eq!(urls.live_count(), 0);
    }

    #[test]
    fn test_without_runtime_revokes_after_save() {
        let urls = ObjectUrlStore::new();
        let sink = Arc::new(MemorySink::default());
        let trigger = DownloadTrigger::new(urls.clone(), sink.clone());

        let result = Blob::new(vec![0u8; 5], "image/png");
        let path = trigger.trigger(Some(&result), "cat.webp").unwrap();
        assert_eq!(path, Some(PathBuf::from("cat_no_bg.png")));
        assert_eq!(
            *sink.saved.lock().unwrap(),
            vec![("cat_no_bg.png".to_string(), 5)]
        );
        assert_eq!(urls.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_url_revoked_after_delay() {
        let urls = ObjectUrlStore::new();
        let trigger = DownloadTrigger::new(urls.clone(), Arc::new(MemorySink::default()))
            .with_revoke_delay(Duration::from_millis(100));

        let result = Blob::new(vec![0u8; 5], "image/png");
        trigger.trigger(Some(&result), "cat.png").unwrap();
        assert_eq!(urls.live_count(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(urls.live_count(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(urls.live_count(), 0);
    }

    #[test]
    fn test_sink_failure_propagates_and_releases_url() {
        let urls = ObjectUrlStore::new();
        let trigger = DownloadTrigger::new(urls.clone(), Arc::new(FailingSink));
        let result = Blob::new(vec![0u8; 5], "image/png");
        assert!(trigger.trigger(Some(&result), "cat.png").is_err());
        assert_eq!(urls.live_count(), 0);
    }

    #[test]
    fn test_directory_sink_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("nested/out"));
        let path = sink.save("x_no_bg.png", b"png").unwrap();
        assert_eq!(path, dir.path().join("nested/out/x_no_bg.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"png");
    }
}
