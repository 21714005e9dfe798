//! Core data types shared across the flow

use crate::error::{AppError, Result};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// MIME type of every processed result
pub const PNG_MIME: &str = "image/png";

/// Immutable in-memory binary data with a MIME type
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    data: Arc<[u8]>,
    mime_type: String,
}

impl Blob {
    /// Create a blob from raw bytes and a MIME type (may be empty)
    pub fn new<D: Into<Arc<[u8]>>, S: Into<String>>(data: D, mime_type: S) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Raw bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Declared MIME type
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Same bytes, different MIME type
    #[must_use]
    pub fn with_mime_type<S: Into<String>>(&self, mime_type: S) -> Self {
        Self {
            data: Arc::clone(&self.data),
            mime_type: mime_type.into(),
        }
    }

    /// Decode the blob as an RGBA image
    pub fn decode_rgba(&self) -> Result<image::RgbaImage> {
        Ok(image::load_from_memory(&self.data)?.to_rgba8())
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// A candidate input file, as handed over by a file picker or a drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    name: String,
    size: u64,
    blob: Blob,
}

impl ImageFile {
    /// Create a file whose declared size is the blob length
    pub fn new<S: Into<String>>(name: S, blob: Blob) -> Self {
        Self {
            name: name.into(),
            size: blob.len() as u64,
            blob,
        }
    }

    /// Override the declared size
    ///
    /// File pickers report the size separately from the content; validation only
    /// looks at the declared value.
    #[must_use]
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Read a file from disk
    ///
    /// The MIME type is derived from the extension the way a browser file picker
    /// does. Files without a recognised extension fall back to content sniffing;
    /// anything still unknown gets an empty type.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let data = tokio::fs::read(path_ref)
            .await
            .map_err(|e| AppError::file_io_error("read input file", path_ref, &e))?;

        let name = path_ref
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let mime_type = mime_from_extension(&name)
            .or_else(|| sniff_mime(&data))
            .unwrap_or_default();

        log::debug!(
            "Loaded {} ({} bytes, type: {:?})",
            path_ref.display(),
            data.len(),
            mime_type
        );

        Ok(Self::new(name, Blob::new(data, mime_type)))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared MIME type (empty when unknown)
    #[must_use]
    pub fn mime_type(&self) -> &str {
        self.blob.mime_type()
    }

    /// Declared size in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn blob(&self) -> &Blob {
        &self.blob
    }
}

/// Map a file name's extension to a MIME type
#[must_use]
pub fn mime_from_extension(name: &str) -> Option<&'static str> {
    let (_, extension) = name.rsplit_once('.')?;
    let mime = match extension.to_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

/// Detect an image MIME type from magic bytes
#[must_use]
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    image::guess_format(data)
        .ok()
        .map(|format| format.to_mime_type())
}
