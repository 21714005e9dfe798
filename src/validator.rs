//! Candidate file validation
//!
//! Pure accept/reject decision on a file's declared MIME type and size. The
//! rejection message names the offending attribute and is shown verbatim.

use crate::config::{AppConfig, MIB};
use crate::error::ValidationError;
use crate::types::ImageFile;

/// Validator for candidate input files
#[derive(Debug, Clone)]
pub struct FileValidator {
    accepted_types: Vec<String>,
    max_file_size: u64,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl FileValidator {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            accepted_types: config.accepted_types.clone(),
            max_file_size: config.max_file_size,
        }
    }

    /// Check a file's declared attributes
    ///
    /// The type is checked first; an oversize file of an unsupported type is
    /// reported as unsupported.
    ///
    /// # Errors
    /// - [`ValidationError::UnsupportedFormat`] naming the declared type, or the
    ///   file extension when no type was declared
    /// - [`ValidationError::TooLarge`] with the size in MB
    pub fn validate(&self, name: &str, mime_type: &str, size: u64) -> Result<(), ValidationError> {
        if !self.accepted_types.iter().any(|t| t == mime_type) {
            let detected = if mime_type.is_empty() {
                extension_or_name(name)
            } else {
                mime_type
            };
            log::debug!("Rejected {:?}: unsupported type {:?}", name, detected);
            return Err(ValidationError::UnsupportedFormat {
                detected: detected.to_string(),
            });
        }

        if size > self.max_file_size {
            log::debug!("Rejected {:?}: {} bytes over limit", name, size);
            // Tenths with ties going up; `{:.1}` alone rounds ties to even
            let size_mb = size as f64 / MIB as f64;
            return Err(ValidationError::TooLarge {
                size_mb: (size_mb * 10.0).round() / 10.0,
                max_mb: self.max_file_size / MIB,
            });
        }

        Ok(())
    }

    /// Check an [`ImageFile`]
    pub fn validate_file(&self, file: &ImageFile) -> Result<(), ValidationError> {
        self.validate(file.name(), file.mime_type(), file.size())
    }
}

/// Text after the last `.`, or the whole name when there is none
fn extension_or_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
