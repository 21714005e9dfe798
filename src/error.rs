//! Error types for the background removal flow

use thiserror::Error;

/// Result type alias for background removal flow operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Reasons a candidate file is refused before any processing starts
///
/// The `Display` output is the exact message shown to the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The declared MIME type is not one of the accepted image types
    #[error("Unsupported format \"{detected}\". Please use PNG, JPG, WebP, or GIF.")]
    UnsupportedFormat {
        /// Declared MIME type, or the file extension when no type was declared
        detected: String,
    },

    /// The file exceeds the configured size limit
    #[error("File is too large ({size_mb:.1} MB). Maximum size is {max_mb} MB.")]
    TooLarge {
        /// Actual size in MB (1024 * 1024 bytes)
        size_mb: f64,
        /// Configured limit in whole MB
        max_mb: u64,
    },
}

/// Error types for the background removal flow
#[derive(Error, Debug)]
pub enum AppError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Candidate file rejected by the validator
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Failure surfaced by the background removal engine
    #[error("Inference error: {0}")]
    Inference(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create inference error naming the engine that failed
    pub fn inference_error_with_engine(engine: &str, operation: &str, error: &str) -> Self {
        Self::Inference(format!("{} failed using '{}': {}", operation, engine, error))
    }
}
