//! Configuration types for the background removal flow

use crate::error::{AppError, Result};
use crate::preview::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One mebibyte, the unit used for size limits and messages
pub const MIB: u64 = 1024 * 1024;

/// Image types accepted by default
pub const DEFAULT_ACCEPTED_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Configuration for the background removal flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// MIME types accepted by the validator
    pub accepted_types: Vec<String>,

    /// Maximum accepted file size in bytes (inclusive)
    pub max_file_size: u64,

    /// How long an error message stays visible unless dismissed (milliseconds)
    pub error_display_ms: u64,

    /// Delay before a download's transient URL is revoked (milliseconds)
    pub revoke_delay_ms: u64,

    /// Initial value of the custom background color picker
    pub default_custom_color: String,

    /// Suffix appended to the original base name of a downloaded result
    pub output_suffix: String,

    /// Checkerboard square size in pixels for composited previews
    pub checkerboard_tile: u32,

    /// Checkerboard light square color
    pub checkerboard_light: String,

    /// Checkerboard dark square color
    pub checkerboard_dark: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().map(ToString::to_string).collect(),
            max_file_size: 25 * MIB,
            error_display_ms: 6000,
            revoke_delay_ms: 100,
            default_custom_color: "#22c55e".to_string(),
            output_suffix: "_no_bg".to_string(),
            checkerboard_tile: 10,
            checkerboard_light: "#ffffff".to_string(),
            checkerboard_dark: "#e0e0e0".to_string(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bgremove_app::AppConfig;
    ///
    /// let config = AppConfig::builder()
    ///     .max_file_size_mb(10)
    ///     .error_display_ms(3000)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.max_file_size, 10 * 1024 * 1024);
    /// ```
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields keep their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = std::fs::read_to_string(path_ref)
            .map_err(|e| AppError::file_io_error("read config file", path_ref, &e))?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            AppError::invalid_config(format!("{}: {}", path_ref.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - At least one accepted type
    /// - Size limit and error display duration greater than zero
    /// - Output suffix without path separators
    /// - All colors parse as `#rgb` or `#rrggbb`
    pub fn validate(&self) -> Result<()> {
        if self.accepted_types.is_empty() {
            return Err(AppError::invalid_config("accepted_types must not be empty"));
        }

        if self.max_file_size == 0 {
            return Err(AppError::config_value_error(
                "max file size",
                self.max_file_size,
                "1 or more bytes",
                Some(25 * MIB),
            ));
        }

        if self.error_display_ms == 0 {
            return Err(AppError::config_value_error(
                "error display ms",
                self.error_display_ms,
                "1 or more",
                Some(6000),
            ));
        }

        if self.output_suffix.contains(['/', '\\']) {
            return Err(AppError::invalid_config(format!(
                "output suffix must not contain path separators: {:?}",
                self.output_suffix
            )));
        }

        if self.checkerboard_tile == 0 {
            return Err(AppError::config_value_error(
                "checkerboard tile",
                self.checkerboard_tile,
                "1 or more pixels",
                Some(10),
            ));
        }

        for color in [
            &self.default_custom_color,
            &self.checkerboard_light,
            &self.checkerboard_dark,
        ] {
            Color::parse(color)?;
        }

        Ok(())
    }

    /// Error toast auto-hide duration
    #[must_use]
    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }

    /// Download URL revocation delay
    #[must_use]
    pub fn revoke_delay(&self) -> Duration {
        Duration::from_millis(self.revoke_delay_ms)
    }

    /// Size limit in whole MB, as printed in messages
    #[must_use]
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / MIB
    }

    /// Parsed default custom color
    pub fn custom_color(&self) -> Result<Color> {
        Color::parse(&self.default_custom_color)
    }
}

/// Builder for `AppConfig`
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Replace the accepted MIME types
    #[must_use]
    pub fn accepted_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.accepted_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the size limit in bytes
    #[must_use]
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    /// Set the size limit in MB
    #[must_use]
    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.max_file_size = mb.saturating_mul(MIB);
        self
    }

    /// Set the error toast display duration
    #[must_use]
    pub fn error_display_ms(mut self, ms: u64) -> Self {
        self.config.error_display_ms = ms;
        self
    }

    /// Set the download URL revocation delay
    #[must_use]
    pub fn revoke_delay_ms(mut self, ms: u64) -> Self {
        self.config.revoke_delay_ms = ms;
        self
    }

    /// Set the initial custom background color
    #[must_use]
    pub fn default_custom_color<S: Into<String>>(mut self, color: S) -> Self {
        self.config.default_custom_color = color.into();
        self
    }

    /// Set the output file name suffix
    #[must_use]
    pub fn output_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.config.output_suffix = suffix.into();
        self
    }

    /// Set the checkerboard square size, clamped to at least one pixel
    #[must_use]
    pub fn checkerboard_tile(mut self, pixels: u32) -> Self {
        self.config.checkerboard_tile = pixels.max(1);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
