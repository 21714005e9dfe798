//! Tracing configuration for the command-line front end
//!
//! Applications configure the subscriber; library code only emits events and
//! spans. The `log` macros used by leaf modules are picked up through
//! `tracing-subscriber`'s log bridge. The subscriber setup needs the `cli`
//! feature; [`spans`] is always available.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    Console,
    /// Compact console output without colors for CI environments
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Tracing configuration builder
#[cfg(feature = "cli")]
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID for correlation
    pub session_id: Option<String>,
}

#[cfg(feature = "cli")]
impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

#[cfg(feature = "cli")]
impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set custom environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Set session ID for correlation
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Build the filter from `env_filter`, falling back to the verbosity
    pub fn filter(&self) -> anyhow::Result<EnvFilter> {
        let directive = self
            .env_filter
            .as_deref()
            .unwrap_or_else(|| self.verbosity_to_filter());
        Ok(EnvFilter::try_new(directive)?)
    }

    /// Install the global subscriber
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let registry = Registry::default().with(self.filter()?);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact();

                registry.with(fmt_layer).try_init()?;
            },

            TracingFormat::Compact => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .compact();

                registry.with(fmt_layer).try_init()?;
            },

            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr);

                registry.with(fmt_layer).try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::debug!(session_id = %session_id, "Background removal session started");
        }

        Ok(())
    }
}

/// Initialize tracing with CLI-friendly defaults
///
/// `RUST_LOG`, when set, takes precedence over `verbosity`.
#[cfg(feature = "cli")]
pub fn init_cli_tracing(verbosity: u8) -> anyhow::Result<String> {
    let session_id = uuid::Uuid::new_v4().to_string();

    let mut config = TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(TracingFormat::Console)
        .with_session_id(session_id.clone());
    if let Ok(filter) = std::env::var("RUST_LOG") {
        config = config.with_env_filter(filter);
    }
    config.init()?;

    Ok(session_id)
}

/// Span creation helpers for common operations
pub mod spans {
    use crate::command::JobId;
    use tracing::{Level, Span};

    /// Span for one CLI run
    pub fn session(session_id: &str, input: &std::path::Path, backend: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            input = %input.display(),
            backend = %backend
        )
    }

    /// Span for one inference job
    pub fn inference(job: JobId, backend: &str) -> Span {
        tracing::span!(Level::INFO, "inference", job = %job, backend = %backend)
    }

    /// Span for writing the flattened preview
    pub fn preview(path: &std::path::Path, background: &str) -> Span {
        tracing::span!(
            Level::DEBUG,
            "preview",
            path = %path.display(),
            background = %background
        )
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_to_filter() {
        let levels: Vec<_> = (0..5)
            .map(|v| TracingConfig::new().with_verbosity(v).verbosity_to_filter())
            .collect();
        assert_eq!(levels, vec!["warn", "info", "debug", "trace", "trace"]);
    }

    #[test]
    fn test_env_filter_overrides_verbosity() {
        let config = TracingConfig::new()
            .with_verbosity(0)
            .with_env_filter("bgremove_app=trace");
        assert_eq!(config.filter().unwrap().to_string(), "bgremove_app=trace");
    }

    #[test]
    fn test_invalid_env_filter() {
        let config = TracingConfig::new().with_env_filter("bgremove_app=loud");
        assert!(config.filter().is_err());
    }

    #[test]
    fn test_inference_span_fields() {
        tracing::subscriber::with_default(Registry::default(), || {
            let span = spans::inference(crate::command::JobId(3), "scripted");
            let metadata = span.metadata().unwrap();
            assert_eq!(metadata.name(), "inference");
            assert_eq!(*metadata.level(), tracing::Level::INFO);
            assert!(metadata.fields().field("job").is_some());
            assert!(metadata.fields().field("backend").is_some());
        });
    }
}
