//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliBackground};
use crate::{backends::CommandBackendConfig, config::AppConfig, preview::Color};
use anyhow::{Context, Result};

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the application configuration
    ///
    /// Starts from `--config` when given, otherwise from the defaults, then
    /// applies flag overrides.
    pub(crate) fn app_config(cli: &Cli) -> Result<AppConfig> {
        let mut config = match &cli.config {
            Some(path) => AppConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => AppConfig::default(),
        };

        if let Some(color) = &cli.color {
            config.default_custom_color = color.clone();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Build the external program template
    pub(crate) fn backend_config(cli: &Cli) -> CommandBackendConfig {
        let mut backend = CommandBackendConfig::default();
        if let Some(program) = &cli.backend_program {
            backend.program = program.clone();
        }
        if !cli.backend_args.is_empty() {
            backend.args = cli.backend_args.clone();
        }
        backend
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if let Some(color) = &cli.color {
            Color::parse(color).context("Invalid --color value")?;
            if cli.background != CliBackground::Custom {
                log::warn!("--color only affects the preview with --background custom");
            }
        }

        Self::backend_config(cli)
            .validate()
            .context("Invalid backend command")?;

        if let Some(dir) = &cli.output_dir {
            if dir.is_file() {
                anyhow::bail!(
                    "Output path exists and is a file, not a directory: {}",
                    dir.display()
                );
            }
        }

        Ok(())
    }
}
