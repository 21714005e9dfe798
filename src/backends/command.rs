//! External program backend
//!
//! Delegates background removal to a separate executable (by default the
//! `imgly-bgremove` CLI). The input is written to a temporary directory, the
//! program is run with `{input}` and `{output}` placeholders substituted, and
//! the output PNG is read back.

use crate::{
    error::{AppError, Result},
    inference::{InferenceBackend, ProgressFn},
    types::{Blob, PNG_MIME},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Program and argument template for [`CommandBackend`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBackendConfig {
    /// Executable name or path
    pub program: String,
    /// Arguments; `{input}` and `{output}` are replaced with file paths
    pub args: Vec<String>,
}

impl Default for CommandBackendConfig {
    fn default() -> Self {
        Self {
            program: "imgly-bgremove".to_string(),
            args: vec![
                INPUT_PLACEHOLDER.to_string(),
                "--output".to_string(),
                OUTPUT_PLACEHOLDER.to_string(),
                "--format".to_string(),
                "png".to_string(),
            ],
        }
    }
}

impl CommandBackendConfig {
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Check that the template mentions both file placeholders
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(AppError::invalid_config("backend program must not be empty"));
        }
        for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
            if !self.args.iter().any(|arg| arg.contains(placeholder)) {
                return Err(AppError::invalid_config(format!(
                    "backend arguments must contain {}",
                    placeholder
                )));
            }
        }
        Ok(())
    }

    fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

/// Backend that runs an external background removal program
///
/// Dropping an in-flight call kills the child process.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    config: CommandBackendConfig,
}

impl CommandBackend {
    pub fn new(config: CommandBackendConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &CommandBackendConfig {
        &self.config
    }
}

/// File extension for a temporary copy of the input
fn input_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "img",
    }
}

#[async_trait]
impl InferenceBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.config.program
    }

    #[instrument(skip_all, fields(program = %self.config.program, bytes = input.len()))]
    async fn remove_background(&self, input: &Blob, progress: &ProgressFn<'_>) -> Result<Blob> {
        progress("load:backend", 0, 1);

        let workdir = tempfile::tempdir()?;
        let input_path = workdir
            .path()
            .join(format!("input.{}", input_extension(input.mime_type())));
        let output_path = workdir.path().join("output.png");

        tokio::fs::write(&input_path, input.bytes())
            .await
            .map_err(|e| AppError::file_io_error("write temporary input", &input_path, &e))?;

        let args = self.config.render_args(&input_path, &output_path);
        debug!(?args, "launching background removal program");

        let mut command = Command::new(&self.config.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        progress("load:backend", 1, 1);
        progress("compute:inference", 0, 1);

        let finished = command.output().await.map_err(|e| {
            AppError::inference_error_with_engine(&self.config.program, "Launch", &e.to_string())
        })?;

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(AppError::inference_error_with_engine(
                &self.config.program,
                "Background removal",
                &format!("{} {}", finished.status, stderr.trim()),
            ));
        }

        let bytes = tokio::fs::read(&output_path).await.map_err(|e| {
            AppError::inference_error_with_engine(
                &self.config.program,
                "Reading output",
                &e.to_string(),
            )
        })?;

        progress("compute:inference", 1, 1);
        debug!(output_bytes = bytes.len(), "background removal program finished");

        Ok(Blob::new(bytes, PNG_MIME))
    }
}
