//! Background Removal CLI Tool
//!
//! Drives the upload → processing → download flow headlessly for one image.

use super::config::CliConfigBuilder;
use crate::{
    backends::CommandBackend,
    config::AppConfig,
    download::DirectorySink,
    inference::InferenceBackend,
    orchestrator::{AppState, Orchestrator, ViewModel},
    preview::{BackgroundToggle, CheckerboardPattern, Color, PreviewRenderer},
    tracing_config::{init_cli_tracing, spans},
    types::ImageFile,
    upload::NodeId,
    Command,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use instant::Instant;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, Instrument};

/// Remove the background of an image and save it as `<name>_no_bg.png`
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-app")]
pub struct Cli {
    /// Input image (PNG, JPEG, WebP or GIF, up to 25 MB)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory the result is saved into [default: the download directory]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Background used for the preview
    #[arg(short, long, value_enum, default_value_t = CliBackground::Checkerboard)]
    pub background: CliBackground,

    /// Custom background color (#rgb or #rrggbb)
    #[arg(long, value_name = "HEX")]
    pub color: Option<String>,

    /// Also write the result flattened over the chosen background
    #[arg(long, value_name = "FILE")]
    pub preview: Option<PathBuf>,

    /// Background removal program [default: imgly-bgremove]
    #[arg(long, value_name = "PROGRAM")]
    pub backend_program: Option<String>,

    /// Argument for the backend program; repeat for each one. `{input}` and
    /// `{output}` are replaced with file paths.
    #[arg(long = "backend-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub backend_args: Vec<String>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliBackground {
    Checkerboard,
    White,
    Black,
    Custom,
}

impl From<CliBackground> for BackgroundToggle {
    fn from(background: CliBackground) -> Self {
        match background {
            CliBackground::Checkerboard => Self::Checkerboard,
            CliBackground::White => Self::White,
            CliBackground::Black => Self::Black,
            CliBackground::Custom => Self::Custom,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::app_config(&cli)?;
    let backend = CommandBackend::new(CliConfigBuilder::backend_config(&cli))
        .context("Failed to configure backend program")?;

    let span = spans::session(&session_id, &cli.input, &backend.config().program);
    let start_time = Instant::now();
    let saved = run_with_backend(&cli, config, Arc::new(backend))
        .instrument(span)
        .await?;

    info!(
        "Processed {} in {:.2}s",
        cli.input.display(),
        start_time.elapsed().as_secs_f64()
    );
    println!("{}", saved.display());
    Ok(())
}

/// Run one image through the flow with `backend`, returning the saved path
///
/// A rejected file or a failed removal ends with the message a user would
/// see in the error toast.
pub async fn run_with_backend(
    cli: &Cli,
    config: AppConfig,
    backend: Arc<dyn InferenceBackend>,
) -> Result<PathBuf> {
    let sink = match &cli.output_dir {
        Some(dir) => DirectorySink::new(dir),
        None => DirectorySink::downloads(),
    };
    debug!(dir = %sink.dir().display(), "Output directory");

    let pattern = CheckerboardPattern::from_config(&config)?;
    let mut app = Orchestrator::new(config, backend, Arc::new(sink))
        .context("Failed to set up background removal")?;

    let file = ImageFile::from_path(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    app.upload_surface(NodeId(0)).browse(vec![file]);

    let bar = progress_bar();
    let watcher = tokio::spawn(follow_progress(app.subscribe(), bar.clone()));
    let state = app.run_until_settled().await;
    watcher.abort();
    bar.finish_and_clear();

    if state != AppState::ResultReady {
        anyhow::bail!(failure_message(&app.view()));
    }

    app.dispatch(Command::SelectBackground(cli.background.into()));
    if let Some(color) = &cli.color {
        app.dispatch(Command::SetCustomColor(Color::parse(color)?));
    }

    if let Some(path) = &cli.preview {
        write_preview(&app, &pattern, path)?;
    }

    app.dispatch(Command::Download);
    let view = app.view();
    let saved = view
        .last_saved
        .clone()
        .ok_or_else(|| anyhow::anyhow!(failure_message(&view)))?;

    app.dispatch(Command::Shutdown);
    Ok(saved)
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

/// Mirror the view model onto the progress bar
async fn follow_progress(mut view: watch::Receiver<ViewModel>, bar: ProgressBar) {
    loop {
        {
            let current = view.borrow_and_update();
            bar.set_position(u64::from(current.progress_percent));
            bar.set_message(current.status_text());
        }
        if view.changed().await.is_err() {
            break;
        }
    }
}

fn failure_message(view: &ViewModel) -> String {
    view.toast
        .message
        .clone()
        .unwrap_or_else(|| "Background removal did not complete".to_string())
}

fn write_preview(app: &Orchestrator, pattern: &CheckerboardPattern, path: &Path) -> Result<()> {
    let view = app.view();
    let span = spans::preview(path, view.active_background.as_str());
    let _enter = span.enter();

    let result = app
        .session()
        .result()
        .context("No result to preview")?;
    let flattened = PreviewRenderer::composite_blob(result, &view.background, pattern)?;
    flattened
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write preview {}", path.display()))?;

    info!("Preview written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{test_png, ScriptedBackend};
    use crate::progress::ProgressEvent;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bgremove-app").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_parsing() {
        let cli = cli(&[
            "photo.jpg",
            "-o",
            "out",
            "--background",
            "black",
            "--backend-arg=--output",
            "-vv",
        ]);
        assert_eq!(cli.input, PathBuf::from("photo.jpg"));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.background, CliBackground::Black);
        assert_eq!(cli.backend_args, vec!["--output"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.preview.is_none());
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["bgremove-app"]).is_err());
    }

    #[test]
    fn test_background_conversion() {
        assert_eq!(
            BackgroundToggle::from(CliBackground::Custom),
            BackgroundToggle::Custom
        );
        assert_eq!(
            BackgroundToggle::from(CliBackground::Checkerboard),
            BackgroundToggle::Checkerboard
        );
    }

    #[tokio::test]
    async fn test_run_saves_result_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("portrait.png");
        std::fs::write(&input, test_png(8, 8).bytes()).unwrap();
        let out = dir.path().join("out");
        let preview = dir.path().join("preview.png");

        let cli = cli(&[
            input.to_str().unwrap(),
            "--output-dir",
            out.to_str().unwrap(),
            "--background",
            "custom",
            "--color",
            "#0000ff",
            "--preview",
            preview.to_str().unwrap(),
        ]);
        let backend = ScriptedBackend::succeeding(test_png(8, 8))
            .with_progress([ProgressEvent::new("compute:inference", 1, 1)]);

        let saved = run_with_backend(&cli, AppConfig::default(), Arc::new(backend))
            .await
            .unwrap();

        assert_eq!(saved, out.join("portrait_no_bg.png"));
        assert!(saved.is_file());

        let flattened = image::open(&preview).unwrap().to_rgba8();
        assert_eq!(flattened.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(flattened.get_pixel(7, 0).0, [0, 0, 255, 255]);
    }

    #[tokio::test]
    async fn test_run_reports_fixed_failure_message() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        std::fs::write(&input, test_png(4, 4).bytes()).unwrap();

        let cli = cli(&[
            input.to_str().unwrap(),
            "--output-dir",
            dir.path().to_str().unwrap(),
        ]);
        let backend = ScriptedBackend::failing("out of memory");

        let err = run_with_backend(&cli, AppConfig::default(), Arc::new(backend))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Background removal failed. Please try a different image."
        );
        assert!(!dir.path().join("photo_no_bg.png").exists());
    }

    #[tokio::test]
    async fn test_run_reports_validation_message() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, b"plain text").unwrap();

        let cli = cli(&[input.to_str().unwrap(), "-o", dir.path().to_str().unwrap()]);
        let backend = ScriptedBackend::succeeding(test_png(4, 4));

        let err = run_with_backend(&cli, AppConfig::default(), Arc::new(backend.clone()))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Unsupported format"));
        assert_eq!(backend.call_count(), 0);
    }
}
