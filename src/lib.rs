#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Background Removal App
//!
//! The upload → processing → preview → download flow of a background removal
//! utility, independent of any rendering surface.
//!
//! A user picks or drops an image, an external inference engine strips its
//! background, and the user previews the transparent result over a chosen
//! background before saving it as `<name>_no_bg.png`. The engine itself is a
//! black box behind the [`InferenceBackend`] trait.
//!
//! ## Features
//!
//! - **Validation**: PNG, JPEG, WebP and GIF up to 25 MiB, with user-facing messages
//! - **Drag and drop**: drop zone semantics including child-aware drag-leave
//! - **Progress**: engine progress mapped to status text and a percentage
//! - **Preview**: checkerboard, white, black or custom background, plus flattening
//! - **Download**: derived output names and transient handle cleanup
//! - **Command driven**: every input is a [`Command`] on one channel; the view is
//!   published on a `watch` channel
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_app::{
//!     AppConfig, AppState, Command, CommandBackend, CommandBackendConfig, DirectorySink,
//!     ImageFile, NodeId, Orchestrator,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let backend = CommandBackend::new(CommandBackendConfig::default())?;
//! let mut app = Orchestrator::new(
//!     AppConfig::default(),
//!     Arc::new(backend),
//!     Arc::new(DirectorySink::downloads()),
//! )?;
//!
//! let mut upload = app.upload_surface(NodeId(0));
//! upload.browse(vec![ImageFile::from_path("photo.jpg").await?]);
//!
//! if app.run_until_settled().await == AppState::ResultReady {
//!     app.dispatch(Command::Download);
//!     println!("saved to {:?}", app.view().last_saved);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and progress reporting
//! - `webp-support` (default): WebP decoding for previews
//! - `tracing-json`: JSON log output for the CLI

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod command;
pub mod config;
pub mod download;
pub mod error;
pub mod inference;
pub mod object_url;
pub mod orchestrator;
pub mod preview;
pub mod progress;
pub mod session;
pub mod toast;
pub mod tracing_config;
pub mod types;
pub mod upload;
pub mod validator;

// Public API exports
pub use backends::*;
pub use command::{Command, CommandSender, JobId};
pub use config::{AppConfig, AppConfigBuilder};
pub use download::{output_filename, DirectorySink, DownloadTrigger, SaveSink};
pub use error::{AppError, Result, ValidationError};
pub use inference::{InferenceAdapter, InferenceBackend, ProgressFn};
pub use object_url::{ObjectUrl, ObjectUrlStore};
pub use orchestrator::{AppState, Orchestrator, ViewModel, INFERENCE_FAILED_MESSAGE};
pub use preview::{
    BackgroundChoice, BackgroundToggle, CheckerboardPattern, Color, PreviewRenderer,
    PreviewSurface, SurfaceStyle,
};
pub use progress::{ProgressEvent, StatusText};
pub use session::SessionState;
pub use toast::{ErrorToast, ToastView};
pub use types::{Blob, ImageFile};
pub use upload::{document_disposition, DragEventKind, EventDisposition, NodeId, UploadSurface};
pub use validator::FileValidator;

pub use tracing_config::spans;
#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};
