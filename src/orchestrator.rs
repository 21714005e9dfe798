//! Upload → processing → result flow
//!
//! The [`Orchestrator`] owns the session, consumes [`Command`]s from one
//! channel and publishes a [`ViewModel`] snapshot after each of them. Inference
//! runs in a spawned task that reports back through the same channel, tagged
//! with a [`JobId`]. A new upload aborts the running job, and any command still
//! carrying an older id is dropped.

use crate::{
    command::{self, Command, CommandReceiver, CommandSender, JobId},
    config::AppConfig,
    download::{DownloadTrigger, SaveSink},
    error::{AppError, Result},
    inference::{InferenceAdapter, InferenceBackend},
    object_url::{ObjectUrl, ObjectUrlStore},
    preview::{BackgroundToggle, Color, PreviewRenderer, PreviewSurface, SurfaceStyle},
    progress::{ProgressEvent, StatusText},
    session::SessionState,
    toast::{ErrorToast, ToastView},
    tracing_config::spans,
    types::{Blob, ImageFile},
    upload::{NodeId, UploadSurface},
    validator::FileValidator,
};
use instant::Instant;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tracing::Instrument;

/// Message shown for any inference failure; the raw error is only logged
pub const INFERENCE_FAILED_MESSAGE: &str =
    "Background removal failed. Please try a different image.";

/// Which section of the interface is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    #[default]
    IdleUpload,
    Processing,
    ResultReady,
}

impl AppState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdleUpload => "idle-upload",
            Self::Processing => "processing",
            Self::ResultReady => "result-ready",
        }
    }
}

/// Everything a renderer needs to draw the current state
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub state: AppState,
    pub file_name: Option<String>,
    pub status: StatusText,
    /// Progress bar fill, 0 to 100
    pub progress_percent: u8,
    pub original_src: Option<ObjectUrl>,
    pub result_src: Option<ObjectUrl>,
    pub background: SurfaceStyle,
    pub active_background: BackgroundToggle,
    pub custom_color: Color,
    pub toast: ToastView,
    /// Where the last download was written
    pub last_saved: Option<PathBuf>,
}

impl ViewModel {
    /// Status line text
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        self.status.as_str()
    }
}

#[derive(Debug)]
struct ActiveJob {
    id: JobId,
    started: Instant,
    handle: JoinHandle<()>,
}

/// Owner of the session and driver of the state machine
pub struct Orchestrator {
    state: AppState,
    session: SessionState,
    urls: ObjectUrlStore,
    renderer: PreviewRenderer,
    surface: PreviewSurface,
    adapter: InferenceAdapter,
    download: DownloadTrigger,
    validator: FileValidator,
    toast: ErrorToast,
    status: StatusText,
    progress_percent: u8,
    last_saved: Option<PathBuf>,
    job: Option<ActiveJob>,
    next_job: u64,
    commands: CommandSender,
    inbox: CommandReceiver,
    view: watch::Sender<ViewModel>,
}

impl Orchestrator {
    /// Build an orchestrator in the Idle-Upload state
    ///
    /// # Errors
    /// - Invalid configuration values
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn InferenceBackend>,
        sink: Arc<dyn SaveSink>,
    ) -> Result<Self> {
        config.validate()?;

        let urls = ObjectUrlStore::new();
        let surface = PreviewSurface::from_config(&config)?;
        let download = DownloadTrigger::new(urls.clone(), sink)
            .with_suffix(config.output_suffix.clone())
            .with_revoke_delay(config.revoke_delay());
        let (commands, inbox) = command::channel();

        let orchestrator = Self {
            state: AppState::IdleUpload,
            session: SessionState::new(),
            renderer: PreviewRenderer::new(urls.clone()),
            urls,
            surface,
            adapter: InferenceAdapter::new(backend),
            download,
            validator: FileValidator::from_config(&config),
            toast: ErrorToast::new(config.error_display()),
            status: StatusText::LoadingModel,
            progress_percent: 0,
            last_saved: None,
            job: None,
            next_job: 0,
            commands,
            inbox,
            view: watch::channel(ViewModel {
                state: AppState::IdleUpload,
                file_name: None,
                status: StatusText::LoadingModel,
                progress_percent: 0,
                original_src: None,
                result_src: None,
                background: SurfaceStyle::default(),
                active_background: BackgroundToggle::default(),
                custom_color: Color::WHITE,
                toast: ToastView::default(),
                last_saved: None,
            })
            .0,
        };
        orchestrator.publish();

        tracing::debug!(
            backend = orchestrator.adapter.backend_name(),
            "Orchestrator ready"
        );
        Ok(orchestrator)
    }

    /// Handle for sending commands from controls, timers and tasks
    #[must_use]
    pub fn sender(&self) -> CommandSender {
        self.commands.clone()
    }

    /// Receive a [`ViewModel`] after every handled command
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.view.subscribe()
    }

    /// An upload surface wired to this orchestrator
    #[must_use]
    pub fn upload_surface(&self, root: NodeId) -> UploadSurface {
        UploadSurface::new(self.sender(), self.validator.clone(), root)
    }

    #[must_use]
    pub fn state(&self) -> AppState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Latest published snapshot
    #[must_use]
    pub fn view(&self) -> ViewModel {
        self.view.borrow().clone()
    }

    #[must_use]
    pub fn urls(&self) -> &ObjectUrlStore {
        &self.urls
    }

    #[must_use]
    pub fn surface(&self) -> &PreviewSurface {
        &self.surface
    }

    /// Wait for the next command on the channel
    pub async fn next_command(&mut self) -> Option<Command> {
        self.inbox.recv().await
    }

    /// Handle commands until [`Command::Shutdown`]
    pub async fn run(mut self) {
        while let Some(command) = self.inbox.recv().await {
            if !self.dispatch(command) {
                break;
            }
        }
        self.shutdown();
    }

    /// Handle queued commands, then keep going while an inference job runs
    ///
    /// Returns the state reached once nothing is queued and nothing is
    /// processing.
    pub async fn run_until_settled(&mut self) -> AppState {
        loop {
            while let Ok(command) = self.inbox.try_recv() {
                if !self.dispatch(command) {
                    return self.state;
                }
            }
            if self.state != AppState::Processing {
                return self.state;
            }
            match self.inbox.recv().await {
                Some(command) => {
                    if !self.dispatch(command) {
                        return self.state;
                    }
                },
                None => return self.state,
            }
        }
    }

    /// Apply one command and publish the resulting view
    ///
    /// Returns `false` for [`Command::Shutdown`]. Must be called from within a
    /// tokio runtime: accepting a file spawns the inference task and errors
    /// schedule the toast timer.
    pub fn dispatch(&mut self, command: Command) -> bool {
        tracing::trace!(kind = command.kind(), state = self.state.as_str(), "dispatch");

        match command {
            Command::FileAccepted(file) => self.on_file_accepted(file),
            Command::ShowError(message) => self.toast.show(message, &self.commands),
            Command::DismissError => self.toast.hide(),
            Command::ErrorTimeout { generation } => {
                if !self.toast.on_timeout(generation) {
                    tracing::trace!(generation, "stale toast timer ignored");
                }
            },
            Command::Progress { job, event } => {
                if self.is_current(job) {
                    self.on_progress(&event);
                } else {
                    tracing::debug!(%job, key = %event.key, "progress from abandoned job ignored");
                }
            },
            Command::InferenceFinished { job, outcome } => {
                if self.is_current(job) {
                    if let Some(finished) = self.job.take() {
                        tracing::debug!(
                            %job,
                            elapsed_ms = finished.started.elapsed().as_millis() as u64,
                            "inference settled"
                        );
                    }
                    match outcome {
                        Ok(result) => self.on_inference_success(result),
                        Err(e) => self.on_inference_failure(&e),
                    }
                } else {
                    tracing::debug!(%job, "result from abandoned job ignored");
                }
            },
            Command::SelectBackground(toggle) => {
                self.surface.select(toggle);
            },
            Command::SetCustomColor(color) => self.surface.set_custom_color(color),
            Command::Download => self.on_download(),
            Command::Reset => self.reset(),
            Command::Shutdown => {
                self.shutdown();
                self.publish();
                return false;
            },
        }

        self.publish();
        true
    }

    fn is_current(&self, job: JobId) -> bool {
        self.state == AppState::Processing && self.job.as_ref().is_some_and(|j| j.id == job)
    }

    fn on_file_accepted(&mut self, file: ImageFile) {
        let span = tracing::info_span!("upload", file = %file.name(), size = file.size());
        let _enter = span.enter();

        self.abort_job();
        self.last_saved = None;

        let input = file.blob().clone();
        let original_url = self.renderer.show_original(&file);
        self.session.begin(file, original_url, &self.urls);

        self.status = StatusText::LoadingModel;
        self.progress_percent = 0;
        self.state = AppState::Processing;
        self.start_job(input);
    }

    fn start_job(&mut self, input: Blob) {
        self.next_job += 1;
        let id = JobId(self.next_job);
        let adapter = self.adapter.clone();
        let commands = self.commands.clone();
        let span = spans::inference(id, adapter.backend_name());

        tracing::info!(job = %id, bytes = input.len(), "Starting background removal");
        let handle = tokio::spawn(
            async move {
                let progress = commands.clone();
                let outcome = adapter
                    .process(&input, move |event| {
                        command::send(&progress, Command::Progress { job: id, event });
                    })
                    .await;
                command::send(&commands, Command::InferenceFinished { job: id, outcome });
            }
            .instrument(span),
        );
        self.job = Some(ActiveJob {
            id,
            started: Instant::now(),
            handle,
        });
    }

    fn abort_job(&mut self) {
        if let Some(job) = self.job.take() {
            tracing::info!(job = %job.id, "Abandoning in-flight inference");
            job.handle.abort();
        }
    }

    fn on_progress(&mut self, event: &ProgressEvent) {
        self.status = event.status();
        if let Some(percent) = event.percent() {
            self.progress_percent = percent;
        }
        tracing::trace!(
            key = %event.key,
            current = event.current,
            total = event.total,
            percent = self.progress_percent,
            "progress"
        );
    }

    fn on_inference_success(&mut self, result: Blob) {
        let url = self.renderer.show_result(&result);
        tracing::info!(bytes = result.len(), "Background removed");
        self.session.set_result(result, url, &self.urls);
        self.progress_percent = 100;
        self.state = AppState::ResultReady;
    }

    fn on_inference_failure(&mut self, error: &AppError) {
        tracing::error!(error = %error, "Background removal failed");
        self.toast.show(INFERENCE_FAILED_MESSAGE, &self.commands);
        self.session.clear(&self.urls);
        self.progress_percent = 0;
        self.state = AppState::IdleUpload;
    }

    fn on_download(&mut self) {
        let name = self
            .session
            .current_file()
            .map_or_else(|| "image".to_string(), |f| f.name().to_string());

        match self.download.trigger(self.session.result(), &name) {
            Ok(Some(path)) => self.last_saved = Some(path),
            Ok(None) => {},
            Err(e) => {
                tracing::error!(error = %e, "Download failed");
                self.toast.show(format!("Could not save image: {}", e), &self.commands);
            },
        }
    }

    /// Back to Idle-Upload with an empty session and default background
    ///
    /// Safe to call in any state and any number of times.
    pub fn reset(&mut self) {
        self.abort_job();
        self.session.clear(&self.urls);
        self.progress_percent = 0;
        self.status = StatusText::LoadingModel;
        self.surface.reset();
        self.last_saved = None;
        self.state = AppState::IdleUpload;
    }

    fn shutdown(&mut self) {
        self.abort_job();
        self.toast.hide();
        self.session.clear(&self.urls);
        tracing::debug!("Orchestrator stopped");
    }

    fn publish(&self) {
        let view = ViewModel {
            state: self.state,
            file_name: self.session.current_file().map(|f| f.name().to_string()),
            status: self.status,
            progress_percent: self.progress_percent,
            original_src: self.session.original_url().cloned(),
            result_src: self.session.result_url().cloned(),
            background: self.surface.style(),
            active_background: self.surface.active(),
            custom_color: self.surface.custom_color(),
            toast: self.toast.view().clone(),
            last_saved: self.last_saved.clone(),
        };
        self.view.send_replace(view);
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("job", &self.job.as_ref().map(|j| j.id))
            .finish_non_exhaustive()
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.abort_job();
    }
}
