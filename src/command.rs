//! Messages driving the orchestrator
//!
//! Every input (user controls, upload surface, inference task, timers) reaches
//! the orchestrator as a [`Command`] on one unbounded channel, so the flow can
//! be exercised without any rendering surface.

use crate::{
    error::Result,
    preview::{BackgroundToggle, Color},
    progress::ProgressEvent,
    types::{Blob, ImageFile},
};
use std::fmt;
use tokio::sync::mpsc;

/// Identifies one inference call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Input to the orchestrator
#[derive(Debug)]
pub enum Command {
    /// A file passed validation
    FileAccepted(ImageFile),
    /// Show a message in the error toast
    ShowError(String),
    /// The user closed the error toast
    DismissError,
    /// The error toast's auto-hide timer fired
    ErrorTimeout { generation: u64 },
    /// Progress callback from an inference call
    Progress { job: JobId, event: ProgressEvent },
    /// An inference call settled
    InferenceFinished { job: JobId, outcome: Result<Blob> },
    /// A background toggle was clicked
    SelectBackground(BackgroundToggle),
    /// The custom color picker changed
    SetCustomColor(Color),
    /// The download button was clicked
    Download,
    /// The "new image" button was clicked
    Reset,
    /// Stop the orchestrator loop
    Shutdown,
}

impl Command {
    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileAccepted(_) => "file_accepted",
            Self::ShowError(_) => "show_error",
            Self::DismissError => "dismiss_error",
            Self::ErrorTimeout { .. } => "error_timeout",
            Self::Progress { .. } => "progress",
            Self::InferenceFinished { .. } => "inference_finished",
            Self::SelectBackground(_) => "select_background",
            Self::SetCustomColor(_) => "set_custom_color",
            Self::Download => "download",
            Self::Reset => "reset",
            Self::Shutdown => "shutdown",
        }
    }
}

pub type CommandSender = mpsc::UnboundedSender<Command>;
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

/// Create a command channel
#[must_use]
pub fn channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

/// Send a command, logging instead of failing when the orchestrator is gone
pub fn send(commands: &CommandSender, command: Command) {
    let kind = command.kind();
    if commands.send(command).is_err() {
        tracing::debug!(kind, "orchestrator stopped; command dropped");
    }
}
