//! Single-slot error notification with auto-hide
//!
//! `show` replaces the current message and restarts the auto-hide timer;
//! `hide` cancels the timer. An explicit dismissal and the timer firing both
//! land in the same hidden state. Each `show` bumps a generation so a timer
//! from an earlier message can never hide a newer one.

use crate::command::{self, Command, CommandSender};
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;

/// What a renderer shows for the toast
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ToastView {
    pub visible: bool,
    /// Last message; kept after hiding so a fade-out can still render it
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct ErrorToast {
    view: ToastView,
    generation: u64,
    display: Duration,
    pending: Option<JoinHandle<()>>,
}

impl ErrorToast {
    #[must_use]
    pub fn new(display: Duration) -> Self {
        Self {
            view: ToastView::default(),
            generation: 0,
            display,
            pending: None,
        }
    }

    /// Show `message`, replacing any current one, and schedule the auto-hide
    ///
    /// Must be called from within a tokio runtime.
    pub fn show<S: Into<String>>(&mut self, message: S, commands: &CommandSender) {
        self.cancel_pending();

        self.generation += 1;
        self.view = ToastView {
            visible: true,
            message: Some(message.into()),
        };

        let generation = self.generation;
        let display = self.display;
        let commands = commands.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(display).await;
            command::send(&commands, Command::ErrorTimeout { generation });
        }));
    }

    /// Hide the toast and cancel the auto-hide
    pub fn hide(&mut self) {
        self.cancel_pending();
        self.view.visible = false;
    }

    /// Auto-hide timer fired
    ///
    /// Returns `false` when the timer belonged to an earlier message.
    pub fn on_timeout(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.pending = None;
        self.view.visible = false;
        true
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn view(&self) -> &ToastView {
        &self.view
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.view.visible
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ErrorToast {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_show_schedules_timeout() {
        let (tx, mut rx) = command::channel();
        let mut toast = ErrorToast::new(Duration::from_secs(6));

        let started = tokio::time::Instant::now();
        toast.show("boom", &tx);
        assert!(toast.is_visible());
        assert_eq!(toast.view().message.as_deref(), Some("boom"));

        let Some(Command::ErrorTimeout { generation }) = rx.recv().await else {
            panic!("expected a timeout command");
        };
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(toast.on_timeout(generation));
        assert!(!toast.is_visible());
        assert_eq!(toast.view().message.as_deref(), Some("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_again_restarts_timer() {
        let (tx, mut rx) = command::channel();
        let mut toast = ErrorToast::new(Duration::from_secs(6));

        toast.show("first", &tx);
        tokio::time::sleep(Duration::from_secs(4)).await;
        let started = tokio::time::Instant::now();
        toast.show("second", &tx);
        assert_eq!(toast.view().message.as_deref(), Some("second"));

        let Some(Command::ErrorTimeout { generation }) = rx.recv().await else {
            panic!("expected a timeout command");
        };
        assert_eq!(generation, 2);
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(toast.on_timeout(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hide_cancels_timer() {
        let (tx, mut rx) = command::channel();
        let mut toast = ErrorToast::new(Duration::from_secs(6));

        toast.show("boom", &tx);
        toast.hide();
        assert!(!toast.is_visible());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_generation_is_ignored() {
        let (tx, _rx) = command::channel();
        let mut toast = ErrorToast::new(Duration::from_secs(6));
        toast.show("one", &tx);
        toast.show("two", &tx);
        assert!(!toast.on_timeout(1));
        assert!(toast.is_visible());
        assert!(toast.on_timeout(2));
    }

    #[test]
    fn test_hide_when_never_shown() {
        let mut toast = ErrorToast::new(Duration::from_secs(6));
        toast.hide();
        assert_eq!(*toast.view(), ToastView::default());
        assert_eq!(toast.generation(), 0);
    }
}
