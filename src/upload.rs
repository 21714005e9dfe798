//! Drop zone and file picker
//!
//! Browse selection and drag-and-drop release both converge on
//! [`UploadSurface::accept_first`]: the first offered file is validated and
//! either forwarded to the orchestrator or turned into an error message.

use crate::{
    command::{self, Command, CommandSender},
    types::ImageFile,
    validator::FileValidator,
};
use std::collections::HashSet;

/// Identifies an element of the hosting surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Kinds of drag events delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEventKind {
    Enter,
    Over,
    Leave,
    Drop,
}

/// What the host must do with the event after the handler ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventDisposition {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventDisposition {
    /// Handled by the zone; the host does nothing else with it
    pub const CONSUMED: Self = Self {
        prevent_default: true,
        stop_propagation: true,
    };

    /// Not ours; default behaviour applies
    pub const PASS: Self = Self {
        prevent_default: false,
        stop_propagation: false,
    };
}

/// Disposition for a drag event that reached the document outside the zone
///
/// Drag-over and drop are suppressed so the host never navigates to a file
/// dropped next to the zone.
#[must_use]
pub fn document_disposition(kind: DragEventKind) -> EventDisposition {
    match kind {
        DragEventKind::Over | DragEventKind::Drop => EventDisposition {
            prevent_default: true,
            stop_propagation: false,
        },
        DragEventKind::Enter | DragEventKind::Leave => EventDisposition::PASS,
    }
}

/// The drop zone with its hidden file input
#[derive(Debug)]
pub struct UploadSurface {
    commands: CommandSender,
    validator: FileValidator,
    zone: HashSet<NodeId>,
    drag_active: bool,
}

impl UploadSurface {
    /// Create a surface whose zone is the single node `root`
    pub fn new(commands: CommandSender, validator: FileValidator, root: NodeId) -> Self {
        Self {
            commands,
            validator,
            zone: HashSet::from([root]),
            drag_active: false,
        }
    }

    /// Register descendants of the zone root
    #[must_use]
    pub fn with_children<I: IntoIterator<Item = NodeId>>(mut self, children: I) -> Self {
        self.zone.extend(children);
        self
    }

    /// Whether `node` is the zone or one of its descendants
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.zone.contains(&node)
    }

    #[must_use]
    pub fn is_drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn drag_enter(&mut self) -> EventDisposition {
        self.drag_active = true;
        EventDisposition::CONSUMED
    }

    pub fn drag_over(&mut self) -> EventDisposition {
        self.drag_active = true;
        EventDisposition::CONSUMED
    }

    /// The pointer left some element of the zone
    ///
    /// `related_target` is the element the pointer moved into, `None` when it
    /// left the window. Moving between the zone's children keeps the zone
    /// active.
    pub fn drag_leave(&mut self, related_target: Option<NodeId>) -> EventDisposition {
        match related_target {
            Some(node) if self.contains(node) => {},
            _ => self.drag_active = false,
        }
        EventDisposition::CONSUMED
    }

    /// Files released over the zone
    pub fn drop(&mut self, files: Vec<ImageFile>) -> EventDisposition {
        self.drag_active = false;
        self.accept_first(files);
        EventDisposition::CONSUMED
    }

    /// Files chosen through the file picker
    pub fn browse(&mut self, files: Vec<ImageFile>) {
        self.accept_first(files);
    }

    /// Validate the first file and forward it, or report why it was refused
    ///
    /// Extra files are ignored, as is an empty selection.
    pub fn accept_first(&self, files: Vec<ImageFile>) {
        let offered = files.len();
        let Some(file) = files.into_iter().next() else {
            log::debug!("Empty file selection ignored");
            return;
        };
        if offered > 1 {
            log::debug!("{} files offered; only {:?} is used", offered, file.name());
        }

        match self.validator.validate_file(&file) {
            Ok(()) => {
                log::info!(
                    "Accepted {:?} ({}, {} bytes)",
                    file.name(),
                    file.mime_type(),
                    file.size()
                );
                command::send(&self.commands, Command::FileAccepted(file));
            },
            Err(e) => {
                log::warn!("Rejected {:?}: {}", file.name(), e);
                command::send(&self.commands, Command::ShowError(e.to_string()));
            },
        }
    }
}
