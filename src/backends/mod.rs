//! Backend implementations for the inference boundary
//!
//! - External program backend (runs a background removal CLI)
//! - Scripted backend (replays progress and a fixed outcome; for tests and demos)

pub mod command;
pub mod scripted;

pub use self::command::{CommandBackend, CommandBackendConfig};
pub use self::scripted::{test_png, ScriptedBackend};
