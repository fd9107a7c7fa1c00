//! Console events for communication between layers.
//!
//! Events are the primary mechanism for:
//! - Surface -> Core: submitted lines, visibility changes
//! - Core -> Surface: lines to append, clear requests
//! - Transport <-> Core: see [`protocol`](super::protocol)

use bevy::prelude::*;

use super::{LinkEvent, NetIncoming, NetOutgoing};

/// Event sent when a line is submitted to the console.
///
/// # Examples
///
/// ```ignore
/// fn submit(mut events: MessageWriter<ConsoleInputEvent>) {
///     events.write(ConsoleInputEvent::new("help"));
/// }
/// ```
#[derive(Message, Debug, Clone)]
pub struct ConsoleInputEvent {
    /// The raw line as typed.
    pub command: String,
}

impl ConsoleInputEvent {
    /// Create a new input event.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// Event sent when a line should be appended to the console surface.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct ConsoleOutputEvent {
    /// The message text.
    pub message: String,
    /// Style hint for the surface.
    pub level: ConsoleOutputLevel,
}

/// Style hint for console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleOutputLevel {
    /// Debug information (gray).
    Debug,
    /// General information (white).
    #[default]
    Info,
    /// Warning (yellow).
    Warn,
    /// Error (red).
    Error,
    /// Echo of a submitted line.
    Command,
    /// Result of a local command.
    Result,
    /// Reply text from the remote side (royal blue).
    Remote,
}

impl ConsoleOutputEvent {
    /// Create a new output event.
    pub fn new(level: ConsoleOutputLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }

    /// Create an info message.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Info, message)
    }

    /// Create a warning message.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Warn, message)
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Error, message)
    }

    /// Create a command echo message.
    pub fn command(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Command, message)
    }

    /// Create a result message.
    pub fn result(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Result, message)
    }

    /// Create a remote reply message.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Remote, message)
    }
}

/// Event sent when the console surface is shown or hidden.
///
/// Showing the console subscribes it to incoming messages and, on a client,
/// starts the command list sync.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleToggleEvent {
    /// Whether the console is now open.
    pub open: bool,
}

impl ConsoleToggleEvent {
    /// Create an event for opening the console.
    pub fn opened() -> Self {
        Self { open: true }
    }

    /// Create an event for closing the console.
    pub fn closed() -> Self {
        Self { open: false }
    }
}

/// Event requesting the console to clear its output buffer.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ConsoleClearEvent;

/// Event sent when the console surface is recreated.
///
/// The registry is rebuilt from its command table, dropping everything
/// learned from the remote side.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ConsoleRebuildEvent;

/// Plugin that registers all console and transport messages.
pub struct ConsoleEventsPlugin;

impl Plugin for ConsoleEventsPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ConsoleInputEvent>()
            .add_message::<ConsoleOutputEvent>()
            .add_message::<ConsoleToggleEvent>()
            .add_message::<ConsoleClearEvent>()
            .add_message::<ConsoleRebuildEvent>()
            .add_message::<NetIncoming>()
            .add_message::<NetOutgoing>()
            .add_message::<LinkEvent>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_input_event() {
        let event = ConsoleInputEvent::new("help cls");
        assert_eq!(event.command, "help cls");
    }

    #[test]
    fn test_remote_output_event() {
        let event = ConsoleOutputEvent::remote("Server: pong");
        assert_eq!(event.level, ConsoleOutputLevel::Remote);
        assert_eq!(event.message, "Server: pong");
    }

    #[test]
    fn test_toggle_event() {
        assert!(ConsoleToggleEvent::opened().open);
        assert!(!ConsoleToggleEvent::closed().open);
    }
}
