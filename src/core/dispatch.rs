//! Line dispatch shared by both console sides.
//!
//! [`dispatch_line`] tokenizes a line, resolves it against the
//! [`CommandRegistry`] in the world and runs it. It never fails: every
//! outcome is a [`Dispatch`] variant the calling side routes on.

use std::panic::{self, AssertUnwindSafe};

use bevy::prelude::*;

use super::{
    tokenize, CommandArgs, CommandRegistry, ConsoleOutputEvent, NetOutgoing,
};

/// Outcome of dispatching one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Blank line; nothing ran.
    Empty,
    /// A command ran and asked to stay local.
    Handled,
    /// The line should be sent to the remote side.
    Forward,
    /// No command with this name is registered.
    Unresolved(String),
    /// The command's handler panicked.
    Panicked {
        /// Command name.
        name: String,
        /// Panic payload, if it was a string.
        message: String,
    },
}

/// Whether the remote side is currently reachable.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteLink {
    connected: bool,
}

impl RemoteLink {
    /// Create a link in the given state.
    pub fn new(connected: bool) -> Self {
        Self { connected }
    }

    /// Check if the remote side is reachable.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Update the connection state.
    #[inline]
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

/// Whether the console surface is active and subscribed to incoming messages.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleState {
    subscribed: bool,
}

impl ConsoleState {
    /// Subscribe. Returns `true` if the console was inactive before.
    pub fn activate(&mut self) -> bool {
        !std::mem::replace(&mut self.subscribed, true)
    }

    /// Unsubscribe. Returns `true` if the console was active before.
    pub fn deactivate(&mut self) -> bool {
        std::mem::replace(&mut self.subscribed, false)
    }

    /// Check if incoming messages are being handled.
    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}

/// Side effects collected from commands while they run.
///
/// Handlers reach it through the world:
///
/// ```ignore
/// ConCommand::new("ping", |_args, world| {
///     CommandOutput::write(world, ConsoleOutputEvent::result("pong"));
///     ForwardDecision::LocalOnly
/// })
/// ```
#[derive(Resource, Default, Debug)]
pub struct CommandOutput {
    lines: Vec<ConsoleOutputEvent>,
    outgoing: Vec<NetOutgoing>,
    clear: bool,
}

impl CommandOutput {
    /// Append a line to the output of the running command.
    ///
    /// Falls back to the log when the world has no console.
    pub fn write(world: &mut World, line: ConsoleOutputEvent) {
        match world.get_resource_mut::<CommandOutput>() {
            Some(mut output) => output.push(line),
            None => info!("{}", line.message),
        }
    }

    /// Append a line.
    pub fn push(&mut self, line: ConsoleOutputEvent) {
        self.lines.push(line);
    }

    /// Queue a packet for the transport.
    pub fn send(&mut self, packet: NetOutgoing) {
        self.outgoing.push(packet);
    }

    /// Ask the surface to clear itself.
    pub fn clear_console(&mut self) {
        self.clear = true;
    }

    /// Take the collected lines.
    pub fn take_lines(&mut self) -> Vec<ConsoleOutputEvent> {
        std::mem::take(&mut self.lines)
    }

    /// Take the queued packets.
    pub fn take_outgoing(&mut self) -> Vec<NetOutgoing> {
        std::mem::take(&mut self.outgoing)
    }

    /// Take and reset the clear request.
    pub fn take_clear(&mut self) -> bool {
        std::mem::take(&mut self.clear)
    }
}

/// Tokenize, resolve and run one line against the world's registry.
///
/// A panicking handler is contained and reported as [`Dispatch::Panicked`].
pub fn dispatch_line(world: &mut World, line: &str) -> Dispatch {
    let tokens = tokenize(line);
    let Some((name, rest)) = tokens.split_first() else {
        return Dispatch::Empty;
    };

    let cmd = world
        .get_resource::<CommandRegistry>()
        .and_then(|registry| registry.lookup(name))
        .cloned();
    let Some(cmd) = cmd else {
        return Dispatch::Unresolved(name.clone());
    };

    let args = CommandArgs::new(line, rest.iter().map(String::as_str).collect());
    match panic::catch_unwind(AssertUnwindSafe(|| cmd.execute(&args, world))) {
        Ok(decision) if decision.forwards() => Dispatch::Forward,
        Ok(_) => Dispatch::Handled,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            Dispatch::Panicked {
                name: name.clone(),
                message,
            }
        }
    }
}
