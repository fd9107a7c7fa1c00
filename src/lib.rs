//! A client/server developer console for Bevy.
//!
//! bevy_netconsole provides:
//!
//! - **ConCommand**: Named commands that run locally, forward to the server, or both
//! - **ClientConsolePlugin**: Local dispatch, forwarding, and a once-per-connection
//!   sync of the server's command list
//! - **ServerConsolePlugin**: Runs forwarded lines and answers command list requests
//! - **Transport-agnostic**: Packets go in and out as [`NetIncoming`] / [`NetOutgoing`] messages
//!
//! # Features
//!
//! - `persist` (default): RON config file for [`ConsoleConfig`]
//! - `log-capture`: mirror WARN/ERROR logs onto the console surface
//! - `terminal`: stdin/stdout surface for dedicated servers
//! - `full`: Enable persist + log-capture
//!
//! # Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_netconsole::prelude::*;
//!
//! fn spawn_command() -> ConCommand {
//!     ConCommand::new("spawn", |args, world| {
//!         match args.parse::<u32>(0) {
//!             Some(count) => {
//!                 CommandOutput::write(world, ConsoleOutputEvent::result(format!("spawning {count}")));
//!                 ForwardDecision::Forward
//!             }
//!             None => {
//!                 CommandOutput::write(world, ConsoleOutputEvent::error("Usage: spawn <count>"));
//!                 ForwardDecision::LocalOnly
//!             }
//!         }
//!     })
//!     .help("spawn <count>")
//!     .description("Spawn entities here and on the server")
//! }
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(ClientConsolePlugin::default().with_command(spawn_command))
//!         .run();
//! }
//! ```

use bevy::prelude::*;

// Core module (always available, zero optional deps)
pub mod core;

pub mod builtin;
pub mod client;
pub mod server;

// Log capture (feature-gated)
#[cfg(feature = "log-capture")]
pub mod logging;

// Terminal backend (feature-gated)
#[cfg(feature = "terminal")]
pub mod terminal;

// Persistence module (feature-gated)
#[cfg(feature = "persist")]
pub mod persist;

// Re-export core types at crate root for convenience
pub use core::{
    CommandArgs, CommandBehavior, CommandConstructor, CommandHandler, CommandTable, ConCommand,
    ForwardDecision,
    CommandRegistry, RegistryError,
    tokenize, dispatch_line, Dispatch, CommandOutput, ConsoleState, RemoteLink,
    ConsoleConfig,
    ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel,
    ConsoleToggleEvent, ConsoleClearEvent, ConsoleRebuildEvent, ConsoleEventsPlugin,
    NetMessage, ChatChannel, DeliveryMethod, CONSOLE_DELIVERY, MessageCategory, ClientId, Peer,
    NetIncoming, NetOutgoing, LinkEvent, PacketBuilder, PacketReader, ProtocolError,
};

pub use client::{ClientConsolePlugin, SyncState};
pub use server::ServerConsolePlugin;

#[cfg(feature = "persist")]
pub use persist::{ConfigError, ConfigPath};

#[cfg(feature = "terminal")]
pub use terminal::{TerminalPlugin, TerminalConfig};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::core::{
        CommandArgs, ConCommand, ForwardDecision, CommandOutput,
        CommandRegistry, ConsoleConfig,
        ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel, ConsoleToggleEvent,
        NetIncoming, NetOutgoing, LinkEvent, Peer, ClientId,
        tokenize,
    };
    pub use crate::{ClientConsolePlugin, ServerConsolePlugin};
}

/// Where a queued line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOrigin {
    /// Typed into this side's own console surface.
    Local,
    /// Forwarded by a connected client.
    Remote(ClientId),
}

/// Queued line for execution.
#[derive(Debug, Clone)]
struct QueuedCommand {
    /// Raw line as submitted.
    raw: String,
    origin: LineOrigin,
}

/// Resource that holds pending command executions and their effects.
#[derive(Resource, Default)]
struct PendingCommands {
    queue: Vec<QueuedCommand>,
    outputs: Vec<ConsoleOutputEvent>,
    outgoing: Vec<NetOutgoing>,
    clear_console: bool,
}

/// Register the pieces both console sides need.
fn add_console_core(app: &mut App, table: CommandTable) {
    if !app.is_plugin_added::<ConsoleEventsPlugin>() {
        app.add_plugins(ConsoleEventsPlugin);
    }

    // A name collision in the command table is a programming error.
    let registry = CommandRegistry::from_table(&table)
        .unwrap_or_else(|err| panic!("Console: invalid command table: {err}"));
    debug!("Console: registered {} commands", registry.len());

    app.insert_resource(registry)
        .insert_resource(table)
        .init_resource::<CommandOutput>()
        .init_resource::<PendingCommands>()
        .init_resource::<ConsoleConfig>()
        .init_resource::<ConsoleState>();

    #[cfg(feature = "persist")]
    {
        app.init_resource::<persist::ConfigPath>()
            .add_systems(Startup, persist::load_config_on_startup);
    }
}

/// System that echoes submitted lines and queues them for execution.
fn parse_console_input(
    mut input_events: MessageReader<ConsoleInputEvent>,
    mut pending: ResMut<PendingCommands>,
    config: Res<ConsoleConfig>,
) {
    for event in input_events.read() {
        if event.command.trim().is_empty() {
            continue;
        }

        if config.echo_input {
            pending.outputs.push(ConsoleOutputEvent::command(format!("$ {}", event.command)));
        }

        pending.queue.push(QueuedCommand {
            raw: event.command.clone(),
            origin: LineOrigin::Local,
        });
    }
}

/// Move everything the last command produced into the pending buffers.
fn collect_command_output(world: &mut World) -> Vec<ConsoleOutputEvent> {
    let mut output = world.resource_mut::<CommandOutput>();
    let lines = output.take_lines();
    let outgoing = output.take_outgoing();
    let clear = output.take_clear();

    let mut pending = world.resource_mut::<PendingCommands>();
    pending.outgoing.extend(outgoing);
    pending.clear_console |= clear;
    lines
}

/// System that sends queued output events and packets.
fn send_pending_outputs(
    mut pending: ResMut<PendingCommands>,
    mut output_events: MessageWriter<ConsoleOutputEvent>,
    mut net_events: MessageWriter<NetOutgoing>,
    mut clear_events: MessageWriter<ConsoleClearEvent>,
) {
    for output in pending.outputs.drain(..) {
        output_events.write(output);
    }
    for packet in pending.outgoing.drain(..) {
        net_events.write(packet);
    }
    if pending.clear_console {
        pending.clear_console = false;
        clear_events.write(ConsoleClearEvent);
    }
}
