//! Server side of the console.
//!
//! Runs lines typed on the server's own surface and lines forwarded by
//! clients. Output of a forwarded line goes back to the client that sent it as
//! `ConsoleCommandReply` packets. Command list requests are answered with the
//! server's local commands.

use bevy::prelude::*;
use bytes::Bytes;

use crate::builtin;
use crate::core::{
    dispatch_line, ClientId, CommandConstructor, CommandRegistry, CommandTable, ConsoleConfig,
    ConsoleOutputEvent, DeliveryMethod, Dispatch, MessageCategory, NetIncoming, NetMessage, NetOutgoing,
    PacketBuilder, Peer, ProtocolError, CONSOLE_DELIVERY,
};
use crate::{
    add_console_core, collect_command_output, parse_console_input, send_pending_outputs,
    LineOrigin, PendingCommands, QueuedCommand,
};

/// Server console plugin.
pub struct ServerConsolePlugin {
    commands: Vec<CommandConstructor>,
}

impl Default for ServerConsolePlugin {
    fn default() -> Self {
        Self {
            commands: builtin::server_commands().to_vec(),
        }
    }
}

impl ServerConsolePlugin {
    /// A server console without the built-in commands.
    pub fn empty() -> Self {
        Self { commands: Vec::new() }
    }

    /// Add a command to the startup command table.
    pub fn with_command(mut self, constructor: CommandConstructor) -> Self {
        self.commands.push(constructor);
        self
    }
}

impl Plugin for ServerConsolePlugin {
    fn build(&self, app: &mut App) {
        add_console_core(app, CommandTable::new(self.commands.iter().copied()));

        #[cfg(feature = "terminal")]
        if !app.is_plugin_added::<crate::terminal::TerminalPlugin>() {
            app.add_plugins(crate::terminal::TerminalPlugin);
        }

        app.add_systems(Update, (
            serve_remote_requests,
            parse_console_input,
            execute_pending_commands,
            send_pending_outputs,
        ).chain());
    }
}

/// Encode the command list reply for the given registry.
///
/// Only local commands are listed. Anything past `u16::MAX` entries is left out.
pub fn encode_command_list(registry: &CommandRegistry) -> Bytes {
    let commands = registry.local_commands();
    let count = match u16::try_from(commands.len()) {
        Ok(count) => count,
        Err(_) => {
            warn!(
                "Console: {} commands exceed the list limit, sending the first {}",
                commands.len(),
                u16::MAX
            );
            u16::MAX
        }
    };

    let mut builder = PacketBuilder::new(NetMessage::ConsoleCommandRegister).write_u16(count);
    for cmd in commands.iter().take(usize::from(count)) {
        builder = builder
            .write_string(cmd.name())
            .write_string(cmd.get_help())
            .write_string(cmd.get_description());
    }
    builder.finish()
}

/// What the server should do with one incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    /// The client wants the command list.
    CommandList(ClientId),
    /// The client forwarded a line.
    Line(ClientId, String),
}

/// Classify one incoming message. `Ok(None)` means it is not for the console.
pub fn decode_request(msg: &NetIncoming) -> Result<Option<RemoteRequest>, ProtocolError> {
    let Peer::Client(client) = msg.sender else {
        return Ok(None);
    };
    if msg.category != MessageCategory::Data {
        return Ok(None);
    }

    let mut reader = msg.reader();
    match reader.peek_tag() {
        Some(NetMessage::ConsoleCommandRegister) => Ok(Some(RemoteRequest::CommandList(client))),
        Some(NetMessage::ConsoleCommand) => {
            reader.read_u8()?;
            Ok(Some(RemoteRequest::Line(client, reader.read_string()?)))
        }
        _ => Ok(None),
    }
}

fn serve_remote_requests(
    mut incoming: MessageReader<NetIncoming>,
    registry: Res<CommandRegistry>,
    mut pending: ResMut<PendingCommands>,
) {
    for msg in incoming.read() {
        match decode_request(msg) {
            Ok(Some(RemoteRequest::CommandList(client))) => {
                debug!("Console: sending command list to {:?}", client);
                pending.outgoing.push(NetOutgoing {
                    target: Peer::Client(client),
                    delivery: CONSOLE_DELIVERY,
                    payload: encode_command_list(&registry),
                });
            }
            Ok(Some(RemoteRequest::Line(client, raw))) => {
                debug!("Console: {:?} ran '{}'", client, raw);
                pending.queue.push(QueuedCommand {
                    raw,
                    origin: LineOrigin::Remote(client),
                });
            }
            Ok(None) => {}
            Err(err) => warn!("Console: malformed request from {:?}: {}", msg.sender, err),
        }
    }
}

fn reply(pending: &mut PendingCommands, client: ClientId, delivery: DeliveryMethod, text: &str) {
    pending.outgoing.push(
        PacketBuilder::new(NetMessage::ConsoleCommandReply)
            .write_string(text)
            .send_to(Peer::Client(client), delivery),
    );
}

/// Exclusive system that runs queued lines and routes their output.
fn execute_pending_commands(world: &mut World) {
    let queue = std::mem::take(&mut world.resource_mut::<PendingCommands>().queue);
    let delivery = world.resource::<ConsoleConfig>().reply_delivery;

    for cmd in queue {
        let outcome = dispatch_line(world, &cmd.raw);
        let mut lines = collect_command_output(world);

        match outcome {
            Dispatch::Empty | Dispatch::Handled | Dispatch::Forward => {}
            Dispatch::Unresolved(_) => {
                lines.push(ConsoleOutputEvent::error(format!("Unknown command: '{}'", cmd.raw.trim())));
            }
            Dispatch::Panicked { name, message } => {
                error!("Console: command '{}' panicked: {}", name, message);
                lines.push(ConsoleOutputEvent::error(format!("Command '{}' panicked: {}", name, message)));
            }
        }

        let mut pending = world.resource_mut::<PendingCommands>();
        match cmd.origin {
            LineOrigin::Local => pending.outputs.extend(lines),
            LineOrigin::Remote(client) => {
                for line in lines {
                    reply(&mut pending, client, delivery, &line.message);
                }
            }
        }
    }
}
