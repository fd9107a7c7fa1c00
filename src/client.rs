//! Client side of the console.
//!
//! Resolves typed lines locally, forwards what the server should see, and
//! learns the server's command set once per connection.
//!
//! # Pipeline
//!
//! All systems run chained in `Update`:
//! 1. `track_link`: follow [`LinkEvent`]s, reset the sync on disconnect
//! 2. `rebuild_registry`: recreate the registry on [`ConsoleRebuildEvent`]
//! 3. `toggle_console`: subscribe/unsubscribe, send the list request
//! 4. [`handle_incoming`]: replies and command lists from the server
//! 5. `parse_console_input` / `execute_pending_commands` / `send_pending_outputs`

use bevy::prelude::*;

use crate::builtin;
use crate::core::{
    dispatch_line, CommandRegistry, CommandConstructor, CommandTable, ConsoleConfig,
    ConsoleOutputEvent, ConsoleRebuildEvent, ConsoleState, ConsoleToggleEvent, CONSOLE_DELIVERY,
    Dispatch, LinkEvent, MessageCategory, NetIncoming, NetMessage, NetOutgoing, PacketBuilder,
    PacketReader, Peer, ProtocolError, RemoteLink,
};
use crate::{
    add_console_core, collect_command_output, parse_console_input, send_pending_outputs,
    PendingCommands,
};

/// Client console plugin.
///
/// # Configuration
///
/// ```ignore
/// ClientConsolePlugin::default().with_command(my_command)
/// ```
pub struct ClientConsolePlugin {
    commands: Vec<CommandConstructor>,
}

impl Default for ClientConsolePlugin {
    fn default() -> Self {
        Self {
            commands: builtin::client_commands().to_vec(),
        }
    }
}

impl ClientConsolePlugin {
    /// A client console without the built-in commands.
    pub fn empty() -> Self {
        Self { commands: Vec::new() }
    }

    /// Add a command to the startup command table.
    pub fn with_command(mut self, constructor: CommandConstructor) -> Self {
        self.commands.push(constructor);
        self
    }
}

impl Plugin for ClientConsolePlugin {
    fn build(&self, app: &mut App) {
        add_console_core(app, CommandTable::new(self.commands.iter().copied()));

        app.init_resource::<SyncState>()
            .init_resource::<RemoteLink>();

        app.add_systems(Update, (
            track_link,
            rebuild_registry,
            toggle_console,
            handle_incoming,
            parse_console_input,
            execute_pending_commands,
            send_pending_outputs,
        ).chain());
    }
}

/// Whether the command list was requested on the current connection.
///
/// Gates sending only; every list reply that arrives is applied.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    requested: bool,
}

impl SyncState {
    /// Check if a request went out on this connection.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Allow the next activation to request again.
    #[inline]
    pub fn reset(&mut self) {
        self.requested = false;
    }

    /// Build the list request if one is due, marking it as sent.
    pub fn begin_request(&mut self, link: &RemoteLink) -> Option<NetOutgoing> {
        if !link.is_connected() || self.requested {
            return None;
        }
        self.requested = true;
        Some(PacketBuilder::new(NetMessage::ConsoleCommandRegister).send_to(Peer::Server, CONSOLE_DELIVERY))
    }
}

/// What one command list reply did to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Count the server advertised.
    pub advertised: u16,
    /// Stubs actually added.
    pub applied: usize,
    /// Name that stopped processing, if any.
    pub duplicate: Option<String>,
}

/// Apply a command list reply. `reader` must be positioned after the tag.
///
/// Stops at the first name the registry already holds; entries before it stay
/// registered and the rest of the reply is dropped.
pub fn apply_command_list(
    reader: &mut PacketReader,
    registry: &mut CommandRegistry,
) -> Result<SyncReport, ProtocolError> {
    let advertised = reader.read_u16()?;
    let mut report = SyncReport {
        advertised,
        ..default()
    };

    for _ in 0..advertised {
        let name = reader.read_string()?;
        let help = reader.read_string()?;
        let description = reader.read_string()?;

        if let Err(err) = registry.register_remote_stub(&name, &help, &description) {
            warn!(
                "Console: remote command list rejected ({}); dropping {} remaining entries",
                err,
                usize::from(advertised) - report.applied - 1
            );
            report.duplicate = Some(name);
            break;
        }
        report.applied += 1;
    }

    Ok(report)
}

/// Decode one incoming message, returning the line to append, if any.
///
/// Reads through a private reader; the message itself is never modified.
pub fn demux_message(
    msg: &NetIncoming,
    registry: &mut CommandRegistry,
    config: &ConsoleConfig,
) -> Option<ConsoleOutputEvent> {
    if msg.category != MessageCategory::Data {
        return None;
    }

    let mut reader = msg.reader();
    match reader.peek_tag()? {
        NetMessage::ConsoleCommandReply => {
            reader.read_u8().ok()?;
            match reader.read_string() {
                Ok(text) => Some(ConsoleOutputEvent::remote(format!("{}{}", config.reply_prefix, text))),
                Err(err) => {
                    warn!("Console: malformed reply from {:?}: {}", msg.sender, err);
                    None
                }
            }
        }
        NetMessage::ConsoleCommandRegister => {
            reader.read_u8().ok()?;
            match apply_command_list(&mut reader, registry) {
                Ok(report) => {
                    info!(
                        "Console: learned {} of {} remote commands",
                        report.applied, report.advertised
                    );
                }
                Err(err) => {
                    warn!("Console: malformed command list from {:?}: {}", msg.sender, err);
                }
            }
            None
        }
        _ => None,
    }
}

fn track_link(
    mut events: MessageReader<LinkEvent>,
    mut link: ResMut<RemoteLink>,
    mut sync: ResMut<SyncState>,
) {
    for event in events.read() {
        match event {
            LinkEvent::Connected => link.set_connected(true),
            LinkEvent::Disconnected => {
                link.set_connected(false);
                sync.reset();
            }
        }
    }
}

fn rebuild_registry(
    mut events: MessageReader<ConsoleRebuildEvent>,
    table: Res<CommandTable>,
    mut registry: ResMut<CommandRegistry>,
    mut sync: ResMut<SyncState>,
) {
    if events.read().count() == 0 {
        return;
    }

    // The same table built successfully at startup.
    match CommandRegistry::from_table(&table) {
        Ok(rebuilt) => {
            *registry = rebuilt;
            sync.reset();
            debug!("Console: registry rebuilt with {} commands", registry.len());
        }
        Err(err) => error!("Console: failed to rebuild registry: {}", err),
    }
}

fn toggle_console(
    mut events: MessageReader<ConsoleToggleEvent>,
    mut state: ResMut<ConsoleState>,
    mut sync: ResMut<SyncState>,
    link: Res<RemoteLink>,
    mut net: MessageWriter<NetOutgoing>,
) {
    for event in events.read() {
        if !event.open {
            state.deactivate();
            continue;
        }

        state.activate();
        if let Some(request) = sync.begin_request(&link) {
            debug!("Console: requesting remote command list");
            net.write(request);
        }
    }
}

/// System that handles incoming messages addressed to the console.
///
/// Runs every frame so messages are drained; while the console is hidden
/// they are dropped.
pub fn handle_incoming(
    mut incoming: MessageReader<NetIncoming>,
    state: Res<ConsoleState>,
    mut registry: ResMut<CommandRegistry>,
    config: Res<ConsoleConfig>,
    mut output: MessageWriter<ConsoleOutputEvent>,
) {
    for msg in incoming.read() {
        if !state.is_subscribed() {
            continue;
        }
        if let Some(line) = demux_message(msg, &mut registry, &config) {
            output.write(line);
        }
    }
}

/// Forward a raw line to the server if it is reachable.
fn forward_line(world: &mut World, raw: &str) -> bool {
    if !world.resource::<RemoteLink>().is_connected() {
        debug!("Console: not connected, '{}' stays local", raw);
        return false;
    }

    let packet = PacketBuilder::new(NetMessage::ConsoleCommand)
        .write_string(raw)
        .send_to(Peer::Server, CONSOLE_DELIVERY);
    world.resource_mut::<PendingCommands>().outgoing.push(packet);
    true
}

/// Exclusive system that runs queued lines with full World access.
fn execute_pending_commands(world: &mut World) {
    let queue = std::mem::take(&mut world.resource_mut::<PendingCommands>().queue);

    for cmd in queue {
        let outcome = dispatch_line(world, &cmd.raw);
        let lines = collect_command_output(world);
        world.resource_mut::<PendingCommands>().outputs.extend(lines);

        match outcome {
            Dispatch::Empty | Dispatch::Handled => {}
            Dispatch::Forward => {
                forward_line(world, &cmd.raw);
            }
            Dispatch::Unresolved(_) => {
                if !forward_line(world, &cmd.raw) {
                    world
                        .resource_mut::<PendingCommands>()
                        .outputs
                        .push(ConsoleOutputEvent::error(format!("Unknown command: '{}'", cmd.raw.trim())));
                }
            }
            Dispatch::Panicked { name, message } => {
                error!("Console: command '{}' panicked: {}", name, message);
                world
                    .resource_mut::<PendingCommands>()
                    .outputs
                    .push(ConsoleOutputEvent::error(format!("Command '{}' panicked: {}", name, message)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClientId, ConCommand, ForwardDecision};

    fn list_reply(entries: &[(&str, &str, &str)]) -> NetIncoming {
        let mut builder = PacketBuilder::new(NetMessage::ConsoleCommandRegister)
            .write_u16(entries.len() as u16);
        for (name, help, desc) in entries {
            builder = builder.write_string(name).write_string(help).write_string(desc);
        }
        NetIncoming::data(Peer::Server, builder.finish())
    }

    #[test]
    fn test_begin_request_once() {
        let link = RemoteLink::new(true);
        let mut sync = SyncState::default();

        let request = sync.begin_request(&link).unwrap();
        assert_eq!(request.tag(), Some(NetMessage::ConsoleCommandRegister));
        assert_eq!(request.target, Peer::Server);
        assert_eq!(request.delivery, CONSOLE_DELIVERY);
        assert!(sync.begin_request(&link).is_none());

        sync.reset();
        assert!(sync.begin_request(&link).is_some());
    }

    #[test]
    fn test_begin_request_offline() {
        let mut sync = SyncState::default();
        assert!(sync.begin_request(&RemoteLink::new(false)).is_none());
        assert!(!sync.is_requested());
    }

    #[test]
    fn test_apply_command_list() {
        let mut registry = CommandRegistry::new();
        let msg = list_reply(&[("ping", "h", "d"), ("pong", "h2", "d2")]);

        let line = demux_message(&msg, &mut registry, &ConsoleConfig::default());
        assert!(line.is_none());
        assert!(registry.lookup("ping").unwrap().is_remote_stub());
        assert_eq!(registry.lookup("pong").unwrap().get_help(), "h2");
    }

    #[test]
    fn test_duplicate_stops_rest_of_reply() {
        let mut registry = CommandRegistry::new();
        let msg = list_reply(&[("foo", "", ""), ("bar", "", ""), ("foo", "x", "x"), ("baz", "", "")]);

        let mut reader = msg.reader();
        reader.read_u8().unwrap();
        let report = apply_command_list(&mut reader, &mut registry).unwrap();

        assert_eq!(report.advertised, 4);
        assert_eq!(report.applied, 2);
        assert_eq!(report.duplicate.as_deref(), Some("foo"));
        assert_eq!(registry.lookup("foo").unwrap().get_help(), "");
        assert!(registry.lookup("bar").is_some());
        assert!(registry.lookup("baz").is_none());
    }

    #[test]
    fn test_duplicate_of_local_command() {
        let mut registry = CommandRegistry::from_commands([
            ConCommand::new("help", |_, _| ForwardDecision::LocalOnly),
        ])
        .unwrap();
        let msg = list_reply(&[("help", "", ""), ("kick", "", "")]);

        demux_message(&msg, &mut registry, &ConsoleConfig::default());
        assert!(!registry.lookup("help").unwrap().is_remote_stub());
        assert!(registry.lookup("kick").is_none());
    }

    #[test]
    fn test_second_reply_is_applied_too() {
        let mut registry = CommandRegistry::new();
        let config = ConsoleConfig::default();

        demux_message(&list_reply(&[("a", "", "")]), &mut registry, &config);
        demux_message(&list_reply(&[("b", "", "")]), &mut registry, &config);
        assert_eq!(registry.remote_stub_count(), 2);
    }

    #[test]
    fn test_truncated_list_keeps_applied_entries() {
        let payload = PacketBuilder::new(NetMessage::ConsoleCommandRegister)
            .write_u16(3)
            .write_string("one")
            .write_string("")
            .write_string("")
            .write_string("two")
            .finish();
        let msg = NetIncoming::data(Peer::Server, payload);
        let mut registry = CommandRegistry::new();

        let mut reader = msg.reader();
        reader.read_u8().unwrap();
        assert!(apply_command_list(&mut reader, &mut registry).is_err());
        assert!(registry.lookup("one").is_some());
        assert!(registry.lookup("two").is_none());
    }

    #[test]
    fn test_reply_line_uses_prefix() {
        let payload = PacketBuilder::new(NetMessage::ConsoleCommandReply)
            .write_string("Player count: 3")
            .finish();
        let msg = NetIncoming::data(Peer::Server, payload);
        let config = ConsoleConfig {
            reply_prefix: "[srv] ".into(),
            ..default()
        };

        let line = demux_message(&msg, &mut CommandRegistry::new(), &config).unwrap();
        assert_eq!(line, ConsoleOutputEvent::remote("[srv] Player count: 3"));
    }

    #[test]
    fn test_non_data_and_foreign_tags_ignored() {
        let mut registry = CommandRegistry::new();
        let config = ConsoleConfig::default();
        let reply = PacketBuilder::new(NetMessage::ConsoleCommandReply)
            .write_string("x")
            .finish();

        let status = NetIncoming::new(Peer::Server, MessageCategory::StatusChanged, reply);
        assert!(demux_message(&status, &mut registry, &config).is_none());

        let chat = NetIncoming::data(
            Peer::Client(ClientId(2)),
            PacketBuilder::new(NetMessage::ChatMessage).write_u8(1).write_string("hi").finish(),
        );
        assert!(demux_message(&chat, &mut registry, &config).is_none());

        let unknown = NetIncoming::data(Peer::Server, vec![0xEEu8, 1, 2]);
        assert!(demux_message(&unknown, &mut registry, &config).is_none());

        let empty = NetIncoming::data(Peer::Server, Vec::<u8>::new());
        assert!(demux_message(&empty, &mut registry, &config).is_none());
    }

    #[test]
    fn test_message_unchanged_after_any_branch() {
        let mut registry = CommandRegistry::new();
        let config = ConsoleConfig::default();
        let messages = [
            list_reply(&[("ping", "h", "d")]),
            NetIncoming::data(
                Peer::Server,
                PacketBuilder::new(NetMessage::ConsoleCommandReply).write_string("ok").finish(),
            ),
            NetIncoming::data(Peer::Server, vec![NetMessage::ChatMessage.as_byte(), 0]),
        ];

        for msg in &messages {
            let before = msg.payload().clone();
            demux_message(msg, &mut registry, &config);

            let reader = msg.reader();
            assert_eq!(reader.position(), 0);
            assert_eq!(reader.peek_u8(), before.first().copied());
            assert_eq!(msg.payload(), &before);
        }
    }
}
