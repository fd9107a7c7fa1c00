//! Built-in commands.
//!
//! The client gets `help`, `cls`, `quit` and `sendchat`; the server gets
//! `commands` and `echo`. Server names are chosen so they never collide with
//! client names during the command list sync.

use bevy::prelude::*;

use crate::core::{
    ChatChannel, CommandArgs, CommandConstructor, CommandOutput, CommandRegistry, ConCommand,
    ConsoleOutputEvent, ForwardDecision, NetMessage, PacketBuilder, Peer, RemoteLink,
    CONSOLE_DELIVERY,
};

const CLIENT_COMMANDS: &[CommandConstructor] = &[help, cls, quit, sendchat];
const SERVER_COMMANDS: &[CommandConstructor] = &[commands, echo];

/// Commands every client console starts with.
pub fn client_commands() -> &'static [CommandConstructor] {
    CLIENT_COMMANDS
}

/// Commands every server console starts with.
pub fn server_commands() -> &'static [CommandConstructor] {
    SERVER_COMMANDS
}

/// One line per command, sorted by name. Remote commands are marked.
fn command_listing(registry: &CommandRegistry) -> Vec<ConsoleOutputEvent> {
    let mut lines = Vec::with_capacity(registry.len() + 1);
    lines.push(ConsoleOutputEvent::info(format!("{} commands:", registry.len())));

    for cmd in registry.list() {
        let marker = if cmd.is_remote_stub() { " [server]" } else { "" };
        let line = if cmd.get_description().is_empty() {
            format!("  {}{}", cmd.name(), marker)
        } else {
            format!("  {}{} - {}", cmd.name(), marker, cmd.get_description())
        };
        lines.push(ConsoleOutputEvent::info(line));
    }
    lines
}

fn write_all(world: &mut World, lines: Vec<ConsoleOutputEvent>) {
    let mut output = world.resource_mut::<CommandOutput>();
    for line in lines {
        output.push(line);
    }
}

fn help() -> ConCommand {
    ConCommand::new("help", |args, world| {
        let lines = {
            let registry = world.resource::<CommandRegistry>();
            match args.get(0) {
                None => command_listing(registry),
                Some(name) => match registry.lookup(name) {
                    Some(cmd) => {
                        let mut lines = vec![ConsoleOutputEvent::info(format!("{}: {}", cmd.name(), cmd.get_description()))];
                        if !cmd.get_help().is_empty() {
                            lines.push(ConsoleOutputEvent::info(format!("  usage: {}", cmd.get_help())));
                        }
                        lines
                    }
                    None => vec![ConsoleOutputEvent::error(format!("Unknown command: '{}'", name))],
                },
            }
        };
        write_all(world, lines);
        ForwardDecision::LocalOnly
    })
    .help("help [command]")
    .description("List commands, or show help for one")
}

fn cls() -> ConCommand {
    ConCommand::new("cls", |_, world| {
        world.resource_mut::<CommandOutput>().clear_console();
        ForwardDecision::LocalOnly
    })
    .help("cls")
    .description("Clear the console")
}

fn quit() -> ConCommand {
    ConCommand::new("quit", |_, world| {
        world.write_message(AppExit::Success);
        ForwardDecision::LocalOnly
    })
    .help("quit")
    .description("Exit the application")
}

/// A single argument is sent as parsed, so quotes group text without ending
/// up in the message. Anything longer is sent as typed.
fn chat_text<'a>(args: &'a CommandArgs) -> &'a str {
    match args.get(0) {
        Some(text) if args.len() == 1 => text,
        _ => args.tail(),
    }
}

fn sendchat() -> ConCommand {
    ConCommand::new("sendchat", |args, world| {
        if args.is_empty() {
            CommandOutput::write(world, ConsoleOutputEvent::error("Usage: sendchat <text>"));
            return ForwardDecision::LocalOnly;
        }
        if !world.resource::<RemoteLink>().is_connected() {
            CommandOutput::write(world, ConsoleOutputEvent::error("Not connected to a server"));
            return ForwardDecision::LocalOnly;
        }

        let packet = PacketBuilder::new(NetMessage::ChatMessage)
            .write_u8(ChatChannel::Player as u8)
            .write_string(chat_text(args))
            .send_to(Peer::Server, CONSOLE_DELIVERY);
        world.resource_mut::<CommandOutput>().send(packet);
        ForwardDecision::LocalOnly
    })
    .help("sendchat <text>")
    .description("Send a chat message to the server")
}

fn commands() -> ConCommand {
    ConCommand::new("commands", |_, world| {
        let lines = command_listing(world.resource::<CommandRegistry>());
        write_all(world, lines);
        ForwardDecision::LocalOnly
    })
    .help("commands")
    .description("List server commands")
}

fn echo() -> ConCommand {
    ConCommand::new("echo", |args, world| {
        CommandOutput::write(world, ConsoleOutputEvent::result(args.join(" ")));
        ForwardDecision::LocalOnly
    })
    .help("echo <text>")
    .description("Print the arguments back")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{dispatch_line, CommandTable};

    fn world_for(table: &[CommandConstructor], connected: bool) -> World {
        let mut world = World::new();
        let table = CommandTable::new(table.iter().copied());
        world.insert_resource(CommandRegistry::from_table(&table).unwrap());
        world.init_resource::<CommandOutput>();
        world.insert_resource(RemoteLink::new(connected));
        world
    }

    fn lines(world: &mut World) -> Vec<String> {
        world
            .resource_mut::<CommandOutput>()
            .take_lines()
            .into_iter()
            .map(|line| line.message)
            .collect()
    }

    #[test]
    fn test_builtin_names_do_not_collide() {
        let mut names: Vec<String> = client_commands()
            .iter()
            .chain(server_commands())
            .map(|ctor| ctor().name().to_string())
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_help_marks_remote_commands() {
        let mut world = world_for(client_commands(), false);
        world
            .resource_mut::<CommandRegistry>()
            .register_remote_stub("kick", "kick <name>", "Kick a player")
            .unwrap();

        dispatch_line(&mut world, "help");
        let out = lines(&mut world);
        assert_eq!(out[0], "5 commands:");
        assert!(out.contains(&"  kick [server] - Kick a player".to_string()));
        assert!(out.contains(&"  cls - Clear the console".to_string()));

        dispatch_line(&mut world, "help kick");
        assert_eq!(lines(&mut world), vec!["kick: Kick a player", "  usage: kick <name>"]);
    }

    #[test]
    fn test_help_unknown_name() {
        let mut world = world_for(client_commands(), false);
        dispatch_line(&mut world, "help nope");
        assert_eq!(lines(&mut world), vec!["Unknown command: 'nope'"]);
    }

    #[test]
    fn test_sendchat_usage() {
        let mut world = world_for(client_commands(), true);
        dispatch_line(&mut world, "sendchat");
        assert_eq!(lines(&mut world), vec!["Usage: sendchat <text>"]);
        assert!(world.resource_mut::<CommandOutput>().take_outgoing().is_empty());
    }

    #[test]
    fn test_sendchat_keeps_spacing() {
        let mut world = world_for(client_commands(), true);

        for (line, expected) in [
            ("sendchat gg  all", "gg  all"),
            (r#"sendchat "gg  all""#, "gg  all"),
            ("sendchat   hi", "hi"),
        ] {
            dispatch_line(&mut world, line);
            let sent = world.resource_mut::<CommandOutput>().take_outgoing();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].delivery, CONSOLE_DELIVERY);

            let mut reader = sent[0].reader();
            reader.read_u8().unwrap();
            reader.read_u8().unwrap();
            assert_eq!(reader.read_string().unwrap(), expected);
        }
    }

    #[test]
    fn test_echo() {
        let mut world = world_for(server_commands(), false);
        dispatch_line(&mut world, r#"echo "a  b" c"#);
        assert_eq!(lines(&mut world), vec!["a  b c"]);
    }

    #[test]
    fn test_commands_lists_server_side() {
        let mut world = world_for(server_commands(), false);
        dispatch_line(&mut world, "commands");
        let out = lines(&mut world);
        assert_eq!(out[0], "2 commands:");
        assert_eq!(out[1], "  commands - List server commands");
        assert_eq!(out[2], "  echo - Print the arguments back");
    }
}
