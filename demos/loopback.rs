//! Client and server consoles wired through an in-process loopback.
//!
//! Shows the whole round trip: the client syncs the server's command list,
//! forwards a server command and prints the reply.
//!
//! Run with: `cargo run --example loopback`

use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use bevy_netconsole::prelude::*;
use bytes::Bytes;

/// One direction of the loopback.
#[derive(Resource, Clone, Default)]
struct Wire(Arc<Mutex<Vec<Bytes>>>);

/// Wire this app writes to and wire it reads from.
#[derive(Resource)]
struct Link {
    outbox: Wire,
    inbox: Wire,
    from: Peer,
}

fn transmit(mut outgoing: MessageReader<NetOutgoing>, link: Res<Link>) {
    if let Ok(mut outbox) = link.outbox.0.lock() {
        outbox.extend(outgoing.read().map(|packet| packet.payload.clone()));
    }
}

fn receive(link: Res<Link>, mut incoming: MessageWriter<NetIncoming>) {
    if let Ok(mut inbox) = link.inbox.0.lock() {
        for payload in inbox.drain(..) {
            incoming.write(NetIncoming::data(link.from, payload));
        }
    }
}

fn print_client_output(mut events: MessageReader<ConsoleOutputEvent>) {
    for event in events.read() {
        let prefix = match event.level {
            ConsoleOutputLevel::Debug => "[DEBUG]",
            ConsoleOutputLevel::Info => "[INFO]",
            ConsoleOutputLevel::Warn => "[WARN]",
            ConsoleOutputLevel::Error => "[ERROR]",
            ConsoleOutputLevel::Command => "[$]",
            ConsoleOutputLevel::Result => "[>]",
            ConsoleOutputLevel::Remote => "[server]",
        };
        println!("{} {}", prefix, event.message);
    }
}

fn status() -> ConCommand {
    ConCommand::new("status", |_args, world| {
        CommandOutput::write(world, ConsoleOutputEvent::result("map: dust, players: 1"));
        ForwardDecision::LocalOnly
    })
    .help("status")
    .description("Show server status")
}

fn wave() -> ConCommand {
    ConCommand::new("wave", |args, world| {
        let who = args.get(0).unwrap_or("everyone");
        CommandOutput::write(world, ConsoleOutputEvent::result(format!("you wave at {who}")));
        ForwardDecision::Forward
    })
    .description("Wave here, and tell the server")
}

fn console_app(plugin: impl Plugin, link: Link) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(plugin)
        .insert_resource(link)
        .add_systems(PreUpdate, receive)
        .add_systems(PostUpdate, transmit);
    app
}

fn main() {
    let to_server = Wire::default();
    let to_client = Wire::default();

    let mut server = console_app(
        ServerConsolePlugin::default().with_command(status),
        Link {
            outbox: to_client.clone(),
            inbox: to_server.clone(),
            from: Peer::Client(ClientId(1)),
        },
    );
    let mut client = console_app(
        ClientConsolePlugin::default().with_command(wave),
        Link {
            outbox: to_server,
            inbox: to_client,
            from: Peer::Server,
        },
    );
    client.add_systems(PostUpdate, print_client_output);

    client.world_mut().write_message(LinkEvent::Connected);
    client.world_mut().write_message(ConsoleToggleEvent::opened());

    let script = ["help", "status", "wave bob", "echo  hello from the client", "nosuch"];
    for line in script {
        client.world_mut().write_message(ConsoleInputEvent::new(line));
        // Client sends, server answers, client prints.
        for _ in 0..3 {
            client.update();
            server.update();
        }
    }
    client.update();
}
