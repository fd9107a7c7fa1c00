//! Terminal backend for a headless/dedicated server console.
//!
//! Lines read from stdin become [`ConsoleInputEvent`]s, console output is
//! written to stdout. The terminal is always an active surface.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread;

use bevy::prelude::*;

use crate::core::{
    ConsoleClearEvent, ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel, ConsoleState,
};

/// Plugin that adds terminal (stdin/stdout) console support.
pub struct TerminalPlugin;

impl Plugin for TerminalPlugin {
    fn build(&self, app: &mut App) {
        let (sender, receiver) = mpsc::channel();
        spawn_stdin_reader(sender);

        app.insert_resource(StdinReceiver(Mutex::new(receiver)))
            .init_resource::<TerminalConfig>()
            .add_systems(Startup, subscribe_terminal)
            .add_systems(Update, read_stdin)
            .add_systems(PostUpdate, write_stdout);
    }
}

/// Configuration for terminal behavior.
#[derive(Resource, Default)]
pub struct TerminalConfig {
    /// Whether to use colored output (ANSI escape codes).
    pub colored: bool,
}

#[derive(Resource)]
struct StdinReceiver(Mutex<Receiver<String>>);

fn spawn_stdin_reader(sender: Sender<String>) {
    let spawned = thread::Builder::new()
        .name("console-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines().map_while(Result::ok) {
                let text = line.trim().to_string();
                if !text.is_empty() && sender.send(text).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        error!("Console: could not start stdin reader: {}", err);
    }
}

fn subscribe_terminal(state: Option<ResMut<ConsoleState>>) {
    if let Some(mut state) = state {
        state.activate();
    }
}

fn read_stdin(receiver: Res<StdinReceiver>, mut events: MessageWriter<ConsoleInputEvent>) {
    let Ok(rx) = receiver.0.lock() else {
        return;
    };
    while let Ok(line) = rx.try_recv() {
        events.write(ConsoleInputEvent::new(line));
    }
}

fn write_stdout(
    mut events: MessageReader<ConsoleOutputEvent>,
    mut clears: MessageReader<ConsoleClearEvent>,
    config: Res<TerminalConfig>,
) {
    let mut out = io::stdout().lock();
    if clears.read().count() > 0 && config.colored {
        let _ = write!(out, "\x1b[2J\x1b[H");
    }
    for event in events.read() {
        let _ = if config.colored {
            writeln!(out, "{}{}\x1b[0m", level_color(event.level), event.message)
        } else {
            writeln!(out, "{}", event.message)
        };
    }
    let _ = out.flush();
}

fn level_color(level: ConsoleOutputLevel) -> &'static str {
    match level {
        ConsoleOutputLevel::Debug => "\x1b[90m",
        ConsoleOutputLevel::Info => "\x1b[0m",
        ConsoleOutputLevel::Warn => "\x1b[33m",
        ConsoleOutputLevel::Error => "\x1b[31m",
        ConsoleOutputLevel::Command => "\x1b[36m",
        ConsoleOutputLevel::Result => "\x1b[32m",
        ConsoleOutputLevel::Remote => "\x1b[35m",
    }
}
