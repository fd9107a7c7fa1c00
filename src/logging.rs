//! Mirror WARN/ERROR logs onto the console surface.
//!
//! Hook it into [`LogPlugin::custom_layer`](bevy::log::LogPlugin::custom_layer):
//!
//! ```ignore
//! App::new().add_plugins(DefaultPlugins.set(LogPlugin {
//!     custom_layer: bevy_netconsole::logging::console_log_layer,
//!     ..default()
//! }));
//! ```

use bevy::log::{BoxedLayer, Level};
use bevy::prelude::*;
use std::sync::mpsc;
use tracing::Subscriber;
use tracing_subscriber::field::Visit;
use tracing_subscriber::Layer;

use crate::core::ConsoleOutputEvent;

/// Layer factory for [`LogPlugin::custom_layer`](bevy::log::LogPlugin::custom_layer).
pub fn console_log_layer(app: &mut App) -> Option<BoxedLayer> {
    Some(Box::new(create_log_layer(app)))
}

fn create_log_layer(app: &mut App) -> LogCaptureLayer {
    let (sender, receiver) = mpsc::channel();
    app.add_message::<ConsoleOutputEvent>();
    app.insert_non_send_resource(CapturedLogLines(receiver));
    app.add_systems(PostUpdate, transfer_log_lines);

    LogCaptureLayer { sender }
}

/// Map a log record to a console line. Only WARN and ERROR are kept.
fn to_console_line(level: Level, target: &str, message: &str) -> Option<ConsoleOutputEvent> {
    match level {
        Level::ERROR => Some(ConsoleOutputEvent::error(format!("[{}] {}", target, message))),
        Level::WARN => Some(ConsoleOutputEvent::warn(format!("[{}] {}", target, message))),
        _ => None,
    }
}

fn transfer_log_lines(
    receiver: NonSend<CapturedLogLines>,
    mut output: MessageWriter<ConsoleOutputEvent>,
) {
    for line in receiver.0.try_iter() {
        output.write(line);
    }
}

/// Lines captured on any thread, waiting for [`transfer_log_lines`].
struct CapturedLogLines(mpsc::Receiver<ConsoleOutputEvent>);

struct LogCaptureLayer {
    sender: mpsc::Sender<ConsoleOutputEvent>,
}

impl<S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>> Layer<S>
    for LogCaptureLayer
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        if *metadata.level() > Level::WARN {
            return;
        }

        let mut message = None;
        event.record(&mut LogEventVisitor(&mut message));
        if let Some(line) = message.and_then(|m| to_console_line(*metadata.level(), metadata.target(), &m)) {
            let _ = self.sender.send(line);
        }
    }
}

struct LogEventVisitor<'a>(&'a mut Option<String>);

impl Visit for LogEventVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        // Only log out messages
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}
