//! Core console types shared by the client and server plugins.
//!
//! This module provides the fundamental building blocks:
//! - [`ConCommand`] - Command descriptors with local or remote-stub behavior
//! - [`CommandRegistry`] - Name to descriptor map, one per side
//! - [`tokenize`] - Shell-like line tokenizer
//! - [`dispatch_line`] - Resolve and run one line
//! - [`PacketBuilder`] / [`PacketReader`] - Console wire format
//! - Events for communication between layers

mod command;
mod config;
mod dispatch;
mod events;
mod protocol;
mod registry;
mod tokenizer;

pub use command::{
    CommandArgs, CommandBehavior, CommandConstructor, CommandHandler, CommandTable, ConCommand,
    ForwardDecision,
};
pub use config::{ConsoleConfig, DEFAULT_REPLY_PREFIX};
pub use dispatch::{dispatch_line, CommandOutput, ConsoleState, Dispatch, RemoteLink};
pub use events::{
    ConsoleClearEvent, ConsoleEventsPlugin, ConsoleInputEvent, ConsoleOutputEvent,
    ConsoleOutputLevel, ConsoleRebuildEvent, ConsoleToggleEvent,
};
pub use protocol::{
    ChatChannel, ClientId, DeliveryMethod, CONSOLE_DELIVERY, LinkEvent, MessageCategory, NetIncoming, NetMessage,
    NetOutgoing, PacketBuilder, PacketReader, Peer, ProtocolError,
};
pub use registry::{CommandRegistry, RegistryError};
pub use tokenizer::tokenize;
