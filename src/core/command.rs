//! Console command descriptors.
//!
//! A [`ConCommand`] is a name, help text, description and a behavior. The
//! behavior is either a local handler or a remote stub that stands in for a
//! command only the other side can run.

use std::sync::Arc;

use bevy::prelude::*;

/// Arguments passed to a command handler.
#[derive(Debug, Clone)]
pub struct CommandArgs<'a> {
    /// The line exactly as it was submitted.
    raw: &'a str,
    /// Parsed arguments (excluding command name).
    args: Vec<&'a str>,
}

impl<'a> CommandArgs<'a> {
    /// Create new command args from a raw line and parsed arguments.
    pub fn new(raw: &'a str, args: Vec<&'a str>) -> Self {
        Self { raw, args }
    }

    /// Get the raw submitted line.
    #[inline]
    pub fn raw(&self) -> &str {
        self.raw
    }

    /// Get the number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check if there are no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Get an argument by index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.args.get(index).copied()
    }

    /// Try to parse an argument as a specific type.
    ///
    /// Returns `None` both for a missing and for a malformed argument, so a
    /// handler can report its own usage line instead of panicking.
    pub fn parse<T: std::str::FromStr>(&self, index: usize) -> Option<T> {
        self.get(index).and_then(|s| s.parse().ok())
    }

    /// Iterate over arguments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.args.iter().copied()
    }

    /// The raw text after the command name, spacing and quotes untouched.
    pub fn tail(&self) -> &str {
        let line = self.raw.trim_start();
        match line.find(char::is_whitespace) {
            Some(end) => line[end..].trim(),
            None => "",
        }
    }

    /// Join all arguments with a separator.
    pub fn join(&self, separator: &str) -> String {
        self.args.join(separator)
    }
}

/// Whether the raw line should also go to the remote side after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForwardDecision {
    /// The command was fully handled here.
    #[default]
    LocalOnly,
    /// Send the raw line to the remote side as well.
    Forward,
}

impl ForwardDecision {
    /// Returns `true` for [`ForwardDecision::Forward`].
    #[inline]
    pub fn forwards(self) -> bool {
        matches!(self, ForwardDecision::Forward)
    }
}

/// Shared handler for a locally executable command.
///
/// Handlers receive the parsed arguments and exclusive access to the world,
/// and decide whether the line is forwarded.
pub type CommandHandler = Arc<dyn Fn(&CommandArgs, &mut World) -> ForwardDecision + Send + Sync>;

/// What running a command does.
#[derive(Clone)]
pub enum CommandBehavior {
    /// Runs in-process.
    Local(CommandHandler),
    /// Known only by name from the remote side; always forwards.
    RemoteStub,
}

impl std::fmt::Debug for CommandBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandBehavior::Local(_) => f.write_str("Local(..)"),
            CommandBehavior::RemoteStub => f.write_str("RemoteStub"),
        }
    }
}

/// A console command descriptor.
///
/// # Examples
///
/// ```ignore
/// let quit = ConCommand::new("quit", |_args, world| {
///     world.write_message(AppExit::Success);
///     ForwardDecision::LocalOnly
/// })
/// .help("quit")
/// .description("Exit the game");
/// ```
#[derive(Clone, Debug)]
pub struct ConCommand {
    name: Box<str>,
    help: Box<str>,
    description: Box<str>,
    behavior: CommandBehavior,
}

impl ConCommand {
    /// Create a new local command with the given name and handler.
    pub fn new<F>(name: impl Into<Box<str>>, handler: F) -> Self
    where
        F: Fn(&CommandArgs, &mut World) -> ForwardDecision + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            help: "".into(),
            description: "".into(),
            behavior: CommandBehavior::Local(Arc::new(handler)),
        }
    }

    /// Create a stand-in for a command advertised by the remote side.
    pub(crate) fn remote_stub(
        name: impl Into<Box<str>>,
        help: impl Into<Box<str>>,
        description: impl Into<Box<str>>,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            description: description.into(),
            behavior: CommandBehavior::RemoteStub,
        }
    }

    /// Set the help text.
    pub fn help(mut self, help: impl Into<Box<str>>) -> Self {
        self.help = help.into();
        self
    }

    /// Set the description.
    pub fn description(mut self, desc: impl Into<Box<str>>) -> Self {
        self.description = desc.into();
        self
    }

    /// Get the command name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the help text.
    #[inline]
    pub fn get_help(&self) -> &str {
        &self.help
    }

    /// Get the description.
    #[inline]
    pub fn get_description(&self) -> &str {
        &self.description
    }

    /// Get the behavior.
    #[inline]
    pub fn behavior(&self) -> &CommandBehavior {
        &self.behavior
    }

    /// Check if this entry was learned from the remote side.
    #[inline]
    pub fn is_remote_stub(&self) -> bool {
        matches!(self.behavior, CommandBehavior::RemoteStub)
    }

    /// Execute the command with the given arguments.
    pub fn execute(&self, args: &CommandArgs, world: &mut World) -> ForwardDecision {
        match &self.behavior {
            CommandBehavior::Local(handler) => handler(args, world),
            CommandBehavior::RemoteStub => ForwardDecision::Forward,
        }
    }
}

/// Constructor for one command in a [`CommandTable`].
pub type CommandConstructor = fn() -> ConCommand;

/// The explicit list of commands a console side starts with.
///
/// Kept as a resource so the registry can be rebuilt when the console
/// surface is recreated.
#[derive(Resource, Clone, Debug, Default)]
pub struct CommandTable {
    constructors: Vec<CommandConstructor>,
}

impl CommandTable {
    /// Create a table from a list of constructors.
    pub fn new(constructors: impl IntoIterator<Item = CommandConstructor>) -> Self {
        Self {
            constructors: constructors.into_iter().collect(),
        }
    }

    /// Append a constructor.
    pub fn push(&mut self, constructor: CommandConstructor) {
        self.constructors.push(constructor);
    }

    /// Instantiate every command in declaration order.
    pub fn instantiate(&self) -> impl Iterator<Item = ConCommand> + '_ {
        self.constructors.iter().map(|ctor| ctor())
    }

    /// Get the number of declared commands.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}
