//! Command registry.
//!
//! Maps command names to descriptors. One registry per console side; the
//! client and server never share one.

use std::collections::HashMap;

use bevy::prelude::*;
use thiserror::Error;

use super::{CommandTable, ConCommand};

/// Errors raised while building or amending a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A command with this name is already registered.
    #[error("command '{0}' is already registered")]
    Duplicate(String),
}

/// Central registry for console commands.
///
/// # Examples
///
/// ```ignore
/// let mut registry = CommandRegistry::new();
/// registry.register(ConCommand::new("cls", |_, _| ForwardDecision::LocalOnly))?;
/// assert!(registry.lookup("cls").is_some());
/// assert!(registry.lookup("CLS").is_none());
/// ```
#[derive(Resource, Default, Debug)]
pub struct CommandRegistry {
    entries: HashMap<Box<str>, ConCommand>,
}

impl CommandRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a set of commands, failing on the first name
    /// collision.
    pub fn from_commands(commands: impl IntoIterator<Item = ConCommand>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for cmd in commands {
            registry.register(cmd)?;
        }
        Ok(registry)
    }

    /// Build a registry from a command table.
    pub fn from_table(table: &CommandTable) -> Result<Self, RegistryError> {
        Self::from_commands(table.instantiate())
    }

    /// Register a command. The registry is left unchanged on a duplicate.
    pub fn register(&mut self, cmd: ConCommand) -> Result<(), RegistryError> {
        if self.entries.contains_key(cmd.name()) {
            return Err(RegistryError::Duplicate(cmd.name().to_string()));
        }
        self.entries.insert(cmd.name().into(), cmd);
        Ok(())
    }

    /// Register a stand-in for a command advertised by the remote side.
    pub fn register_remote_stub(
        &mut self,
        name: &str,
        help: &str,
        description: &str,
    ) -> Result<(), RegistryError> {
        self.register(ConCommand::remote_stub(name, help, description))
    }

    /// Look up a command by exact, case-sensitive name.
    pub fn lookup(&self, name: &str) -> Option<&ConCommand> {
        self.entries.get(name)
    }

    /// Check if a command exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All commands, sorted by name.
    pub fn list(&self) -> Vec<&ConCommand> {
        let mut cmds: Vec<_> = self.entries.values().collect();
        cmds.sort_by(|a, b| a.name().cmp(b.name()));
        cmds
    }

    /// Commands this side can run itself, sorted by name.
    pub fn local_commands(&self) -> Vec<&ConCommand> {
        let mut cmds = self.list();
        cmds.retain(|cmd| !cmd.is_remote_stub());
        cmds
    }

    /// Number of stubs learned from the remote side.
    pub fn remote_stub_count(&self) -> usize {
        self.entries.values().filter(|cmd| cmd.is_remote_stub()).count()
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ForwardDecision;

    fn local(name: &str) -> ConCommand {
        ConCommand::new(name.to_string(), |_, _| ForwardDecision::LocalOnly)
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut registry = CommandRegistry::new();
        registry.register(local("quit")).unwrap();

        assert!(registry.lookup("quit").is_some());
        assert!(registry.lookup("Quit").is_none());
        assert!(registry.contains("quit"));
    }

    #[test]
    fn test_duplicate_local_fails_construction() {
        let result = CommandRegistry::from_commands([local("quit"), local("cls"), local("quit")]);
        assert_eq!(result.unwrap_err(), RegistryError::Duplicate("quit".to_string()));
    }

    #[test]
    fn test_duplicate_register_leaves_original() {
        let mut registry = CommandRegistry::new();
        registry.register(local("quit").help("original")).unwrap();

        let err = registry.register_remote_stub("quit", "other", "other");
        assert!(err.is_err());
        let cmd = registry.lookup("quit").unwrap();
        assert_eq!(cmd.get_help(), "original");
        assert!(!cmd.is_remote_stub());
    }

    #[test]
    fn test_list_sorted_regardless_of_insertion_order() {
        let registry = CommandRegistry::from_commands([local("zeta"), local("alpha"), local("mid")]).unwrap();
        let names: Vec<_> = registry.list().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_local_commands_skip_stubs() {
        let mut registry = CommandRegistry::from_commands([local("help"), local("cls")]).unwrap();
        registry.register_remote_stub("kick", "kick <name>", "Kick a player").unwrap();

        let names: Vec<_> = registry.local_commands().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["cls", "help"]);
        assert_eq!(registry.remote_stub_count(), 1);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_error_message() {
        let err = RegistryError::Duplicate("foo".into());
        assert_eq!(err.to_string(), "command 'foo' is already registered");
    }
}
