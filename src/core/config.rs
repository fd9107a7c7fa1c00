//! Console configuration.

use bevy::prelude::*;

use super::DeliveryMethod;

/// Default prefix put in front of reply lines from the server.
pub const DEFAULT_REPLY_PREFIX: &str = "Server: ";

/// Runtime configuration shared by both console sides.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persist", serde(default))]
pub struct ConsoleConfig {
    /// Prefix for lines received as `ConsoleCommandReply`.
    pub reply_prefix: String,
    /// Echo submitted lines back to the surface as `$ line`.
    pub echo_input: bool,
    /// Delivery used for `ConsoleCommandReply` lines sent by the server.
    pub reply_delivery: DeliveryMethod,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            reply_prefix: DEFAULT_REPLY_PREFIX.to_string(),
            echo_input: true,
            reply_delivery: DeliveryMethod::ReliableUnordered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.reply_prefix, "Server: ");
        assert!(config.echo_input);
        assert_eq!(config.reply_delivery, DeliveryMethod::ReliableUnordered);
    }
}
