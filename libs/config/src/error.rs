//! Configuration errors
//!
//! Every variant is fatal at startup: the server must not proceed to
//! network initialization until the configuration is corrected.

use thiserror::Error;

/// Errors raised while loading or validating the server configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Client capacity is zero, negative, or not representable
    #[error("Invalid client capacity {value}: MAX_CLIENTS must be greater than 0")]
    InvalidCapacity { value: i64 },

    /// A port lies outside the usable TCP range
    #[error("Port {name} = {value} is out of range: expected 1-65535")]
    PortOutOfRange { name: &'static str, value: i64 },

    /// Listen and companion ports are the same
    #[error("Port collision: WT_SERVER_PORT and DCCPP_SERVER_PORT are both {port}")]
    PortCollision { port: u16 },

    /// Host identifier is empty
    #[error("HOST_STRING must not be empty")]
    EmptyHostIdentifier,

    /// Host identifier contains non-ASCII characters
    #[error("HOST_STRING {value:?} contains non-ASCII characters")]
    NonAsciiHostIdentifier { value: String },

    /// Host identifier does not fit a single DNS label
    #[error("HOST_STRING is {len} bytes long, maximum is {max}")]
    HostIdentifierTooLong { len: usize, max: usize },

    /// A flag value could not be interpreted as on/off
    #[error("Invalid value {value:?} for {name}: expected true/false, 1/0 or on/off")]
    InvalidFlag { name: &'static str, value: String },

    /// Environment variable expansion failed
    #[error("Failed to expand {name}: {message}")]
    Expansion { name: &'static str, message: String },

    /// A configuration layer could not be read or parsed
    #[error("Configuration source error: {0}")]
    Source(String),

    /// The store already holds a configuration
    #[error("Configuration already loaded")]
    AlreadyLoaded,
}

impl ConfigurationError {
    /// Whether the error comes from a value check rather than a source layer
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Source(_) | Self::AlreadyLoaded)
    }
}

impl From<config_crate::ConfigError> for ConfigurationError {
    fn from(err: config_crate::ConfigError) -> Self {
        Self::Source(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
