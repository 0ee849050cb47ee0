//! Validated server configuration
//!
//! A `ServerConfig` can only be produced by [`ServerSettings::validate`],
//! so holding one means every invariant has been checked. Fields are
//! private and exposed through read-only accessors.

use crate::constants::names;
use crate::error::ConfigResult;
use crate::settings::{CompanionPort, PowerFlag, ServerSettings};
use serde::Serialize;
use std::fmt;

/// Immutable, validated WiThrottle server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    max_clients: usize,
    listen_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    companion_port: Option<u16>,
    host_identifier: String,
    power_on_start: bool,
}

/// A single named configuration value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Integer(u64),
    Text(String),
    Flag(bool),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Text(value) => write!(f, "{}", value),
            Self::Flag(value) => write!(f, "{}", value),
        }
    }
}

impl ServerConfig {
    pub(crate) fn new(
        max_clients: usize,
        listen_port: u16,
        companion_port: Option<u16>,
        host_identifier: String,
        power_on_start: bool,
    ) -> Self {
        Self {
            max_clients,
            listen_port,
            companion_port,
            host_identifier,
            power_on_start,
        }
    }

    /// Upper bound on concurrently accepted throttle connections
    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Throttle-facing TCP port
    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// DCC++ command-station bridge port, if a bridge is configured
    pub fn companion_port(&self) -> Option<u16> {
        self.companion_port
    }

    /// Advertised host/service name
    pub fn host_identifier(&self) -> &str {
        &self.host_identifier
    }

    /// Whether track power is energized at boot
    pub fn power_on_start(&self) -> bool {
        self.power_on_start
    }

    /// Look up a value by its canonical name (case-insensitive)
    ///
    /// Returns `None` for unknown names and for `DCCPP_SERVER_PORT` when no
    /// bridge is configured.
    pub fn value(&self, name: &str) -> Option<ConfigValue> {
        let name = names::ALL
            .iter()
            .find(|known| known.eq_ignore_ascii_case(name))?;

        match *name {
            names::MAX_CLIENTS => Some(ConfigValue::Integer(self.max_clients as u64)),
            names::WT_SERVER_PORT => Some(ConfigValue::Integer(u64::from(self.listen_port))),
            names::DCCPP_SERVER_PORT => self
                .companion_port
                .map(|port| ConfigValue::Integer(u64::from(port))),
            names::HOST_STRING => Some(ConfigValue::Text(self.host_identifier.clone())),
            names::POWER_ON_START => Some(ConfigValue::Flag(self.power_on_start)),
            _ => None,
        }
    }

    /// All present values in canonical order
    pub fn entries(&self) -> Vec<(&'static str, ConfigValue)> {
        names::ALL
            .iter()
            .filter_map(|name| self.value(name).map(|value| (*name, value)))
            .collect()
    }

    /// Convert back to raw settings, e.g. for writing a config file
    pub fn to_settings(&self) -> ServerSettings {
        ServerSettings {
            max_clients: self.max_clients as i64,
            listen_port: i64::from(self.listen_port),
            companion_port: match self.companion_port {
                Some(port) => CompanionPort::Port(i64::from(port)),
                None => CompanionPort::Enabled(false),
            },
            host_identifier: self.host_identifier.clone(),
            power_on_start: PowerFlag::Switch(self.power_on_start),
        }
    }

    /// Render as a TOML document that loads back to this configuration
    pub fn to_toml(&self) -> ConfigResult<String> {
        self.to_settings().to_toml()
    }
}
