//! Raw server settings
//!
//! `ServerSettings` is the unvalidated form of the configuration as it
//! comes out of files, environment variables or code. Numeric fields are
//! wide signed integers so that zero, negative and out-of-range values
//! survive deserialization and are rejected by [`ServerSettings::validate`]
//! with a precise [`ConfigurationError`].
//!
//! Both historical spellings of the configuration surface are accepted:
//!
//! ```toml
//! # canonical
//! max_clients = 3
//! listen_port = 44444
//! companion_port = 2560
//! host_identifier = "ESPWTServer"
//! power_on_start = true
//!
//! # legacy
//! maxClient = 3
//! WTServer_Port = 44444
//! hostString = "ESPWTServer"
//! POWER_ON_START = 1
//! ```

use crate::constants::{self, limits, names};
use crate::error::{ConfigResult, ConfigurationError};
use crate::server_config::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Unvalidated server settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Maximum concurrent throttle connections
    #[serde(
        default = "default_max_clients",
        alias = "MAX_CLIENTS",
        alias = "maxClient",
        alias = "maxclient"
    )]
    pub max_clients: i64,

    /// Throttle-facing TCP port
    #[serde(
        default = "default_listen_port",
        alias = "WT_SERVER_PORT",
        alias = "wt_server_port",
        alias = "WTServer_Port",
        alias = "wtserver_port"
    )]
    pub listen_port: i64,

    /// DCC++ command-station bridge port, or `false` for none
    #[serde(
        default = "default_companion_port",
        alias = "DCCPP_SERVER_PORT",
        alias = "dccpp_server_port",
        alias = "DCCppServer_Port",
        alias = "dccppserver_port"
    )]
    pub companion_port: CompanionPort,

    /// Advertised host name, `$VAR` references are expanded
    #[serde(
        default = "default_host_identifier",
        alias = "HOST_STRING",
        alias = "host_string",
        alias = "hostString",
        alias = "hoststring"
    )]
    pub host_identifier: String,

    /// Energize track power at boot
    #[serde(default = "default_power_on_start", alias = "POWER_ON_START")]
    pub power_on_start: PowerFlag,
}

/// Companion port setting
///
/// `true` selects the default DCC++ port, `false` disables the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CompanionPort {
    Port(i64),
    Enabled(bool),
}

/// Power-on flag as written by the user
///
/// Accepts `true`/`false`, the `1`/`0` convention of the firmware header,
/// and the words `on`/`off`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PowerFlag {
    Switch(bool),
    Level(i64),
    Word(String),
}

fn default_max_clients() -> i64 {
    constants::MAX_CLIENTS as i64
}

fn default_listen_port() -> i64 {
    i64::from(constants::WT_SERVER_PORT)
}

fn default_companion_port() -> CompanionPort {
    CompanionPort::Port(i64::from(constants::DCCPP_SERVER_PORT))
}

fn default_host_identifier() -> String {
    constants::HOST_STRING.to_string()
}

fn default_power_on_start() -> PowerFlag {
    PowerFlag::Switch(constants::POWER_ON_START)
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            max_clients: default_max_clients(),
            listen_port: default_listen_port(),
            companion_port: default_companion_port(),
            host_identifier: default_host_identifier(),
            power_on_start: default_power_on_start(),
        }
    }
}

impl CompanionPort {
    fn resolve(self) -> ConfigResult<Option<u16>> {
        match self {
            Self::Port(value) => check_port(names::DCCPP_SERVER_PORT, value).map(Some),
            Self::Enabled(true) => Ok(Some(constants::DCCPP_SERVER_PORT)),
            Self::Enabled(false) => Ok(None),
        }
    }
}

impl PowerFlag {
    /// Interpret the flag as on/off
    pub fn resolve(&self) -> ConfigResult<bool> {
        match self {
            Self::Switch(on) => Ok(*on),
            Self::Level(1) => Ok(true),
            Self::Level(0) => Ok(false),
            Self::Level(other) => Err(invalid_flag(other.to_string())),
            Self::Word(word) => match word.trim().to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => Ok(true),
                "off" | "false" | "0" => Ok(false),
                _ => Err(invalid_flag(word.clone())),
            },
        }
    }
}

fn invalid_flag(value: String) -> ConfigurationError {
    ConfigurationError::InvalidFlag {
        name: names::POWER_ON_START,
        value,
    }
}

/// Map any accepted spelling of a setting to its canonical key
pub(crate) fn canonical_key(key: &str) -> Option<&'static str> {
    match key.to_ascii_lowercase().as_str() {
        "max_clients" | "maxclient" => Some("max_clients"),
        "listen_port" | "wt_server_port" | "wtserver_port" | "server_port" => {
            Some("listen_port")
        }
        "companion_port" | "dccpp_server_port" | "dccppserver_port" => Some("companion_port"),
        "host_identifier" | "host_string" | "hoststring" => Some("host_identifier"),
        "power_on_start" => Some("power_on_start"),
        _ => None,
    }
}

/// Rename every key of one layer to its canonical spelling
///
/// Unknown keys are logged and dropped; the same setting spelled twice in
/// one layer is an error.
pub(crate) fn canonicalize_table(table: toml::Table, origin: &str) -> ConfigResult<toml::Table> {
    let mut canonical = toml::Table::new();
    for (key, value) in table {
        let Some(name) = canonical_key(&key) else {
            warn!("Ignoring unknown setting {:?} in {}", key, origin);
            continue;
        };
        if canonical.insert(name.to_string(), value).is_some() {
            return Err(ConfigurationError::Source(format!(
                "{} sets {} more than once",
                origin, name
            )));
        }
    }
    Ok(canonical)
}

fn check_port(name: &'static str, value: i64) -> ConfigResult<u16> {
    if !(limits::MIN_PORT..=limits::MAX_PORT).contains(&value) {
        return Err(ConfigurationError::PortOutOfRange { name, value });
    }
    let port = value as u16;
    if port < limits::PRIVILEGED_PORT_LIMIT {
        warn!("{} = {} is a privileged port", name, port);
    }
    Ok(port)
}

fn check_host_identifier(raw: &str) -> ConfigResult<String> {
    let expanded = shellexpand::env(raw).map_err(|e| ConfigurationError::Expansion {
        name: names::HOST_STRING,
        message: e.to_string(),
    })?;

    if expanded.is_empty() {
        return Err(ConfigurationError::EmptyHostIdentifier);
    }
    if !expanded.is_ascii() {
        return Err(ConfigurationError::NonAsciiHostIdentifier {
            value: expanded.into_owned(),
        });
    }
    if expanded.len() > limits::MAX_HOST_IDENTIFIER_LEN {
        return Err(ConfigurationError::HostIdentifierTooLong {
            len: expanded.len(),
            max: limits::MAX_HOST_IDENTIFIER_LEN,
        });
    }
    Ok(expanded.into_owned())
}

impl ServerSettings {
    /// Parse settings from a TOML document
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let table: toml::Table = contents
            .parse()
            .map_err(|e| ConfigurationError::Source(format!("Failed to parse config: {}", e)))?;
        let table = canonicalize_table(table, "config")?;

        toml::Value::Table(table)
            .try_into()
            .map_err(|e| ConfigurationError::Source(format!("Failed to parse config: {}", e)))
    }

    /// Load settings from a single TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Source(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Render settings as TOML
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string(self)
            .map_err(|e| ConfigurationError::Source(format!("Failed to render config: {}", e)))
    }

    /// Check every invariant and produce the immutable configuration
    pub fn validate(&self) -> ConfigResult<ServerConfig> {
        if self.max_clients <= 0 {
            return Err(ConfigurationError::InvalidCapacity {
                value: self.max_clients,
            });
        }
        let max_clients = usize::try_from(self.max_clients).map_err(|_| {
            ConfigurationError::InvalidCapacity {
                value: self.max_clients,
            }
        })?;

        let listen_port = check_port(names::WT_SERVER_PORT, self.listen_port)?;
        let companion_port = self.companion_port.resolve()?;
        if companion_port == Some(listen_port) {
            return Err(ConfigurationError::PortCollision { port: listen_port });
        }

        let host_identifier = check_host_identifier(&self.host_identifier)?;

        let power_on_start = self.power_on_start.resolve()?;
        if !power_on_start {
            warn!("POWER_ON_START is OFF; the iOS WiThrottle app requires it ON");
        }

        debug!(
            max_clients,
            listen_port,
            ?companion_port,
            host = %host_identifier,
            power_on_start,
            "Configuration validated"
        );

        Ok(ServerConfig::new(
            max_clients,
            listen_port,
            companion_port,
            host_identifier,
            power_on_start,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ServerSettings::default().validate().unwrap();
        assert_eq!(config.max_clients(), 3);
        assert_eq!(config.listen_port(), 44444);
        assert_eq!(config.companion_port(), Some(2560));
        assert_eq!(config.host_identifier(), "ESPWTServer");
        assert!(config.power_on_start());
    }

    #[test]
    fn test_capacity_must_be_positive() {
        for value in [0, -1, i64::MIN] {
            let settings = ServerSettings {
                max_clients: value,
                ..Default::default()
            };
            assert_eq!(
                settings.validate().unwrap_err(),
                ConfigurationError::InvalidCapacity { value }
            );
        }
    }

    #[test]
    fn test_port_range() {
        let settings = ServerSettings {
            listen_port: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigurationError::PortOutOfRange { name: "WT_SERVER_PORT", value: 0 })
        ));

        let settings = ServerSettings {
            companion_port: CompanionPort::Port(65536),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigurationError::PortOutOfRange { name: "DCCPP_SERVER_PORT", value: 65536 })
        ));

        let settings = ServerSettings {
            listen_port: 65535,
            ..Default::default()
        };
        assert_eq!(settings.validate().unwrap().listen_port(), 65535);
    }

    #[test]
    fn test_port_collision() {
        let settings = ServerSettings {
            listen_port: 2560,
            ..Default::default()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            ConfigurationError::PortCollision { port: 2560 }
        );
    }

    #[test]
    fn test_companion_port_toggle() {
        let settings = ServerSettings {
            companion_port: CompanionPort::Enabled(false),
            listen_port: 2560,
            ..Default::default()
        };
        // no bridge means no collision
        assert_eq!(settings.validate().unwrap().companion_port(), None);

        let settings = ServerSettings {
            companion_port: CompanionPort::Enabled(true),
            ..Default::default()
        };
        assert_eq!(settings.validate().unwrap().companion_port(), Some(2560));
    }

    #[test]
    fn test_host_identifier_checks() {
        let settings = ServerSettings {
            host_identifier: String::new(),
            ..Default::default()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            ConfigurationError::EmptyHostIdentifier
        );

        let settings = ServerSettings {
            host_identifier: "Bahnhof-Süd".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigurationError::NonAsciiHostIdentifier { .. })
        ));

        let settings = ServerSettings {
            host_identifier: "x".repeat(64),
            ..Default::default()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            ConfigurationError::HostIdentifierTooLong { len: 64, max: 63 }
        );

        let settings = ServerSettings {
            host_identifier: "${WT_CONFIG_TEST_UNDEFINED_HOST_VAR}".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigurationError::Expansion { name: "HOST_STRING", .. })
        ));
    }

    #[test]
    fn test_power_flag_forms() {
        assert!(PowerFlag::Switch(true).resolve().unwrap());
        assert!(PowerFlag::Level(1).resolve().unwrap());
        assert!(!PowerFlag::Level(0).resolve().unwrap());
        assert!(PowerFlag::Word("ON".to_string()).resolve().unwrap());
        assert!(!PowerFlag::Word("off".to_string()).resolve().unwrap());
        assert!(matches!(
            PowerFlag::Level(2).resolve(),
            Err(ConfigurationError::InvalidFlag { .. })
        ));
        assert!(matches!(
            PowerFlag::Word("maybe".to_string()).resolve(),
            Err(ConfigurationError::InvalidFlag { .. })
        ));
    }

    #[test]
    fn test_legacy_variants_reconcile() {
        let first = ServerSettings::from_toml_str(
            r#"
MAX_CLIENTS = 3
WTServer_Port = 44444
DCCppServer_Port = 2560
hostString = "ESPWTServer"
POWER_ON_START = 1
"#,
        )
        .unwrap();

        let second = ServerSettings::from_toml_str(
            r#"
maxClient = 3
WTServer_Port = 44444
hostString = "ESPWTServer"
POWER_ON_START = true
companion_port = false
"#,
        )
        .unwrap();

        let first = first.validate().unwrap();
        let second = second.validate().unwrap();
        assert_eq!(first, ServerSettings::default().validate().unwrap());
        assert_eq!(second.listen_port(), first.listen_port());
        assert_eq!(second.host_identifier(), first.host_identifier());
        assert_eq!(second.companion_port(), None);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("withrottle.toml");
        std::fs::write(&path, "max_clients = 2\ncompanion_port = true\n").unwrap();

        let settings = ServerSettings::from_file(&path).unwrap();
        assert_eq!(settings.max_clients, 2);
        assert_eq!(settings.companion_port, CompanionPort::Enabled(true));

        assert!(matches!(
            ServerSettings::from_file(dir.path().join("absent.toml")),
            Err(ConfigurationError::Source(_))
        ));
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("maxClient"), Some("max_clients"));
        assert_eq!(canonical_key("WTServer_Port"), Some("listen_port"));
        assert_eq!(canonical_key("DCCPP_SERVER_PORT"), Some("companion_port"));
        assert_eq!(canonical_key("hostString"), Some("host_identifier"));
        assert_eq!(canonical_key("POWER_ON_START"), Some("power_on_start"));
        assert_eq!(canonical_key("server_port"), Some("listen_port"));
        assert_eq!(canonical_key("unknown"), None);
    }

    #[test]
    fn test_from_toml_str_drops_unknown_keys() {
        let settings = ServerSettings::from_toml_str(
            r#"
listen_port = 12090
listen_prot = 12091
"#,
        )
        .unwrap();
        assert_eq!(settings.listen_port, 12090);
        assert_eq!(
            ServerSettings { listen_port: 44444, ..settings },
            ServerSettings::default()
        );
    }

    #[test]
    fn test_from_toml_str_rejects_duplicate_spellings() {
        let err = ServerSettings::from_toml_str("max_clients = 3\nMAX_CLIENTS = 4\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::Source(msg) if msg.contains("more than once")));
    }

    #[test]
    fn test_toml_render_reparses() {
        let settings = ServerSettings {
            companion_port: CompanionPort::Enabled(false),
            power_on_start: PowerFlag::Word("off".to_string()),
            ..Default::default()
        };
        let rendered = settings.to_toml().unwrap();
        assert!(rendered.contains("companion_port = false"));
        assert_eq!(ServerSettings::from_toml_str(&rendered).unwrap(), settings);
    }
}
