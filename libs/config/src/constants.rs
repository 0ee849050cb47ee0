//! Compiled-in configuration defaults and limits
//!
//! These are the values a WiThrottle server starts with when no file or
//! environment layer overrides them. The defaults alone form a complete,
//! valid configuration.

/// Maximum WiFi clients that can be connected to the throttle server
pub const MAX_CLIENTS: usize = 3;

/// TCP port the throttle-facing server listens on
pub const WT_SERVER_PORT: u16 = 44444;

/// TCP port of the upstream DCC++ command-station bridge
pub const DCCPP_SERVER_PORT: u16 = 2560;

/// Advertised host/service name
pub const HOST_STRING: &str = "ESPWTServer";

/// Track power state on start.
///
/// The iOS WiThrottle app only works with this set to ON.
pub const POWER_ON_START: bool = true;

/// Canonical names of the configuration surface, in display order
pub mod names {
    pub const MAX_CLIENTS: &str = "MAX_CLIENTS";
    pub const WT_SERVER_PORT: &str = "WT_SERVER_PORT";
    pub const DCCPP_SERVER_PORT: &str = "DCCPP_SERVER_PORT";
    pub const HOST_STRING: &str = "HOST_STRING";
    pub const POWER_ON_START: &str = "POWER_ON_START";

    pub const ALL: [&str; 5] = [
        MAX_CLIENTS,
        WT_SERVER_PORT,
        DCCPP_SERVER_PORT,
        HOST_STRING,
        POWER_ON_START,
    ];
}

/// Loader defaults
pub mod loader {
    /// Prefix for environment overrides (`WT_LISTEN_PORT`, ...)
    pub const ENV_PREFIX: &str = "WT";

    /// Configuration file looked up by the command line tool
    pub const DEFAULT_CONFIG_PATH: &str = "config/withrottle.toml";

    /// Directory holding per-environment profile files
    pub const DEFAULT_PROFILE_DIR: &str = "config/environments";
}

/// Validation limits
pub mod limits {
    /// Host identifiers are advertised as a single DNS label
    pub const MAX_HOST_IDENTIFIER_LEN: usize = 63;

    /// Ports below this need elevated privileges on most hosts
    pub const PRIVILEGED_PORT_LIMIT: u16 = 1024;

    /// Lowest usable TCP port
    pub const MIN_PORT: i64 = 1;

    /// Highest usable TCP port
    pub const MAX_PORT: i64 = u16::MAX as i64;
}
