//! # WiThrottle Server Configuration
//!
//! This crate owns the startup configuration of the WiThrottle server:
//! the client capacity, the throttle and DCC++ bridge ports, the advertised
//! host name and the power-on-start flag.
//!
//! ## Features
//!
//! - **Compiled-in Defaults**: `MAX_CLIENTS`, `WT_SERVER_PORT`,
//!   `DCCPP_SERVER_PORT`, `HOST_STRING`, `POWER_ON_START`
//! - **Layered Loading**: TOML files, environment profiles and `WT_`
//!   environment variables on top of the defaults
//! - **Validation**: every value is checked once; a bad value is a fatal
//!   [`ConfigurationError`]
//! - **Configuration Store**: immutable, lock-free reads after a single load
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wt_config::{ConfigLoader, ConfigStore};
//!
//! let store = ConfigStore::new();
//! let loader = ConfigLoader::new().with_optional_file("config/withrottle.toml");
//! let config = store.load_with(&loader)?;
//!
//! println!("{} listening on {}", config.host_identifier(), config.listen_port());
//! # Ok::<(), wt_config::ConfigurationError>(())
//! ```

pub mod constants;
pub mod error;
pub mod loader;
pub mod server_config;
pub mod settings;
pub mod store;

// Re-export commonly used types
pub use error::{ConfigResult, ConfigurationError};
pub use loader::{load_settings, ConfigLoader};
pub use server_config::{ConfigValue, ServerConfig};
pub use settings::{CompanionPort, PowerFlag, ServerSettings};
pub use store::{ConfigStore, StoreState};
