//! Configuration Store
//!
//! Holds the one validated [`ServerConfig`] of a process. The store has two
//! states, `Uninitialized` and `Ready`, and moves between them exactly once,
//! on the first successful load. Reads after that are lock-free.
//!
//! ```rust
//! use wt_config::ConfigStore;
//!
//! let store = ConfigStore::new();
//! store.load().expect("compiled-in defaults are valid");
//!
//! let config = store.get().unwrap();
//! assert_eq!(config.listen_port(), 44444);
//! assert!(config.power_on_start());
//! ```

use crate::error::{ConfigResult, ConfigurationError};
use crate::loader::ConfigLoader;
use crate::server_config::ServerConfig;
use crate::settings::ServerSettings;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{error, info};

/// Lifecycle state of a [`ConfigStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Ready,
}

/// Owner of the process configuration
#[derive(Debug, Default)]
pub struct ConfigStore {
    config: OnceCell<Arc<ServerConfig>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            config: OnceCell::new(),
        }
    }

    /// Validate the compiled-in defaults and make them available
    pub fn load(&self) -> ConfigResult<&ServerConfig> {
        self.load_from(&ServerSettings::default())
    }

    /// Validate `settings` and make them available
    ///
    /// Fails with [`ConfigurationError::AlreadyLoaded`] if the store is
    /// already `Ready`; the existing configuration is kept.
    pub fn load_from(&self, settings: &ServerSettings) -> ConfigResult<&ServerConfig> {
        if self.config.get().is_some() {
            return Err(ConfigurationError::AlreadyLoaded);
        }

        let config = settings.validate().map_err(|e| {
            error!("Configuration rejected: {}", e);
            e
        })?;

        let mut installed = false;
        let stored = self.config.get_or_init(|| {
            installed = true;
            Arc::new(config)
        });
        if !installed {
            return Err(ConfigurationError::AlreadyLoaded);
        }

        info!(
            "Configuration ready: {} on port {}, {} clients max, bridge {}, power on start {}",
            stored.host_identifier(),
            stored.listen_port(),
            stored.max_clients(),
            stored
                .companion_port()
                .map_or_else(|| "disabled".to_string(), |port| port.to_string()),
            if stored.power_on_start() { "ON" } else { "OFF" },
        );
        Ok(stored)
    }

    /// Run `loader` and validate its result
    pub fn load_with(&self, loader: &ConfigLoader) -> ConfigResult<&ServerConfig> {
        if self.config.get().is_some() {
            return Err(ConfigurationError::AlreadyLoaded);
        }
        let settings = loader.build()?;
        self.load_from(&settings)
    }

    /// Read-only view of the configuration, `None` until a load succeeds
    pub fn get(&self) -> Option<&ServerConfig> {
        self.config.get().map(Arc::as_ref)
    }

    /// Shared handle for tasks or threads that outlive the borrow
    pub fn shared(&self) -> Option<Arc<ServerConfig>> {
        self.config.get().cloned()
    }

    pub fn state(&self) -> StoreState {
        if self.config.get().is_some() {
            StoreState::Ready
        } else {
            StoreState::Uninitialized
        }
    }
}
