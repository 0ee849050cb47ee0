//! Layered Configuration Loader
//!
//! Builds [`ServerSettings`] from, lowest precedence first:
//!
//! 1. compiled-in defaults
//! 2. TOML files, in the order they were added
//! 3. an optional environment profile (`config/environments/<name>.toml`)
//! 4. `WT_`-prefixed environment variables (`WT_LISTEN_PORT=4444`)
//!
//! File and environment keys may use any accepted spelling (see
//! [`crate::settings`]) and are canonicalized per layer, so a legacy key in
//! one layer overrides the canonical key from an earlier one. Environment
//! values are typed per setting; `WT_HOST_IDENTIFIER` is never parsed.

use crate::constants::loader::{DEFAULT_CONFIG_PATH, DEFAULT_PROFILE_DIR, ENV_PREFIX};
use crate::error::{ConfigResult, ConfigurationError};
use crate::settings::{canonicalize_table, ServerSettings};
use config_crate::{Config, Environment, File, FileFormat, Map, Source};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct FileLayer {
    path: PathBuf,
    required: bool,
    profile: bool,
}

/// Builder for layered configuration loading
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    files: Vec<FileLayer>,
    env_prefix: Option<String>,
    env_source: Option<Map<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Start from the compiled-in defaults with the `WT_` environment layer
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            env_prefix: Some(ENV_PREFIX.to_string()),
            env_source: None,
        }
    }

    /// Add a TOML file that must exist
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push(FileLayer {
            path: path.as_ref().to_path_buf(),
            required: true,
            profile: false,
        });
        self
    }

    /// Add a TOML file that is skipped when absent
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push(FileLayer {
            path: path.as_ref().to_path_buf(),
            required: false,
            profile: false,
        });
        self
    }

    /// Add `<dir>/<name>.toml` as an environment profile
    pub fn with_profile<P: AsRef<Path>>(mut self, dir: P, name: &str) -> Self {
        self.files.push(FileLayer {
            path: dir.as_ref().join(format!("{}.toml", name)),
            required: false,
            profile: true,
        });
        self
    }

    /// Read overrides from environment variables with this prefix
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Ignore environment variables
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Use an explicit variable map instead of the process environment
    pub fn with_env_source(mut self, vars: Map<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    /// Merge all layers into raw settings
    pub fn build(&self) -> ConfigResult<ServerSettings> {
        let mut merged = toml::Table::new();

        for layer in &self.files {
            if !layer.path.exists() {
                if layer.required {
                    return Err(ConfigurationError::Source(format!(
                        "Config file not found: {}",
                        layer.path.display()
                    )));
                }
                if layer.profile {
                    warn!("Environment config not found: {:?}", layer.path);
                } else {
                    debug!("Optional config file not present: {:?}", layer.path);
                }
                continue;
            }

            if layer.profile {
                info!("Loading environment config: {:?}", layer.path);
            } else {
                info!("Loading config file: {:?}", layer.path);
            }
            for (key, value) in read_layer(&layer.path)? {
                merged.insert(key, value);
            }
        }

        if let Some(prefix) = &self.env_prefix {
            for (key, value) in self.read_env(prefix)? {
                merged.insert(key, value);
            }
        }

        let rendered = toml::to_string(&merged)
            .map_err(|e| ConfigurationError::Source(format!("Failed to merge config: {}", e)))?;

        let config = Config::builder()
            .add_source(File::from_str(&rendered, FileFormat::Toml))
            .build()?;
        let settings: ServerSettings = config.try_deserialize()?;
        debug!(?settings, "Configuration layers merged");
        Ok(settings)
    }

    /// Collect `<prefix>_*` variables as one canonicalized layer
    fn read_env(&self, prefix: &str) -> ConfigResult<toml::Table> {
        let vars = Environment::with_prefix(prefix)
            .prefix_separator("_")
            .source(self.env_source.clone())
            .collect()?;

        let mut table = toml::Table::new();
        for (key, value) in vars {
            let raw = value.into_string()?;
            table.insert(key, toml::Value::String(raw));
        }

        let origin = format!("{}_* environment", prefix);
        let mut canonical = canonicalize_table(table, &origin)?;
        for (key, value) in canonical.iter_mut() {
            let typed = match value {
                toml::Value::String(raw) => env_value(key, raw),
                _ => continue,
            };
            *value = typed;
        }
        if !canonical.is_empty() {
            info!("Applying {} override(s) from {}", canonical.len(), origin);
        }
        Ok(canonical)
    }
}

/// Type an environment string for its setting
///
/// The host identifier is taken verbatim; everything else may be an
/// integer or a boolean and falls back to the raw string.
fn env_value(key: &str, raw: &str) -> toml::Value {
    if key == "host_identifier" {
        return toml::Value::String(raw.to_string());
    }
    if let Ok(number) = raw.trim().parse::<i64>() {
        return toml::Value::Integer(number);
    }
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        _ => toml::Value::String(raw.to_string()),
    }
}

/// Read one TOML file and canonicalize its keys
fn read_layer(path: &Path) -> ConfigResult<toml::Table> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ConfigurationError::Source(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let table: toml::Table = contents.parse().map_err(|e| {
        ConfigurationError::Source(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    canonicalize_table(table, &path.display().to_string())
}

/// Convenience function to load settings the way the server does at startup
///
/// Reads `path` (or the optional default config file), the named profile if
/// any, then `WT_` environment overrides.
pub fn load_settings(path: Option<&Path>, profile: Option<&str>) -> ConfigResult<ServerSettings> {
    let mut loader = match path {
        Some(path) => ConfigLoader::new().with_file(path),
        None => ConfigLoader::new().with_optional_file(DEFAULT_CONFIG_PATH),
    };
    if let Some(name) = profile {
        loader = loader.with_profile(DEFAULT_PROFILE_DIR, name);
    }
    loader.build()
}
