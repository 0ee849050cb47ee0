//! WiThrottle configuration tool - loads the configuration the way the
//! server does at startup
//!
//! Usage:
//!   wt-config check
//!   wt-config --config config/withrottle.toml show --format json
//!   wt-config --profile club get WT_SERVER_PORT
//!   wt-config defaults > config/withrottle.toml

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wt_config::constants::loader::{DEFAULT_CONFIG_PATH, DEFAULT_PROFILE_DIR};
use wt_config::{ConfigLoader, ConfigStore, ServerConfig, ServerSettings};

#[derive(Parser, Debug)]
#[command(name = "wt-config")]
#[command(about = "WiThrottle server configuration tool")]
#[command(version)]
struct Args {
    /// Path to configuration file (default: config/withrottle.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment profile to layer on top of the file
    #[arg(short, long)]
    profile: Option<String>,

    /// Directory holding environment profiles
    #[arg(long, default_value = DEFAULT_PROFILE_DIR)]
    profile_dir: PathBuf,

    /// Ignore WT_* environment variables
    #[arg(long)]
    no_env: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and exit
    Check,
    /// Print the validated configuration
    Show {
        #[arg(long, value_enum, default_value_t = Format::Toml)]
        format: Format,
    },
    /// Print a single value by name (e.g. WT_SERVER_PORT)
    Get { name: String },
    /// Print the compiled-in defaults as TOML
    Defaults,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Toml,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let store = ConfigStore::new();
    match &args.command {
        Command::Check => {
            load_config(&args, &store)?;
            info!("Configuration OK");
        }
        Command::Show { format } => {
            let config = load_config(&args, &store)?;
            match format {
                Format::Toml => print!("{}", config.to_toml()?),
                Format::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(config).context("Failed to render JSON")?
                ),
            }
        }
        Command::Get { name } => {
            let config = load_config(&args, &store)?;
            match config.value(name) {
                Some(value) => println!("{}", value),
                None => bail!("No configuration value named {}", name),
            }
        }
        Command::Defaults => {
            print!("{}", ServerSettings::default().to_toml()?);
        }
    }

    Ok(())
}

fn load_config<'a>(args: &Args, store: &'a ConfigStore) -> Result<&'a ServerConfig> {
    let loader = build_loader(args);
    let config = store.load_with(&loader).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    Ok(config)
}

fn build_loader(args: &Args) -> ConfigLoader {
    let mut loader = match &args.config {
        Some(path) => ConfigLoader::new().with_file(path),
        None => ConfigLoader::new().with_optional_file(DEFAULT_CONFIG_PATH),
    };
    if let Some(profile) = &args.profile {
        loader = loader.with_profile(&args.profile_dir, profile);
    }
    if args.no_env {
        loader = loader.without_env();
    }
    loader
}

fn init_logging(args: &Args) {
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    // stdout carries the command output
    let builder = tracing_subscriber::fmt().with_writer(std::io::stderr);
    match EnvFilter::try_from_default_env() {
        Ok(filter) => builder.with_env_filter(filter).init(),
        Err(_) => builder.with_max_level(log_level).init(),
    }
}
