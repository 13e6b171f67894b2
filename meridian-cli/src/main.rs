//! Meridian CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meridian_config::{load_config, Config, LogFormat};
use meridian_plugins::resolve_plugins;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "meridian")]
#[command(about = "Meridian GraphQL server", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "meridian.yaml", env = "MERIDIAN_CONFIG")]
        config: PathBuf,
    },

    /// Show the plugins a server would install, in invocation order
    Plugins {
        /// Path to configuration file
        #[arg(short, long, default_value = "meridian.yaml", env = "MERIDIAN_CONFIG")]
        config: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Path to configuration file
        #[arg(short, long, default_value = "meridian.yaml", env = "MERIDIAN_CONFIG")]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config: path } => {
            let config = load(&path)?;
            init_tracing(&config)?;

            tracing::info!("✓ Configuration is valid: {}", path.display());
            tracing::info!("  Environment: {}", config.server.environment);
            tracing::info!("  Introspection: {}", config.server.introspection_enabled());
            tracing::info!("  Signal handling: {}", config.server.handle_signals_enabled());
            tracing::info!(
                "  Reporting: {}",
                config.reporting.graph_ref.as_deref().unwrap_or("disabled")
            );
            Ok(())
        }

        Commands::Plugins { config: path } => {
            let config = load(&path)?;
            init_tracing(&config)?;

            let registrations = resolve_plugins(Vec::new(), &config)?;
            for (index, registration) in registrations.iter().enumerate() {
                let origin = if registration.implicitly_installed {
                    "default"
                } else {
                    "explicit"
                };
                println!("{:>2}. {} ({origin})", index + 1, registration.name());
            }
            Ok(())
        }

        Commands::Config { config: path } => {
            let mut config = load(&path)?;
            if config.reporting.key.is_some() {
                config.reporting.key = Some("<redacted>".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }

        Commands::Version => {
            println!("Meridian GraphQL server");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<Config> {
    load_config(path, true)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn init_tracing(config: &Config) -> Result<()> {
    let logging = &config.observability.logging;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init(),
    }

    Ok(())
}
