//! ssh-tunnels CLI
//!
//! Commands:
//! - validate: check every configured tunnel
//! - params: print the parameters tunnels publish
//! - run: run a command with the tunnels up

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ssh_tunnels::commands;
use ssh_tunnels::output::{print_error, print_info};
use st_core::config::{self, TunnelsConfig};

#[derive(Parser)]
#[command(name = "ssh-tunnels")]
#[command(author, version, about = "Run commands behind build-scoped SSH tunnels")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "SSH_TUNNELS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configured tunnels
    Validate,

    /// Print the tunnel parameters published to builds
    Params {
        /// List parameter names without resolving references or allocating ports
        #[arg(long)]
        emulate: bool,
    },

    /// Run a command with the tunnels established
    Run {
        /// Command and arguments to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);

    if let Commands::Path = cli.command {
        print_info(&format!("{}", config_path.display()));
        return Ok(());
    }

    let config: TunnelsConfig = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            print_error(&e.to_string());
            std::process::exit(2);
        }
    };

    match cli.command {
        Commands::Validate => {
            if !commands::validate_command(&config)? {
                std::process::exit(1);
            }
        }

        Commands::Params { emulate } => {
            commands::params_command(&config, emulate)?;
        }

        Commands::Run { command } => {
            let code = commands::run_command(&config, &command)
                .await
                .context("Run failed")?;
            std::process::exit(code);
        }

        Commands::Path => {}
    }

    Ok(())
}
