// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # dirgate
//!
//! The `dirgate` binary exposes configured directory trees over HTTP: browsing
//! views, file-transfer passthrough, UI assets and allow-listed commands, each
//! gated by the requesting identity's capabilities.
//!
//! ## Commands
//!
//! - `dirgate serve` - Run the gateway
//! - `dirgate config show|validate` - Configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use dirgate_cli::commands::{self, ConfigCommand};
use dirgate_cli::logging::init_logging;
use dirgate_cli::server::{self, ServeOptions};

/// dirgate - directory gateway with per-identity capabilities
#[derive(Parser)]
#[command(name = "dirgate")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "DIRGATE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP port (default: from config, else 8080)
    #[arg(long, global = true, env = "DIRGATE_PORT")]
    port: Option<u16>,

    /// HTTP bind host (default: from config, else 127.0.0.1)
    #[arg(long, global = true, env = "DIRGATE_HOST")]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DIRGATE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway
    #[command(name = "serve")]
    Serve,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            server::serve(ServeOptions {
                config_path: cli.config,
                host: cli.host,
                port: cli.port,
                log_level: cli.log_level,
            })
            .await
        }
        Commands::Config { command } => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "text")?;
            commands::config::handle_command(command, cli.config).await
        }
    }
}
