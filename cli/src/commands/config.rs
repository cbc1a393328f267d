// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use dirgate_core::domain::gateway_config::{GatewayConfigManifest, IdentityConfig};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./dirgate-config.yaml)
        #[arg(short, long, default_value = "./dirgate-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

const MINIMAL_TEMPLATE: &str = include_str!("../../templates/config-minimal.yaml");
const EXAMPLES_TEMPLATE: &str = include_str!("../../templates/config-with-examples.yaml");

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = GatewayConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. DIRGATE_CONFIG_PATH: {}",
            std::env::var("DIRGATE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./dirgate-config.yaml");
        println!("  4. ~/.dirgate/config.yaml");
        println!("  5. /etc/dirgate/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Network:".bold());
    println!(
        "  Listen: {}:{}",
        config.spec.network.bind_address, config.spec.network.port
    );
    if let Some(dir) = &config.spec.assets_dir {
        println!("  Assets: {}", dir.display());
    }
    println!();

    println!("{}", "Mounts:".bold());
    if config.spec.mounts.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for mount in &config.spec.mounts {
        println!("  {} → {}", mount.base_path.bold(), mount.path_scope.display());
        println!(
            "    File transfer: {}",
            mount
                .file_transfer_prefix
                .clone()
                .unwrap_or_else(|| format!("{}/webdav", mount.base_path.trim_end_matches('/')))
        );
        println!(
            "    CSRF protection: {}",
            if mount.csrf_protection { "on".green() } else { "off".yellow() }
        );
        match mount.command_timeout {
            Some(timeout) => println!("    Command timeout: {:?}", timeout),
            None => println!("    Command timeout: {}", "(none)".dimmed()),
        }
        println!("    {} {}", "default".bold(), describe_identity(&mount.default_identity));
        for (name, identity) in &mount.identities {
            println!("    {} {}", name.bold(), describe_identity(identity));
        }
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = GatewayConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        EXAMPLES_TEMPLATE
    } else {
        MINIMAL_TEMPLATE
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

/// One-line capability summary, e.g. `[edit, new] commands: git, svn (2 rules)`.
fn describe_identity(identity: &IdentityConfig) -> String {
    let mut capabilities = Vec::new();
    if identity.allow_edit {
        capabilities.push("edit");
    }
    if identity.allow_new {
        capabilities.push("new");
    }

    let mut line = format!("[{}]", capabilities.join(", "));
    if identity.allow_commands {
        if identity.commands.is_empty() {
            line.push_str(" commands: (none)");
        } else {
            line.push_str(&format!(" commands: {}", identity.commands.join(", ")));
        }
    }
    if !identity.rules.is_empty() {
        line.push_str(&format!(" ({} rules)", identity.rules.len()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_identity() {
        assert_eq!(describe_identity(&IdentityConfig::default()), "[]");

        let identity = IdentityConfig {
            allow_edit: true,
            allow_new: true,
            allow_commands: true,
            commands: vec!["git".to_string(), "svn".to_string()],
            rules: Vec::new(),
        };
        assert_eq!(describe_identity(&identity), "[edit, new] commands: git, svn");
    }

    #[test]
    fn test_templates_are_valid() {
        for template in [MINIMAL_TEMPLATE, EXAMPLES_TEMPLATE] {
            let config = GatewayConfigManifest::from_yaml_str(template).unwrap();
            config.validate().unwrap();
            assert_eq!(config.spec.mounts.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_generate_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dirgate-config.yaml");
        generate(path.clone(), true).await.unwrap();
        validate(Some(path)).await.unwrap();
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "apiVersion: other/v1\nkind: GatewayConfig\nmetadata:\n  name: x\nspec: {}\n")
            .unwrap();
        assert!(validate(Some(path)).await.is_err());
    }
}
