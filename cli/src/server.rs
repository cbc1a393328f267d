// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP server: wires the configured mounts into a dispatcher and serves it
//! until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use dirgate_core::application::dispatcher::Dispatcher;
use dirgate_core::domain::gateway_config::GatewayConfigManifest;
use dirgate_core::infrastructure::{
    HtmlErrorRenderer, LocalFileInfoResolver, SimpleViewRenderer, StaticFilesDelegate,
};
use dirgate_core::presentation::api::app;

use crate::logging::init_logging;

/// Overrides taken from the command line.
#[derive(Debug, Default, Clone)]
pub struct ServeOptions {
    pub config_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Build the dispatcher for a validated configuration.
///
/// Each mount gets a read-only file-transfer handler rooted at its scope and,
/// when `assets_dir` is set, an asset server under its asset prefix.
pub fn build_dispatcher(config: &GatewayConfigManifest) -> Result<Dispatcher> {
    let registry = config
        .into_registry()
        .context("Failed to build mount registry")?;

    let handlers: Vec<_> = registry
        .mounts()
        .iter()
        .map(|mount| {
            let transfer =
                StaticFilesDelegate::new(mount.file_transfer_prefix.clone(), mount.path_scope.clone());
            let assets = config
                .spec
                .assets_dir
                .as_ref()
                .map(|dir| StaticFilesDelegate::new(mount.asset_prefix.clone(), dir.clone()));
            (mount.base_path.clone(), transfer, assets)
        })
        .collect();

    let mut builder = Dispatcher::builder(
        registry,
        Arc::new(LocalFileInfoResolver::new()),
        Arc::new(SimpleViewRenderer),
        Arc::new(HtmlErrorRenderer),
    );
    for (base_path, transfer, assets) in handlers {
        builder = builder.transfer_handler(&base_path, Arc::new(transfer));
        if let Some(assets) = assets {
            builder = builder.asset_handler(&base_path, Arc::new(assets));
        }
    }

    Ok(builder.build())
}

pub async fn serve(options: ServeOptions) -> Result<()> {
    let config = GatewayConfigManifest::load_or_default(options.config_path.clone())
        .context("Failed to load configuration")?;

    let (level, format) = match config
        .spec
        .observability
        .as_ref()
        .and_then(|o| o.logging.as_ref())
    {
        Some(logging) => (logging.level.clone(), logging.format.clone()),
        None => ("info".to_string(), "text".to_string()),
    };
    init_logging(options.log_level.as_deref().unwrap_or(&level), &format)?;

    config
        .validate()
        .context("Configuration validation failed")?;

    let dispatcher = Arc::new(build_dispatcher(&config)?);
    for mount in dispatcher.registry().mounts() {
        info!(
            mount = %mount.base_path,
            scope = %mount.path_scope.display(),
            identities = mount.identities.len(),
            "Mount registered"
        );
    }
    if dispatcher.registry().is_empty() {
        info!("No mounts configured; every request falls through to 404");
    }

    let host = options
        .host
        .unwrap_or_else(|| config.spec.network.bind_address.clone());
    let port = options.port.unwrap_or(config.spec.network.port);
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("dirgate listening on {}", addr);

    axum::serve(listener, app(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("dirgate shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
