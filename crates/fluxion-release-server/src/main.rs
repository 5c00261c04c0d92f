// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fluxion_release_server::api::{self, AppState};
use fluxion_release_server::config::{DEFAULT_CONFIG_PATH, ServerConfig};
use fluxion_release_server::events::EventBus;
use fluxion_release_server::mirror::MirrorClient;
use fluxion_release_server::service::ReleaseService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fluxion_release_server=info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = if config_path.exists() {
        info!(path = %config_path.display(), "Loading configuration");
        ServerConfig::from_file(&config_path)?
    } else {
        warn!(path = %config_path.display(), "Config file not found, using defaults");
        ServerConfig::from_env()?
    };

    let mut events = EventBus::new(config.events.channel_capacity);
    if let Some(url) = &config.events.webhook_url {
        events = events.with_webhook(url)?;
        info!(url = %url, "Event webhook enabled");
    }
    let _audit = events.spawn_audit_log();

    let mut service = ReleaseService::open(&config.storage.data_dir, events).with_context(|| {
        format!(
            "Failed to open data directory {}",
            config.storage.data_dir.display()
        )
    })?;
    info!(path = %config.storage.data_dir.display(), "Data directory opened");

    if let Some(url) = &config.mirror.url {
        service = service.with_mirror(MirrorClient::new(url, config.mirror.token.clone())?);
        info!(url = %url, "File mirror enabled");
    }

    if let Err(e) = service.warm_cache() {
        warn!(error = %e, "Failed to warm latest-version cache, serving from store on demand");
    }

    if config.auth.token.is_none() {
        warn!("No auth token configured, write endpoints are disabled");
    }

    let state = AppState::new(Arc::new(service), config.auth.token.clone());
    let app = api::router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("FluxION release server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
