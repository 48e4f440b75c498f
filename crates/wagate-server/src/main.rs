// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wagate Server - Multi-Tenant WhatsApp Gateway API
//!
//! An HTTP server responsible for:
//! - Tenant accounts (registration, login, API keys, plan quotas)
//! - Instance provisioning on a round-robin pool of upstream gateways
//! - Message relay (text and media) with per-day usage counters
//! - Webhook ingestion and best-effort forwarding to tenant callbacks

use tracing::{info, warn};

use wagate_core::config::Config;
use wagate_core::migrations;
use wagate_server::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wagate_server=info,wagate_core=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        upstream_servers = config.upstream_servers.len(),
        production = config.production,
        "Starting Wagate Server"
    );

    // Connect to database
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database");

    migrations::run(&pool).await?;

    info!("Database schema verified");

    let state = AppState::new(pool, &config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "Wagate Server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Wagate Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
