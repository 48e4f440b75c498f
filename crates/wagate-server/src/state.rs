// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared state for request handlers.

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use wagate_core::Config;

use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::upstream::{UpstreamClient, UpstreamPool};

/// Shared application state, cloned into every request handler.
///
/// The upstream pool's rotation cursor is the only in-process mutable state;
/// everything else lives in PostgreSQL.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// Client for upstream gateway servers and tenant callbacks.
    pub upstream: UpstreamClient,
    /// Round-robin pool of upstream servers consulted at provisioning time.
    pub servers: UpstreamPool,
    /// Fallback webhook URL passed upstream when a tenant supplies none.
    pub default_webhook_url: Option<String>,
    /// Country code used for recipient number normalization.
    pub country_code: String,
    /// Whether rate limiting is active (production deployments only).
    pub production: bool,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
    /// Limiter for the unauthenticated auth endpoints.
    pub auth_limiter: Arc<RateLimiter>,
    /// Limiter for provisioning and send endpoints.
    pub api_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build the application state from configuration.
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            upstream: UpstreamClient::new(config.upstream_api_key.clone()),
            servers: UpstreamPool::new(config.upstream_servers.clone()),
            default_webhook_url: config.default_webhook_url.clone(),
            country_code: config.default_country_code.clone(),
            production: config.production,
            start_time: Instant::now(),
            auth_limiter: Arc::new(RateLimiter::new(RateLimitConfig::auth())),
            api_limiter: Arc::new(RateLimiter::new(RateLimitConfig::api())),
        }
    }

    /// Server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
