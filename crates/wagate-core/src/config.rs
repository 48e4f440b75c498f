// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for wagate.

use std::net::SocketAddr;

/// Platform configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// HTTP server bind address.
    pub http_addr: SocketAddr,
    /// Ordered pool of upstream gateway server base URLs.
    pub upstream_servers: Vec<String>,
    /// Shared API key presented to every upstream gateway server.
    pub upstream_api_key: String,
    /// Fallback webhook URL passed to the upstream when a tenant supplies none.
    pub default_webhook_url: Option<String>,
    /// Country code prepended during phone number normalization.
    pub default_country_code: String,
    /// Whether this is a production deployment (enables rate limiting).
    pub production: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `WAGATE_DATABASE_URL`: PostgreSQL connection string
    /// - `WAGATE_UPSTREAM_SERVERS`: comma-separated upstream base URLs
    /// - `WAGATE_UPSTREAM_API_KEY`: shared upstream gateway API key
    ///
    /// Optional (with defaults):
    /// - `WAGATE_HTTP_PORT`: HTTP listen port (default: 3000)
    /// - `WAGATE_DEFAULT_WEBHOOK_URL`: fallback tenant callback URL
    /// - `WAGATE_DEFAULT_COUNTRY_CODE`: normalization country code (default: 62)
    /// - `WAGATE_ENV`: `production` enables rate limiting
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("WAGATE_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("WAGATE_DATABASE_URL"))?;

        let port: u16 = std::env::var("WAGATE_HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("WAGATE_HTTP_PORT", "must be a valid port number"))?;

        let upstream_servers: Vec<String> = std::env::var("WAGATE_UPSTREAM_SERVERS")
            .map_err(|_| ConfigError::Missing("WAGATE_UPSTREAM_SERVERS"))?
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if upstream_servers.is_empty() {
            return Err(ConfigError::Invalid(
                "WAGATE_UPSTREAM_SERVERS",
                "must contain at least one server URL",
            ));
        }

        let upstream_api_key = std::env::var("WAGATE_UPSTREAM_API_KEY")
            .map_err(|_| ConfigError::Missing("WAGATE_UPSTREAM_API_KEY"))?;

        let default_webhook_url = std::env::var("WAGATE_DEFAULT_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.is_empty());

        let default_country_code =
            std::env::var("WAGATE_DEFAULT_COUNTRY_CODE").unwrap_or_else(|_| "62".to_string());

        let production = std::env::var("WAGATE_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            http_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            upstream_servers,
            upstream_api_key,
            default_webhook_url,
            default_country_code,
            production,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
