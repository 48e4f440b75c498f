// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory per-IP rate limiting.
//!
//! A sliding-window limiter keyed by caller IP, applied only to the
//! unauthenticated auth endpoints and the provisioning/send endpoints, and
//! only in production deployments. Entries for idle IPs are swept every
//! `cleanup_interval` checks to keep memory bounded.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::auth::client_ip;
use crate::state::AppState;

/// Configuration for a sliding-window limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed inside the window.
    pub max_requests: u32,
    /// Size of the sliding window.
    pub window: Duration,
    /// Sweep idle entries every N checks.
    pub cleanup_interval: u64,
}

impl RateLimitConfig {
    /// Limits for `/auth/register` and `/auth/login`: 5 per 15 minutes per IP.
    pub fn auth() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(15 * 60),
            cleanup_interval: 64,
        }
    }

    /// Limits for provisioning and send endpoints: 100 per 15 minutes per IP.
    pub fn api() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            cleanup_interval: 256,
        }
    }
}

/// Sliding-window rate limiter over request timestamps per key.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: RwLock<HashMap<String, Vec<Instant>>>,
    check_count: AtomicU64,
}

impl RateLimiter {
    /// Create a limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HashMap::new()),
            check_count: AtomicU64::new(0),
        }
    }

    /// Record a request for `key` and report whether it is allowed.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();

        let count = self.check_count.fetch_add(1, Ordering::Relaxed);
        if count % self.config.cleanup_interval == 0 {
            self.cleanup(now);
        }

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let entry = state.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.config.window);

        if entry.len() as u32 >= self.config.max_requests {
            return false;
        }

        entry.push(now);
        true
    }

    fn cleanup(&self, now: Instant) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.retain(|_, timestamps| {
            timestamps.retain(|t| now.duration_since(*t) < self.config.window);
            !timestamps.is_empty()
        });
    }
}

/// Middleware limiting the unauthenticated auth endpoints per IP.
pub async fn auth_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    limit(state.auth_limiter.clone(), state.production, request, next).await
}

/// Middleware limiting the provisioning and send endpoints per IP.
pub async fn api_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    limit(state.api_limiter.clone(), state.production, request, next).await
}

async fn limit(
    limiter: std::sync::Arc<RateLimiter>,
    production: bool,
    request: Request,
    next: Next,
) -> Response {
    // Rate limiting is a production concern; development runs unthrottled.
    if !production {
        return next.run(request).await;
    }

    let ip = client_ip(request.headers()).unwrap_or_else(|| "unknown".to_string());

    if limiter.check(&ip) {
        next.run(request).await
    } else {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "error": "Too many requests, please try again later",
            })),
        )
            .into_response()
    }
}
