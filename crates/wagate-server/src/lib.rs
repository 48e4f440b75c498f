// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wagate Server - Multi-Tenant WhatsApp Gateway API
//!
//! This crate provides the HTTP control plane of the wagate platform. It
//! authenticates tenants by API key, provisions messaging instances on a
//! round-robin pool of upstream gateway servers, relays send requests,
//! ingests asynchronous webhook events, and serves usage statistics.
//!
//! # HTTP Surface
//!
//! | Method/Path | Auth | Purpose |
//! |-------------|------|---------|
//! | `GET /health` | none | Liveness: status, timestamp, uptime |
//! | `POST /auth/register` | none (rate-limited) | Create a tenant account |
//! | `POST /auth/login` | none (rate-limited) | Verify credentials, return profile + API key |
//! | `GET /user/profile` | tenant | Tenant profile with aggregates |
//! | `POST /phone-numbers/create` | tenant | Provision a messaging instance |
//! | `GET /phone-numbers` | tenant | List the tenant's instances |
//! | `GET /phone-numbers/{id}/qr` | tenant | Fetch or refresh the pairing QR |
//! | `GET /phone-numbers/{id}/status` | tenant | Fetch live connection state |
//! | `DELETE /phone-numbers/{id}` | tenant | Soft-delete + best-effort deprovision |
//! | `POST /messages/send-text` | tenant + instance token | Relay a text message |
//! | `POST /messages/send-media` | tenant + instance token | Relay a media message |
//! | `POST /webhook` | instance-name keyed | Upstream event ingestion |
//! | `GET /statistics` | tenant | Filterable usage report |
//! | `GET /dashboard` | tenant | Aggregate dashboard |
//!
//! Tenant auth is a capability API key in the `x-api-key` (or `apikey`)
//! header. Send operations additionally require the per-instance token in the
//! request body.
//!
//! # Upstream Calls
//!
//! Every upstream call carries the deployment-wide gateway API key and an
//! explicit timeout; failures are surfaced as `UPSTREAM_ERROR` without
//! retries, except the two graceful-degradation paths (status polling falls
//! back to the cached status, webhook forwarding failures only get logged).
//!
//! | Operation | Timeout |
//! |-----------|---------|
//! | Instance creation | 30 s |
//! | QR fetch | 15 s |
//! | Connection state | 10 s |
//! | Instance deletion | 10 s |
//! | Send text | 30 s |
//! | Send media | 60 s |
//! | Webhook forward | 5 s |
//!
//! # Modules
//!
//! - [`auth`]: Tenant API key middleware + fire-and-forget request logging
//! - [`handlers`]: Route handlers and the response envelope
//! - [`rate_limit`]: Per-IP sliding-window limiter for the auth endpoints
//! - [`routes`]: Router assembly
//! - [`state`]: Shared application state
//! - [`upstream`]: Gateway pool selector and HTTP client

#![deny(missing_docs)]

/// Tenant authentication middleware and request logging.
pub mod auth;

/// HTTP route handlers.
pub mod handlers;

/// In-memory per-IP rate limiting for unauthenticated endpoints.
pub mod rate_limit;

/// Router assembly.
pub mod routes;

/// Shared application state injected into request handlers.
pub mod state;

/// Upstream gateway pool selection and HTTP client.
pub mod upstream;

pub use routes::router;
pub use state::AppState;
