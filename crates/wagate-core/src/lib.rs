// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wagate Core - Tenant & Instance Persistence
//!
//! This crate provides the domain model and PostgreSQL persistence layer for
//! the wagate platform: tenants (accounts with API keys and plan quotas),
//! messaging instances provisioned on upstream WhatsApp gateway servers,
//! per-day usage counters, and append-only audit logs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tenant API Clients                               │
//! │                      (x-api-key authenticated)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           wagate-server                                  │
//! │   ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │   │ Provisioning │  │  Messaging   │  │   Webhook    │  │ Statistics │  │
//! │   │     Flow     │  │    Relay     │  │  Ingestion   │  │ /Dashboard │  │
//! │   └──────────────┘  └──────────────┘  └──────────────┘  └────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//!           │                   │                  ▲
//!           │                   │                  │ event callbacks
//!           ▼                   ▼                  │
//! ┌───────────────────┐  ┌─────────────────────────────────────────────────┐
//! │    PostgreSQL     │  │        Upstream Gateway Servers (pool)           │
//! │ (This Crate's     │  │   /instance/create  /message/sendText  ...       │
//! │  persistence)     │  └─────────────────────────────────────────────────┘
//! └───────────────────┘
//! ```
//!
//! # Instance Status Lifecycle
//!
//! ```text
//!      ┌─────────┐   upstream returns QR    ┌──────────┐
//!      │ created │ ───────────────────────► │ qr_ready │
//!      └─────────┘                          └────┬─────┘
//!                                                │ connection.update
//!                          ┌─────────────────────┼─────────────────────┐
//!                          ▼                     ▼                     ▼
//!                   ┌────────────┐      ┌─────────────────┐      ┌─────────┐
//!                   │ connecting │ ───► │ connected / open│ ───► │  close  │
//!                   └────────────┘      └─────────────────┘      └─────────┘
//! ```
//!
//! Status transitions after provisioning are driven only by webhook events
//! from the assigned upstream server and by on-demand status polling. The raw
//! upstream state strings (`open`, `close`, ...) are recorded verbatim;
//! last-write-wins under concurrent updates.
//!
//! # Modules
//!
//! - [`config`]: Server configuration from environment variables
//! - [`credentials`]: API key, instance token, and instance name generation
//! - [`db`]: PostgreSQL persistence for tenants, instances, usage, and logs
//! - [`error`]: Error taxonomy shared across the platform
//! - [`migrations`]: Embedded schema migrations
//! - [`phone`]: Recipient phone number normalization

#![deny(missing_docs)]

/// Server configuration loaded from environment variables.
pub mod config;

/// Generation of API keys, instance tokens, and unique instance names.
pub mod credentials;

/// PostgreSQL database operations for tenants, instances, usage counters,
/// and append-only audit logs.
pub mod db;

/// Error taxonomy for wagate operations.
pub mod error;

/// Database migrations for wagate.
///
/// All schema objects are embedded at compile time. Calling
/// `migrations::run()` applies pending migrations in order.
///
/// ```ignore
/// use wagate_core::migrations;
///
/// let pool = PgPool::connect(&database_url).await?;
/// migrations::run(&pool).await?;
/// ```
pub mod migrations;

/// Recipient phone number normalization.
pub mod phone;

pub use config::Config;
pub use error::Error;
