// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Database operations for wagate.
//!
//! All persistence is expressed as free async functions over a `&PgPool`.
//! Mutations that can race with concurrent webhook events (usage counters,
//! instance status fields) are single conditional statements - `COALESCE`,
//! `CASE WHEN`, `ON CONFLICT ... DO UPDATE` - never read-then-write.

use sqlx::PgPool;

/// Tenant records and aggregate dashboard queries.
pub mod tenants;

/// Messaging instance records and lifecycle updates.
pub mod instances;

/// Per-day usage counters with atomic upsert-increments.
pub mod usage;

/// Append-only request and webhook audit logs.
pub mod logs;

/// Health check for database connectivity.
pub async fn health_check(pool: &PgPool) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| true)
}
