// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Messaging instance persistence.
//!
//! An instance's assigned upstream server (`server_url`) is fixed at creation
//! and never reassigned. Status, QR, and connection timestamps are mutated by
//! webhook events and on-demand refreshes; those writes are single
//! conditional statements so concurrent events cannot lose updates.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

/// Messaging instance record from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Instance {
    /// Unique identifier for the instance.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Globally-unique instance name, also the upstream's identifier.
    pub instance_name: String,
    /// Capability credential for send operations on this instance.
    pub token: String,
    /// Linked phone number, once known from connection events.
    pub phone_number: Option<String>,
    /// Tenant-facing display name.
    pub display_name: Option<String>,
    /// Current lifecycle status (qr_ready, connecting, connected, open, close, ...).
    pub status: String,
    /// Base URL of the assigned upstream server. Fixed at creation.
    pub server_url: String,
    /// Cached QR pairing credential.
    pub qr_code: Option<String>,
    /// When the cached QR credential expires.
    pub qr_expires_at: Option<DateTime<Utc>>,
    /// Last time a connection was established.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Last time the connection closed.
    pub last_disconnected_at: Option<DateTime<Utc>>,
    /// Number of observed connection attempts.
    pub connection_attempts: i32,
    /// Tenant callback URL for event forwarding.
    pub webhook_url: Option<String>,
    /// Whether the instance is active (cleared on soft delete).
    pub is_active: bool,
    /// Whether the upstream should auto-reconnect this instance.
    pub auto_reconnect: bool,
    /// When the instance was created.
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a new instance.
#[derive(Debug, Clone)]
pub struct NewInstance {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Generated globally-unique name.
    pub instance_name: String,
    /// Generated send-capability token.
    pub token: String,
    /// Tenant-facing display name.
    pub display_name: Option<String>,
    /// Assigned upstream server base URL.
    pub server_url: String,
    /// Initial lifecycle status.
    pub status: String,
    /// Tenant callback URL.
    pub webhook_url: Option<String>,
    /// QR credential returned by the upstream at creation, if any.
    pub qr_code: Option<String>,
    /// Expiry of the initial QR credential.
    pub qr_expires_at: Option<DateTime<Utc>>,
}

const INSTANCE_COLUMNS: &str = "id, tenant_id, instance_name, token, phone_number, display_name, \
     status, server_url, qr_code, qr_expires_at, last_connected_at, \
     last_disconnected_at, connection_attempts, webhook_url, is_active, \
     auto_reconnect, created_at";

/// Count a tenant's non-deleted instances (the quota denominator).
pub async fn count_for_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<i64> {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM instances WHERE tenant_id = $1 AND deleted_at IS NULL",
    )
    .bind(tenant_id)
    .fetch_one(pool)
    .await?;

    Ok(count.0)
}

/// Persist a newly provisioned instance.
pub async fn create(pool: &PgPool, instance: &NewInstance) -> Result<Instance> {
    let query = format!(
        r#"
        INSERT INTO instances
            (tenant_id, instance_name, token, display_name, server_url,
             status, webhook_url, qr_code, qr_expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {INSTANCE_COLUMNS}
        "#
    );

    Ok(sqlx::query_as::<_, Instance>(&query)
        .bind(instance.tenant_id)
        .bind(&instance.instance_name)
        .bind(&instance.token)
        .bind(instance.display_name.as_deref())
        .bind(&instance.server_url)
        .bind(&instance.status)
        .bind(instance.webhook_url.as_deref())
        .bind(instance.qr_code.as_deref())
        .bind(instance.qr_expires_at)
        .fetch_one(pool)
        .await?)
}

/// Get a tenant-owned, non-deleted instance by id.
pub async fn get_for_tenant(
    pool: &PgPool,
    instance_id: Uuid,
    tenant_id: Uuid,
) -> Result<Option<Instance>> {
    let query = format!(
        r#"
        SELECT {INSTANCE_COLUMNS}
        FROM instances
        WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
        "#
    );

    Ok(sqlx::query_as::<_, Instance>(&query)
        .bind(instance_id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?)
}

/// Resolve a tenant-owned, non-deleted instance by its send token.
pub async fn find_by_token_for_tenant(
    pool: &PgPool,
    token: &str,
    tenant_id: Uuid,
) -> Result<Option<Instance>> {
    let query = format!(
        r#"
        SELECT {INSTANCE_COLUMNS}
        FROM instances
        WHERE token = $1 AND tenant_id = $2 AND deleted_at IS NULL
        "#
    );

    Ok(sqlx::query_as::<_, Instance>(&query)
        .bind(token)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?)
}

/// Resolve a non-deleted instance by its upstream name (webhook ingestion path).
pub async fn find_by_name(pool: &PgPool, instance_name: &str) -> Result<Option<Instance>> {
    let query = format!(
        r#"
        SELECT {INSTANCE_COLUMNS}
        FROM instances
        WHERE instance_name = $1 AND deleted_at IS NULL
        "#
    );

    Ok(sqlx::query_as::<_, Instance>(&query)
        .bind(instance_name)
        .fetch_optional(pool)
        .await?)
}

/// List a tenant's non-deleted instances, newest first.
pub async fn list_for_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Instance>> {
    let query = format!(
        r#"
        SELECT {INSTANCE_COLUMNS}
        FROM instances
        WHERE tenant_id = $1 AND deleted_at IS NULL
        ORDER BY created_at DESC
        "#
    );

    Ok(sqlx::query_as::<_, Instance>(&query)
        .bind(tenant_id)
        .fetch_all(pool)
        .await?)
}

/// Store a fresh QR credential with its expiry and mark the instance `qr_ready`.
pub async fn update_qr(
    pool: &PgPool,
    instance_id: Uuid,
    qr_code: Option<&str>,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE instances
        SET qr_code = $2, qr_expires_at = $3, status = 'qr_ready', updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(instance_id)
    .bind(qr_code)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Store a fresh QR credential keyed by instance name (webhook event path).
pub async fn update_qr_by_name(
    pool: &PgPool,
    instance_name: &str,
    qr_code: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE instances
        SET qr_code = $2, qr_expires_at = $3, status = 'qr_ready', updated_at = NOW()
        WHERE instance_name = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(instance_name)
    .bind(qr_code)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a status reported by an on-demand upstream state query.
pub async fn update_status(pool: &PgPool, instance_id: Uuid, status: &str) -> Result<()> {
    sqlx::query("UPDATE instances SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(instance_id)
        .bind(status)
        .execute(pool)
        .await?;

    Ok(())
}

/// Apply a `connection.update` event in one conditional statement.
///
/// The phone number is coalesced (never overwritten with NULL), connect and
/// disconnect timestamps are stamped only for the matching states, and the
/// attempt counter increments only on `connecting`. Last-write-wins with
/// concurrent events is accepted per the platform's ordering contract.
pub async fn apply_connection_update(
    pool: &PgPool,
    instance_name: &str,
    state: &str,
    phone_number: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE instances
        SET status = $2,
            phone_number = COALESCE($3, phone_number),
            last_connected_at = CASE
                WHEN $2 IN ('connected', 'open') THEN NOW()
                ELSE last_connected_at
            END,
            last_disconnected_at = CASE
                WHEN $2 = 'close' THEN NOW()
                ELSE last_disconnected_at
            END,
            connection_attempts = CASE
                WHEN $2 = 'connecting' THEN connection_attempts + 1
                ELSE connection_attempts
            END,
            updated_at = NOW()
        WHERE instance_name = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(instance_name)
    .bind(state)
    .bind(phone_number)
    .execute(pool)
    .await?;

    Ok(())
}

/// Soft-delete an instance: stamp `deleted_at` and clear the active flag.
pub async fn soft_delete(pool: &PgPool, instance_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE instances
        SET deleted_at = NOW(), is_active = false, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(instance_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Check whether a status string counts as sendable.
///
/// The upstream reports `open` for a live session; older firmwares report
/// `connected`. Both are accepted.
pub fn is_connected(status: &str) -> bool {
    matches!(status, "connected" | "open")
}
