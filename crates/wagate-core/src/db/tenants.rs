// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tenant persistence.
//!
//! Tenants are never hard-deleted; every query filters on
//! `deleted_at IS NULL` so soft-deleted accounts are invisible.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Tenant record from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tenant {
    /// Unique identifier for the tenant.
    pub id: Uuid,
    /// Login email, unique across non-deleted tenants.
    pub email: String,
    /// Argon2 hash of the login password.
    pub password_hash: String,
    /// Capability credential presented as `x-api-key`.
    pub api_key: String,
    /// Optional display name.
    pub full_name: Option<String>,
    /// Optional company name.
    pub company_name: Option<String>,
    /// Plan tier (starter, business, enterprise).
    pub plan_type: String,
    /// Maximum non-deleted instances this tenant may own.
    pub max_instances: i32,
    /// Daily message quota for the tenant's plan.
    pub max_messages_per_day: i32,
    /// Account status (active, suspended, cancelled).
    pub status: String,
    /// Whether the login email was verified.
    pub email_verified: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
}

/// Fields for creating a new tenant.
#[derive(Debug, Clone)]
pub struct NewTenant {
    /// Login email (stored lowercased by the caller).
    pub email: String,
    /// Argon2 hash of the login password.
    pub password_hash: String,
    /// Generated API key.
    pub api_key: String,
    /// Optional display name.
    pub full_name: Option<String>,
    /// Optional company name.
    pub company_name: Option<String>,
    /// Plan tier.
    pub plan_type: String,
    /// Instance quota for the plan.
    pub max_instances: i32,
    /// Daily message quota for the plan.
    pub max_messages_per_day: i32,
}

const TENANT_COLUMNS: &str = "id, email, password_hash, api_key, full_name, company_name, \
     plan_type, max_instances, max_messages_per_day, status, email_verified, \
     created_at, last_login";

/// Create a new tenant.
///
/// A duplicate email maps to [`Error::Conflict`]; other database failures
/// propagate as [`Error::Database`].
pub async fn create(pool: &PgPool, tenant: &NewTenant) -> Result<Tenant> {
    let query = format!(
        r#"
        INSERT INTO tenants
            (email, password_hash, api_key, full_name, company_name,
             plan_type, max_instances, max_messages_per_day)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {TENANT_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Tenant>(&query)
        .bind(&tenant.email)
        .bind(&tenant.password_hash)
        .bind(&tenant.api_key)
        .bind(tenant.full_name.as_deref())
        .bind(tenant.company_name.as_deref())
        .bind(&tenant.plan_type)
        .bind(tenant.max_instances)
        .bind(tenant.max_messages_per_day)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict("Email already registered".to_string())
            }
            _ => Error::from(e),
        })
}

/// Resolve a tenant by API key. Soft-deleted tenants are invisible.
pub async fn find_by_api_key(pool: &PgPool, api_key: &str) -> Result<Option<Tenant>> {
    let query = format!(
        r#"
        SELECT {TENANT_COLUMNS}
        FROM tenants
        WHERE api_key = $1 AND deleted_at IS NULL
        "#
    );

    Ok(sqlx::query_as::<_, Tenant>(&query)
        .bind(api_key)
        .fetch_optional(pool)
        .await?)
}

/// Resolve a tenant by login email. Soft-deleted tenants are invisible.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Tenant>> {
    let query = format!(
        r#"
        SELECT {TENANT_COLUMNS}
        FROM tenants
        WHERE email = $1 AND deleted_at IS NULL
        "#
    );

    Ok(sqlx::query_as::<_, Tenant>(&query)
        .bind(email)
        .fetch_optional(pool)
        .await?)
}

/// Stamp the tenant's last successful login.
pub async fn touch_last_login(pool: &PgPool, tenant_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE tenants SET last_login = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(tenant_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Aggregate dashboard view of a tenant.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantDashboard {
    /// Unique identifier for the tenant.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Optional display name.
    pub full_name: Option<String>,
    /// Optional company name.
    pub company_name: Option<String>,
    /// Plan tier.
    pub plan_type: String,
    /// Instance quota for the plan.
    pub max_instances: i32,
    /// Daily message quota for the plan.
    pub max_messages_per_day: i32,
    /// Account status.
    pub status: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Number of non-deleted instances.
    pub total_instances: i64,
    /// Number of non-deleted instances currently connected.
    pub connected_instances: i64,
    /// Messages sent today across all instances.
    pub messages_sent_today: i64,
    /// Messages sent in the last 30 days across all instances.
    pub messages_sent_30d: i64,
}

/// Fetch the aggregate dashboard view for a tenant.
///
/// Returns `None` when the tenant does not exist or is soft-deleted.
pub async fn dashboard(pool: &PgPool, tenant_id: Uuid) -> Result<Option<TenantDashboard>> {
    Ok(sqlx::query_as::<_, TenantDashboard>(
        r#"
        SELECT t.id, t.email, t.full_name, t.company_name, t.plan_type,
               t.max_instances, t.max_messages_per_day, t.status, t.created_at,
               COUNT(DISTINCT i.id) FILTER (WHERE i.deleted_at IS NULL) AS total_instances,
               COUNT(DISTINCT i.id) FILTER (
                   WHERE i.deleted_at IS NULL AND i.status IN ('connected', 'open')
               ) AS connected_instances,
               COALESCE(SUM(u.messages_sent) FILTER (
                   WHERE i.deleted_at IS NULL AND u.date = CURRENT_DATE
               ), 0)::BIGINT AS messages_sent_today,
               COALESCE(SUM(u.messages_sent) FILTER (
                   WHERE i.deleted_at IS NULL AND u.date >= CURRENT_DATE - INTERVAL '30 days'
               ), 0)::BIGINT AS messages_sent_30d
        FROM tenants t
        LEFT JOIN instances i ON i.tenant_id = t.id
        LEFT JOIN daily_usage u ON u.instance_id = i.id
        WHERE t.id = $1 AND t.deleted_at IS NULL
        GROUP BY t.id
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?)
}
