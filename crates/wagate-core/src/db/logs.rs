// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Append-only audit logs.
//!
//! Both tables are insert-only; rows are never mutated after insertion.
//! Writers treat failures as operator-visible log lines, never as request
//! failures.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

/// Record an authenticated API call.
#[allow(clippy::too_many_arguments)]
pub async fn insert_request_log(
    pool: &PgPool,
    tenant_id: Uuid,
    endpoint: &str,
    method: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    status_code: i32,
    response_time_ms: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO request_logs
            (tenant_id, endpoint, method, ip_address, user_agent, status_code, response_time_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(tenant_id)
    .bind(endpoint)
    .bind(method)
    .bind(ip_address)
    .bind(user_agent)
    .bind(status_code)
    .bind(response_time_ms)
    .execute(pool)
    .await?;

    Ok(())
}

/// Outcome of forwarding an event to a tenant callback URL.
#[derive(Debug, Clone)]
pub struct ForwardOutcome {
    /// HTTP status returned by the callback, if a response was received.
    pub status_code: Option<i32>,
    /// Response body on success.
    pub response_body: Option<String>,
    /// Error description on failure.
    pub error_message: Option<String>,
    /// Round-trip latency in milliseconds.
    pub response_time_ms: i32,
}

/// Record an inbound webhook event and its forwarding outcome.
pub async fn insert_webhook_log(
    pool: &PgPool,
    instance_id: Uuid,
    event_type: &str,
    payload: &serde_json::Value,
    outcome: &ForwardOutcome,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO webhook_logs
            (instance_id, event_type, payload, status_code, response_body,
             error_message, response_time_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(instance_id)
    .bind(event_type)
    .bind(payload)
    .bind(outcome.status_code)
    .bind(outcome.response_body.as_deref())
    .bind(outcome.error_message.as_deref())
    .bind(outcome.response_time_ms)
    .execute(pool)
    .await?;

    Ok(())
}

/// Webhook log row (read back by tests and operator tooling).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WebhookLog {
    /// The instance the event belonged to.
    pub instance_id: Uuid,
    /// The event's type tag.
    pub event_type: Option<String>,
    /// HTTP status returned by the tenant callback.
    pub status_code: Option<i32>,
    /// Response body on success.
    pub response_body: Option<String>,
    /// Error description on failure.
    pub error_message: Option<String>,
    /// Forwarding latency in milliseconds.
    pub response_time_ms: Option<i32>,
    /// When the event was recorded.
    pub sent_at: DateTime<Utc>,
}

/// List webhook log rows for an instance, newest first.
pub async fn list_webhook_logs(pool: &PgPool, instance_id: Uuid) -> Result<Vec<WebhookLog>> {
    Ok(sqlx::query_as::<_, WebhookLog>(
        r#"
        SELECT instance_id, event_type, status_code, response_body,
               error_message, response_time_ms, sent_at
        FROM webhook_logs
        WHERE instance_id = $1
        ORDER BY sent_at DESC
        "#,
    )
    .bind(instance_id)
    .fetch_all(pool)
    .await?)
}
