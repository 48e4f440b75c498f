// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-day usage counters.
//!
//! Counters are created lazily on the first event of a day and incremented
//! with a single `INSERT ... ON CONFLICT ... DO UPDATE` upsert, so concurrent
//! increments for the same instance and day never lose updates.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

/// Usage counter row for one instance on one calendar day.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyUsage {
    /// The instance these counters belong to.
    pub instance_id: Uuid,
    /// The calendar day.
    pub date: NaiveDate,
    /// Messages sent through the relay or reported sent by the upstream.
    pub messages_sent: i32,
    /// Messages received, reported by the upstream.
    pub messages_received: i32,
    /// Messages that failed to deliver.
    pub messages_failed: i32,
    /// Media messages sent.
    pub media_sent: i32,
    /// Media messages received.
    pub media_received: i32,
}

/// Record a successful relay send for today.
///
/// Increments `messages_sent`, and `media_sent` as well when `media` is set.
pub async fn record_sent(pool: &PgPool, instance_id: Uuid, media: bool) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_usage (instance_id, date, messages_sent, media_sent)
        VALUES ($1, CURRENT_DATE, 1, CASE WHEN $2::BOOL THEN 1 ELSE 0 END)
        ON CONFLICT (instance_id, date) DO UPDATE SET
            messages_sent = daily_usage.messages_sent + 1,
            media_sent = daily_usage.media_sent + CASE WHEN $2::BOOL THEN 1 ELSE 0 END,
            updated_at = NOW()
        "#,
    )
    .bind(instance_id)
    .bind(media)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a `messages.upsert` webhook event for today.
///
/// The upstream's `fromMe` flag decides which counter increments: sent for
/// messages originated by this instance, received otherwise.
pub async fn record_message_event(pool: &PgPool, instance_id: Uuid, from_me: bool) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_usage (instance_id, date, messages_sent, messages_received)
        VALUES ($1, CURRENT_DATE,
                CASE WHEN $2::BOOL THEN 1 ELSE 0 END,
                CASE WHEN $2::BOOL THEN 0 ELSE 1 END)
        ON CONFLICT (instance_id, date) DO UPDATE SET
            messages_sent = daily_usage.messages_sent + CASE WHEN $2::BOOL THEN 1 ELSE 0 END,
            messages_received = daily_usage.messages_received + CASE WHEN $2::BOOL THEN 0 ELSE 1 END,
            updated_at = NOW()
        "#,
    )
    .bind(instance_id)
    .bind(from_me)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get the counter row for one instance and day, if it exists.
pub async fn get_for_day(
    pool: &PgPool,
    instance_id: Uuid,
    date: NaiveDate,
) -> Result<Option<DailyUsage>> {
    Ok(sqlx::query_as::<_, DailyUsage>(
        r#"
        SELECT instance_id, date, messages_sent, messages_received,
               messages_failed, media_sent, media_received
        FROM daily_usage
        WHERE instance_id = $1 AND date = $2
        "#,
    )
    .bind(instance_id)
    .bind(date)
    .fetch_optional(pool)
    .await?)
}

/// Filters for the statistics report.
#[derive(Debug, Clone)]
pub struct StatisticsFilter {
    /// Tenant whose instances are reported.
    pub tenant_id: Uuid,
    /// Restrict to one instance.
    pub instance_id: Option<Uuid>,
    /// Include days on or after this date.
    pub start_date: Option<NaiveDate>,
    /// Include days on or before this date.
    pub end_date: Option<NaiveDate>,
    /// Maximum rows returned.
    pub limit: i64,
}

/// One statistics row: an instance's counters for one day.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsageReportRow {
    /// The instance these counters belong to.
    pub instance_id: Uuid,
    /// The instance's display name.
    pub display_name: Option<String>,
    /// The instance's linked phone number.
    pub phone_number: Option<String>,
    /// The calendar day.
    pub date: NaiveDate,
    /// Messages sent.
    pub messages_sent: i32,
    /// Messages received.
    pub messages_received: i32,
    /// Messages failed.
    pub messages_failed: i32,
    /// Media sent.
    pub media_sent: i32,
    /// Media received.
    pub media_received: i32,
}

/// List per-day usage rows for a tenant's non-deleted instances, newest first.
pub async fn list_usage(pool: &PgPool, filter: &StatisticsFilter) -> Result<Vec<UsageReportRow>> {
    Ok(sqlx::query_as::<_, UsageReportRow>(
        r#"
        SELECT u.instance_id, i.display_name, i.phone_number, u.date,
               u.messages_sent, u.messages_received, u.messages_failed,
               u.media_sent, u.media_received
        FROM daily_usage u
        JOIN instances i ON i.id = u.instance_id
        WHERE i.tenant_id = $1 AND i.deleted_at IS NULL
          AND ($2::UUID IS NULL OR u.instance_id = $2)
          AND ($3::DATE IS NULL OR u.date >= $3)
          AND ($4::DATE IS NULL OR u.date <= $4)
        ORDER BY u.date DESC
        LIMIT $5
        "#,
    )
    .bind(filter.tenant_id)
    .bind(filter.instance_id)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .bind(filter.limit)
    .fetch_all(pool)
    .await?)
}
