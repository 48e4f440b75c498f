// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Usage statistics, dashboard, and profile.

use axum::Extension;
use axum::Json;
use axum::extract::{Query, State};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use wagate_core::db;
use wagate_core::db::tenants::TenantDashboard;
use wagate_core::db::usage::StatisticsFilter;
use wagate_core::error::Error;

use crate::auth::CurrentTenant;
use crate::handlers::ApiResult;
use crate::state::AppState;

/// Default and maximum row counts for the statistics report.
const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1_000;

/// Query parameters for `GET /statistics`.
#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    /// Restrict to one instance.
    pub phone_number_id: Option<Uuid>,
    /// Include days on or after this date (YYYY-MM-DD).
    pub start_date: Option<NaiveDate>,
    /// Include days on or before this date (YYYY-MM-DD).
    pub end_date: Option<NaiveDate>,
    /// Maximum rows returned.
    pub limit: Option<i64>,
}

/// `GET /statistics` - filterable per-day usage rows with aggregate totals.
pub async fn statistics(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<Json<Value>> {
    let filter = StatisticsFilter {
        tenant_id: tenant.id,
        instance_id: query.phone_number_id,
        start_date: query.start_date,
        end_date: query.end_date,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    };

    let rows = db::usage::list_usage(&state.pool, &filter).await?;

    let mut totals = (0i64, 0i64, 0i64, 0i64, 0i64);
    for row in &rows {
        totals.0 += i64::from(row.messages_sent);
        totals.1 += i64::from(row.messages_received);
        totals.2 += i64::from(row.messages_failed);
        totals.3 += i64::from(row.media_sent);
        totals.4 += i64::from(row.media_received);
    }

    let statistics: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "phone_number_id": row.instance_id,
                "display_name": row.display_name,
                "phone_number": row.phone_number,
                "date": row.date,
                "messages_sent": row.messages_sent,
                "messages_received": row.messages_received,
                "messages_failed": row.messages_failed,
                "media_sent": row.media_sent,
                "media_received": row.media_received,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "statistics": statistics,
        "totals": {
            "messages_sent": totals.0,
            "messages_received": totals.1,
            "messages_failed": totals.2,
            "media_sent": totals.3,
            "media_received": totals.4,
        },
        "count": statistics.len(),
    })))
}

/// `GET /dashboard` - aggregate dashboard view.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
) -> ApiResult<Json<Value>> {
    let dashboard = fetch_dashboard(&state, tenant.id).await?;

    Ok(Json(json!({
        "success": true,
        "dashboard": dashboard_json(&dashboard),
    })))
}

/// `GET /user/profile` - the same aggregate view keyed as `user`.
pub async fn profile(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
) -> ApiResult<Json<Value>> {
    let dashboard = fetch_dashboard(&state, tenant.id).await?;

    Ok(Json(json!({
        "success": true,
        "user": dashboard_json(&dashboard),
    })))
}

async fn fetch_dashboard(state: &AppState, tenant_id: Uuid) -> Result<TenantDashboard, Error> {
    db::tenants::dashboard(&state.pool, tenant_id)
        .await?
        .ok_or_else(|| Error::NotFound("Account not found".to_string()))
}

fn dashboard_json(dashboard: &TenantDashboard) -> Value {
    json!({
        "id": dashboard.id,
        "email": dashboard.email,
        "full_name": dashboard.full_name,
        "company_name": dashboard.company_name,
        "plan_type": dashboard.plan_type,
        "max_phone_numbers": dashboard.max_instances,
        "max_messages_per_day": dashboard.max_messages_per_day,
        "status": dashboard.status,
        "created_at": dashboard.created_at,
        "total_phone_numbers": dashboard.total_instances,
        "connected_phone_numbers": dashboard.connected_instances,
        "messages_sent_today": dashboard.messages_sent_today,
        "messages_sent_30d": dashboard.messages_sent_30d,
    })
}
