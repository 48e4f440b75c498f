// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Instance provisioning, listing, QR/status refresh, and deletion.
//!
//! Provisioning is the only place the upstream pool is consulted; the server
//! chosen here is fixed on the instance row for life. The upstream creation
//! call is synchronous and unretried - a failure aborts the flow before
//! anything is persisted.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Extension;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use wagate_core::credentials;
use wagate_core::db;
use wagate_core::db::instances::{Instance, NewInstance};
use wagate_core::error::Error;

use crate::auth::CurrentTenant;
use crate::handlers::ApiResult;
use crate::state::AppState;

/// How long a QR credential stays valid after it is issued.
fn qr_expiry() -> DateTime<Utc> {
    Utc::now() + chrono::Duration::minutes(5)
}

/// Body for `POST /phone-numbers/create`.
#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    /// Tenant-facing display name.
    pub display_name: Option<String>,
    /// Callback URL for event forwarding.
    pub webhook_url: Option<String>,
}

/// `POST /phone-numbers/create` - provision a messaging instance.
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Json(request): Json<CreateInstanceRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let current = db::instances::count_for_tenant(&state.pool, tenant.id).await?;

    if current >= i64::from(tenant.max_instances) {
        return Err(Error::QuotaExceeded {
            current,
            max: i64::from(tenant.max_instances),
        }
        .into());
    }

    let instance_name = credentials::generate_instance_name(tenant.id);
    let token = credentials::generate_instance_token();
    let server = state.servers.next().to_string();
    let upstream_webhook = request
        .webhook_url
        .clone()
        .or_else(|| state.default_webhook_url.clone());

    info!(
        tenant_id = %tenant.id,
        server = %server,
        instance_name = %instance_name,
        "creating instance"
    );

    let upstream_response = state
        .upstream
        .create_instance(&server, &instance_name, &token, upstream_webhook.as_deref())
        .await?;

    let qr_code = upstream_response
        .pointer("/qrcode/base64")
        .and_then(Value::as_str)
        .map(str::to_string);

    let instance = db::instances::create(
        &state.pool,
        &NewInstance {
            tenant_id: tenant.id,
            instance_name,
            token,
            display_name: Some(
                request
                    .display_name
                    .unwrap_or_else(|| format!("Phone {}", current + 1)),
            ),
            server_url: server,
            status: "qr_ready".to_string(),
            webhook_url: request.webhook_url,
            qr_code,
            qr_expires_at: Some(qr_expiry()),
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Phone number instance created successfully",
            "phone_number": {
                "id": instance.id,
                "instance_name": instance.instance_name,
                "token": instance.token,
                "display_name": instance.display_name,
                "status": instance.status,
                "qr_code": instance.qr_code,
                "qr_expires_at": instance.qr_expires_at,
                "server": instance.server_url,
            }
        })),
    ))
}

/// `GET /phone-numbers` - list the tenant's instances, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
) -> ApiResult<Json<Value>> {
    let instances = db::instances::list_for_tenant(&state.pool, tenant.id).await?;
    let rows: Vec<Value> = instances.iter().map(instance_json).collect();

    Ok(Json(json!({
        "success": true,
        "count": rows.len(),
        "phone_numbers": rows,
    })))
}

/// `GET /phone-numbers/{id}/qr` - return the cached QR, refreshing it from
/// the upstream when missing or expired.
pub async fn qr(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let instance = db::instances::get_for_tenant(&state.pool, id, tenant.id)
        .await?
        .ok_or_else(|| Error::NotFound("Phone number not found".to_string()))?;

    let fresh = matches!(
        (&instance.qr_code, instance.qr_expires_at),
        (Some(_), Some(expires_at)) if expires_at > Utc::now()
    );

    if fresh {
        return Ok(Json(json!({
            "success": true,
            "qr_code": instance.qr_code,
            "expires_at": instance.qr_expires_at,
            "status": instance.status,
        })));
    }

    let response = state
        .upstream
        .fetch_qr(&instance.server_url, &instance.instance_name)
        .await?;

    let qr_code = response
        .get("base64")
        .and_then(Value::as_str)
        .map(str::to_string);
    let expires_at = qr_expiry();

    db::instances::update_qr(&state.pool, instance.id, qr_code.as_deref(), expires_at).await?;

    Ok(Json(json!({
        "success": true,
        "qr_code": qr_code,
        "expires_at": expires_at,
        "status": "qr_ready",
    })))
}

/// `GET /phone-numbers/{id}/status` - query the upstream for live state and
/// persist it; fall back to the cached status when the upstream is
/// unreachable.
pub async fn status(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let instance = db::instances::get_for_tenant(&state.pool, id, tenant.id)
        .await?
        .ok_or_else(|| Error::NotFound("Phone number not found".to_string()))?;

    match state
        .upstream
        .connection_state(&instance.server_url, &instance.instance_name)
        .await
    {
        Ok(response) => {
            if let Some(live) = response.get("state").and_then(Value::as_str) {
                db::instances::update_status(&state.pool, instance.id, live).await?;

                return Ok(Json(json!({
                    "success": true,
                    "instance_name": instance.instance_name,
                    "status": live,
                    "phone_number": instance.phone_number,
                    "last_connected_at": instance.last_connected_at,
                    "details": response,
                })));
            }

            Ok(Json(cached_status(&instance, "Upstream response missing state; using cached status")))
        }
        Err(Error::Upstream { message }) => {
            warn!(
                error = %message,
                instance_name = %instance.instance_name,
                "status query failed; serving cached status"
            );
            Ok(Json(cached_status(&instance, "Using cached status (upstream unavailable)")))
        }
        Err(other) => Err(other.into()),
    }
}

/// `DELETE /phone-numbers/{id}` - best-effort upstream deprovision, then
/// soft delete.
pub async fn remove(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let instance = db::instances::get_for_tenant(&state.pool, id, tenant.id)
        .await?
        .ok_or_else(|| Error::NotFound("Phone number not found".to_string()))?;

    if let Err(e) = state
        .upstream
        .delete_instance(&instance.server_url, &instance.instance_name)
        .await
    {
        warn!(
            error = %e,
            instance_name = %instance.instance_name,
            "upstream deprovision failed; continuing with soft delete"
        );
    }

    db::instances::soft_delete(&state.pool, instance.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Phone number deleted successfully",
    })))
}

fn cached_status(instance: &Instance, note: &str) -> Value {
    json!({
        "success": true,
        "instance_name": instance.instance_name,
        "status": instance.status,
        "phone_number": instance.phone_number,
        "last_connected_at": instance.last_connected_at,
        "note": note,
    })
}

fn instance_json(instance: &Instance) -> Value {
    json!({
        "id": instance.id,
        "instance_name": instance.instance_name,
        "token": instance.token,
        "display_name": instance.display_name,
        "phone_number": instance.phone_number,
        "status": instance.status,
        "server": instance.server_url,
        "webhook_url": instance.webhook_url,
        "is_active": instance.is_active,
        "last_connected_at": instance.last_connected_at,
        "created_at": instance.created_at,
    })
}
