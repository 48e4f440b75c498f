// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tenant authentication middleware.
//!
//! Resolves the capability API key from the `x-api-key` (or `apikey`) header
//! to an active, non-deleted tenant, and makes the tenant record available to
//! handlers via request extensions. After the handler responds, an audit row
//! is written from a detached task - request logging is fire-and-forget and
//! its failure is never visible to the caller.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use wagate_core::db;
use wagate_core::db::tenants::Tenant;
use wagate_core::error::Error;

use crate::handlers::ApiError;
use crate::state::AppState;

/// The authenticated tenant, inserted into request extensions by
/// [`tenant_auth`] and extracted by handlers.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub Tenant);

/// Middleware authenticating every tenant-scoped route.
pub async fn tenant_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(api_key) = api_key_header(request.headers()) else {
        return ApiError::from(Error::Unauthorized(
            "API key required. Please provide x-api-key header".to_string(),
        ))
        .into_response();
    };

    let tenant = match db::tenants::find_by_api_key(&state.pool, &api_key).await {
        Ok(Some(tenant)) => tenant,
        Ok(None) => {
            return ApiError::from(Error::Unauthorized("Invalid API key".to_string()))
                .into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    };

    if tenant.status != "active" {
        return ApiError::from(Error::Forbidden(format!(
            "Account {}. Please contact support.",
            tenant.status
        )))
        .into_response();
    }

    let started = Instant::now();
    let endpoint = request.uri().path().to_string();
    let method = request.method().to_string();
    let ip_address = client_ip(request.headers());
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let tenant_id = tenant.id;

    request.extensions_mut().insert(CurrentTenant(tenant));
    let response = next.run(request).await;

    let status_code = i32::from(response.status().as_u16());
    let response_time_ms = started.elapsed().as_millis() as i32;
    let pool = state.pool.clone();

    tokio::spawn(async move {
        if let Err(e) = db::logs::insert_request_log(
            &pool,
            tenant_id,
            &endpoint,
            &method,
            ip_address.as_deref(),
            user_agent.as_deref(),
            status_code,
            response_time_ms,
        )
        .await
        {
            warn!(error = %e, tenant_id = %tenant_id, "failed to write request log");
        }
    });

    response
}

fn api_key_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-api-key")
        .or_else(|| headers.get("apikey"))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// Best-effort caller IP: the first entry of `x-forwarded-for`, set by the
/// reverse proxy this service is deployed behind.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
