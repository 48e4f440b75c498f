// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Message relay.
//!
//! Send operations authenticate twice: the tenant API key (middleware) and
//! the per-instance token carried in the body, which must resolve to an
//! instance owned by that tenant. Only `connected`/`open` instances can
//! send. Counters are incremented after the upstream accepts the message,
//! never before.

use axum::Extension;
use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use wagate_core::db;
use wagate_core::db::instances::Instance;
use wagate_core::error::Error;
use wagate_core::phone;

use crate::auth::CurrentTenant;
use crate::handlers::ApiResult;
use crate::state::AppState;

/// Body for `POST /messages/send-text`.
#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    /// Instance send token.
    pub token: Option<String>,
    /// Recipient number, normalized before relay.
    pub number: Option<String>,
    /// Message text.
    pub text: Option<String>,
}

/// Body for `POST /messages/send-media`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMediaRequest {
    /// Instance send token.
    pub token: Option<String>,
    /// Recipient number, normalized before relay.
    pub number: Option<String>,
    /// URL of the media to send.
    pub media_url: Option<String>,
    /// Optional caption.
    pub caption: Option<String>,
    /// Media kind (`image`, `video`, `document`, `audio`); defaults to `image`.
    pub media_type: Option<String>,
}

/// `POST /messages/send-text` - relay a text message.
pub async fn send_text(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Json(request): Json<SendTextRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(token), Some(number), Some(text)) = (
        non_empty(request.token),
        non_empty(request.number),
        non_empty(request.text),
    ) else {
        return Err(Error::Validation("token, number, and text are required".to_string()).into());
    };

    let instance = resolve_sendable(&state, &token, tenant.id).await?;
    let recipient = phone::normalize(&number, &state.country_code);

    let response = state
        .upstream
        .send_text(&instance.server_url, &instance.instance_name, &recipient, &text)
        .await?;

    db::usage::record_sent(&state.pool, instance.id, false).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Message sent successfully",
        "message_id": response.pointer("/key/id"),
        "data": response,
    })))
}

/// `POST /messages/send-media` - relay a media message.
pub async fn send_media(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant)): Extension<CurrentTenant>,
    Json(request): Json<SendMediaRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(token), Some(number), Some(media_url)) = (
        non_empty(request.token),
        non_empty(request.number),
        non_empty(request.media_url),
    ) else {
        return Err(
            Error::Validation("token, number, and mediaUrl are required".to_string()).into(),
        );
    };

    let instance = resolve_sendable(&state, &token, tenant.id).await?;
    let recipient = phone::normalize(&number, &state.country_code);
    let caption = request.caption.unwrap_or_default();
    let media_type = request.media_type.unwrap_or_else(|| "image".to_string());

    let response = state
        .upstream
        .send_media(
            &instance.server_url,
            &instance.instance_name,
            &recipient,
            &media_url,
            &caption,
            &media_type,
        )
        .await?;

    db::usage::record_sent(&state.pool, instance.id, true).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Media sent successfully",
        "message_id": response.pointer("/key/id"),
        "data": response,
    })))
}

/// Resolve the instance token to a tenant-owned, sendable instance.
async fn resolve_sendable(
    state: &AppState,
    token: &str,
    tenant_id: uuid::Uuid,
) -> Result<Instance, Error> {
    let Some(instance) =
        db::instances::find_by_token_for_tenant(&state.pool, token, tenant_id).await?
    else {
        return Err(Error::NotFound(
            "Invalid token or phone number not found".to_string(),
        ));
    };

    if !db::instances::is_connected(&instance.status) {
        return Err(Error::NotConnected {
            status: instance.status,
        });
    }

    Ok(instance)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
