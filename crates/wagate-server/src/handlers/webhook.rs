// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Upstream webhook ingestion.
//!
//! Upstream servers call `POST /webhook` with `{event, instance, data}`.
//! There is no tenant authentication on this path - authenticity rests on
//! the instance name resolving to a known, non-deleted instance. The
//! endpoint acknowledges with a bare status code: 404 for unknown
//! instances, 200 once internal state is updated. Forwarding the event to
//! the tenant's callback URL is best-effort and only ever logged.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, warn};

use wagate_core::db;

use crate::state::AppState;

/// Typed view of the known upstream event kinds.
///
/// Anything unrecognized is [`InstanceEvent::Unknown`]: accepted, applied as
/// a no-op, and still forwarded to the tenant callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceEvent {
    /// `connection.update` - the instance's live connection state changed.
    ConnectionUpdate {
        /// The reported state (`open`, `close`, `connecting`, ...).
        state: String,
        /// Linked phone number, when the event carries one.
        phone_number: Option<String>,
    },
    /// `messages.upsert` - a message flowed through the instance.
    MessagesUpsert {
        /// Whether this instance originated the message.
        from_me: bool,
    },
    /// `qrcode.updated` - a fresh pairing QR was issued.
    QrCodeUpdated {
        /// The QR credential, when present.
        qr_code: Option<String>,
    },
    /// Any other event type: passthrough.
    Unknown,
}

impl InstanceEvent {
    /// Parse an event type tag and its payload into a typed event.
    pub fn parse(event: &str, data: &Value) -> Self {
        match event {
            "connection.update" => match data.get("state").and_then(Value::as_str) {
                Some(state) => Self::ConnectionUpdate {
                    state: state.to_string(),
                    phone_number: data
                        .get("phoneNumber")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                },
                // A connection update without a state has nothing to apply.
                None => Self::Unknown,
            },
            "messages.upsert" => Self::MessagesUpsert {
                from_me: data
                    .pointer("/key/fromMe")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            "qrcode.updated" => Self::QrCodeUpdated {
                qr_code: data
                    .get("qrcode")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            _ => Self::Unknown,
        }
    }
}

/// `POST /webhook` - ingest an upstream event.
pub async fn ingest(State(state): State<AppState>, Json(body): Json<Value>) -> StatusCode {
    let event = body
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let Some(instance_name) = body.get("instance").and_then(Value::as_str) else {
        return StatusCode::NOT_FOUND;
    };

    debug!(event = %event, instance = %instance_name, "webhook received");

    let instance = match db::instances::find_by_name(&state.pool, instance_name).await {
        Ok(Some(instance)) => instance,
        Ok(None) => {
            debug!(instance = %instance_name, "webhook for unknown instance");
            return StatusCode::NOT_FOUND;
        }
        Err(e) => {
            error!(error = %e, "webhook instance lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let data = body.get("data").cloned().unwrap_or(Value::Null);

    let applied = match InstanceEvent::parse(&event, &data) {
        InstanceEvent::ConnectionUpdate {
            state: conn_state,
            phone_number,
        } => {
            db::instances::apply_connection_update(
                &state.pool,
                &instance.instance_name,
                &conn_state,
                phone_number.as_deref(),
            )
            .await
        }
        InstanceEvent::MessagesUpsert { from_me } => {
            db::usage::record_message_event(&state.pool, instance.id, from_me).await
        }
        InstanceEvent::QrCodeUpdated {
            qr_code: Some(qr_code),
        } => {
            db::instances::update_qr_by_name(
                &state.pool,
                &instance.instance_name,
                &qr_code,
                Utc::now() + chrono::Duration::minutes(5),
            )
            .await
        }
        InstanceEvent::QrCodeUpdated { qr_code: None } | InstanceEvent::Unknown => Ok(()),
    };

    if let Err(e) = applied {
        error!(
            error = %e,
            event = %event,
            instance = %instance.instance_name,
            "failed to apply webhook event"
        );
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    // Internal state is updated; from here on nothing can fail the caller.
    if let Some(webhook_url) = instance.webhook_url.as_deref() {
        let outcome = state.upstream.forward_event(webhook_url, &body).await;

        if let Some(forward_error) = &outcome.error_message {
            warn!(
                error = %forward_error,
                url = %webhook_url,
                instance = %instance.instance_name,
                "webhook forward failed"
            );
        }

        if let Err(e) =
            db::logs::insert_webhook_log(&state.pool, instance.id, &event, &body, &outcome).await
        {
            error!(error = %e, "failed to write webhook log");
        }
    }

    StatusCode::OK
}
