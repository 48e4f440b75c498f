// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP route handlers.
//!
//! Every response carries a `success` flag; failures add an `error` message
//! and, where the error kind defines it, structured detail. [`ApiError`] is
//! the single mapping from the platform error taxonomy onto HTTP statuses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use wagate_core::error::Error;

/// Registration and login.
pub mod auth;

/// Liveness endpoint.
pub mod health;

/// Instance provisioning, listing, QR/status refresh, deletion.
pub mod instances;

/// Message relay (send-text, send-media).
pub mod messages;

/// Usage statistics, dashboard, and profile.
pub mod statistics;

/// Upstream webhook ingestion.
pub mod webhook;

/// Result type for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Wrapper turning a platform [`Error`] into an HTTP response envelope.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            Error::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                json!({"success": false, "error": message}),
            ),
            Error::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                json!({"success": false, "error": message}),
            ),
            Error::QuotaExceeded { current, max } => (
                StatusCode::FORBIDDEN,
                json!({
                    "success": false,
                    "error": "Phone number limit reached",
                    "current": current,
                    "max": max,
                }),
            ),
            Error::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({"success": false, "error": message}),
            ),
            Error::NotConnected { .. } => (
                StatusCode::BAD_REQUEST,
                json!({"success": false, "error": self.0.to_string()}),
            ),
            Error::Conflict(message) => (
                StatusCode::CONFLICT,
                json!({"success": false, "error": message}),
            ),
            Error::Validation(message) => (
                StatusCode::BAD_REQUEST,
                json!({"success": false, "error": message}),
            ),
            Error::Upstream { message } => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "success": false,
                    "error": "Upstream gateway error",
                    "details": message,
                }),
            ),
            _ => {
                tracing::error!(error = %self.0, code = self.0.error_code(), "internal error");
                let mut body = json!({"success": false, "error": "Internal server error"});
                // Internal detail is exposed in development builds only.
                if cfg!(debug_assertions) {
                    body["message"] = json!(self.0.to_string());
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "error": "Endpoint not found"})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (Error::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (Error::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                Error::QuotaExceeded { current: 3, max: 3 },
                StatusCode::FORBIDDEN,
            ),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                Error::NotConnected {
                    status: "close".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (Error::Conflict("x".into()), StatusCode::CONFLICT),
            (Error::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                Error::Upstream {
                    message: "x".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let response = ApiError(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
