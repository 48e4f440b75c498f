// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Router assembly.
//!
//! Three route groups with different protection:
//! - public: health and webhook ingestion (instance-name keyed)
//! - auth: registration and login, per-IP rate limited in production
//! - api: tenant-scoped routes behind the API key middleware; provisioning
//!   and send routes carry an additional per-IP limiter

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::tenant_auth;
use crate::handlers;
use crate::rate_limit::{api_rate_limit, auth_rate_limit};
use crate::state::AppState;

/// Build the complete application router.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook", post(handlers::webhook::ingest));

    let auth = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_rate_limit,
        ));

    // Provisioning and sends get their own limiter on top of tenant auth.
    let limited_api = Router::new()
        .route("/phone-numbers/create", post(handlers::instances::create))
        .route("/messages/send-text", post(handlers::messages::send_text))
        .route("/messages/send-media", post(handlers::messages::send_media))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_rate_limit,
        ));

    let api = Router::new()
        .route("/user/profile", get(handlers::statistics::profile))
        .route("/phone-numbers", get(handlers::instances::list))
        .route("/phone-numbers/{id}/qr", get(handlers::instances::qr))
        .route("/phone-numbers/{id}/status", get(handlers::instances::status))
        .route("/phone-numbers/{id}", delete(handlers::instances::remove))
        .route("/statistics", get(handlers::statistics::statistics))
        .route("/dashboard", get(handlers::statistics::dashboard))
        .merge(limited_api)
        .route_layer(middleware::from_fn_with_state(state.clone(), tenant_auth));

    Router::new()
        .merge(public)
        .merge(auth)
        .merge(api)
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
