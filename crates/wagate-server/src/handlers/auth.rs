// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Registration and login.
//!
//! Passwords are hashed with Argon2; the API key returned at registration
//! (and echoed at login) is the capability credential for every
//! tenant-scoped endpoint. Quotas are assigned from the plan tier at
//! registration time.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use wagate_core::db;
use wagate_core::db::tenants::NewTenant;
use wagate_core::error::Error;
use wagate_core::credentials;

use crate::handlers::ApiResult;
use crate::state::AppState;

/// Body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login email.
    pub email: Option<String>,
    /// Login password, at least 8 characters.
    pub password: Option<String>,
    /// Optional display name.
    pub full_name: Option<String>,
    /// Optional company name.
    pub company_name: Option<String>,
    /// Plan tier; defaults to `starter`.
    pub plan_type: Option<String>,
}

/// Body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: Option<String>,
    /// Login password.
    pub password: Option<String>,
}

/// Instance and daily-message quotas per plan tier.
fn plan_quotas(plan_type: &str) -> (i32, i32) {
    match plan_type {
        "business" => (10, 5_000),
        "enterprise" => (50, 50_000),
        _ => (3, 1_000),
    }
}

/// `POST /auth/register` - create a tenant account.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let email = request
        .email
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let password = request.password.as_deref().unwrap_or("");

    if email.is_empty() || password.is_empty() {
        return Err(Error::Validation("Email and password are required".to_string()).into());
    }
    if password.len() < 8 {
        return Err(Error::Validation("Password must be at least 8 characters".to_string()).into());
    }

    let password_hash = hash_password(password)?;
    let api_key = credentials::generate_api_key();
    let plan_type = request.plan_type.unwrap_or_else(|| "starter".to_string());
    let (max_instances, max_messages_per_day) = plan_quotas(&plan_type);

    let tenant = db::tenants::create(
        &state.pool,
        &NewTenant {
            email,
            password_hash,
            api_key,
            full_name: request.full_name,
            company_name: request.company_name,
            plan_type,
            max_instances,
            max_messages_per_day,
        },
    )
    .await?;

    info!(tenant_id = %tenant.id, plan_type = %tenant.plan_type, "tenant registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully",
            "user": {
                "id": tenant.id,
                "email": tenant.email,
                "api_key": tenant.api_key,
                "full_name": tenant.full_name,
                "plan_type": tenant.plan_type,
                "max_phone_numbers": tenant.max_instances,
                "created_at": tenant.created_at,
            }
        })),
    ))
}

/// `POST /auth/login` - verify credentials and return the profile + API key.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let email = request
        .email
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let password = request.password.as_deref().unwrap_or("");

    if email.is_empty() || password.is_empty() {
        return Err(Error::Validation("Email and password are required".to_string()).into());
    }

    let Some(tenant) = db::tenants::find_by_email(&state.pool, &email).await? else {
        return Err(Error::Unauthorized("Invalid email or password".to_string()).into());
    };

    if tenant.status != "active" {
        return Err(Error::Forbidden(format!("Account {}", tenant.status)).into());
    }

    if !verify_password(password, &tenant.password_hash) {
        return Err(Error::Unauthorized("Invalid email or password".to_string()).into());
    }

    db::tenants::touch_last_login(&state.pool, tenant.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "user": {
            "id": tenant.id,
            "email": tenant.email,
            "full_name": tenant.full_name,
            "api_key": tenant.api_key,
            "plan_type": tenant.plan_type,
        }
    })))
}

fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}
