// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for registration, login, and tenant authentication.

mod common;

use common::*;
use serde_json::{Value, json};

/// Helper macro to skip tests if database URL is not set.
macro_rules! skip_if_no_db {
    () => {
        if std::env::var("WAGATE_TEST_DATABASE_URL").is_err()
            && std::env::var("WAGATE_DATABASE_URL").is_err()
        {
            eprintln!(
                "Skipping test: WAGATE_TEST_DATABASE_URL or WAGATE_DATABASE_URL not set"
            );
            return;
        }
    };
}

#[tokio::test]
async fn test_register_then_login() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let email = ctx.email("login");
    let response = ctx
        .http
        .post(format!("{}/auth/register", ctx.base_url))
        .json(&json!({
            "email": email,
            "password": "hunter2hunter2",
            "full_name": "Login Tester",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["plan_type"], "starter");
    assert_eq!(body["user"]["max_phone_numbers"], 3);
    assert_eq!(body["user"]["api_key"].as_str().unwrap().len(), 64);

    let response = ctx
        .http
        .post(format!("{}/auth/login", ctx.base_url))
        .json(&json!({"email": email, "password": "hunter2hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["full_name"], "Login Tester");
    assert_eq!(body["user"]["api_key"].as_str().unwrap().len(), 64);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let email = ctx.email("dup");
    let body = json!({"email": email, "password": "hunter2hunter2"});

    let first = ctx
        .http
        .post(format!("{}/auth/register", ctx.base_url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = ctx
        .http
        .post(format!("{}/auth/register", ctx.base_url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 409);

    let body: Value = second.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Email already registered");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_register_validation() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    // Missing password
    let response = ctx
        .http
        .post(format!("{}/auth/register", ctx.base_url))
        .json(&json!({"email": ctx.email("nopass")}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Short password
    let response = ctx
        .http
        .post(format!("{}/auth/register", ctx.base_url))
        .json(&json!({"email": ctx.email("short"), "password": "short"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Password must be at least 8 characters");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_plan_quotas_assigned_at_registration() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let response = ctx
        .http
        .post(format!("{}/auth/register", ctx.base_url))
        .json(&json!({
            "email": ctx.email("biz"),
            "password": "hunter2hunter2",
            "plan_type": "business",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["plan_type"], "business");
    assert_eq!(body["user"]["max_phone_numbers"], 10);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let (_, _) = ctx.register("wrongpw").await;

    let response = ctx
        .http
        .post(format!("{}/auth/login", ctx.base_url))
        .json(&json!({"email": ctx.email("wrongpw"), "password": "not-the-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid email or password");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_missing_api_key_unauthorized() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let response = ctx
        .http
        .get(format!("{}/phone-numbers", ctx.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_unknown_api_key_unauthorized() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let response = ctx
        .http
        .get(format!("{}/phone-numbers", ctx.base_url))
        .header("x-api-key", "0".repeat(64))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_suspended_tenant_forbidden() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let (tenant_id, api_key) = ctx.register("suspended").await;

    sqlx::query("UPDATE tenants SET status = 'suspended' WHERE id = $1")
        .bind(tenant_id)
        .execute(&ctx.pool)
        .await
        .unwrap();

    let response = ctx
        .http
        .get(format!("{}/phone-numbers", ctx.base_url))
        .header("x-api-key", &api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Login reports the account status too.
    let response = ctx
        .http
        .post(format!("{}/auth/login", ctx.base_url))
        .json(&json!({"email": ctx.email("suspended"), "password": "hunter2hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_apikey_header_alias_accepted() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let (_, api_key) = ctx.register("alias").await;

    let response = ctx
        .http
        .get(format!("{}/phone-numbers", ctx.base_url))
        .header("apikey", &api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_request_log_written_fire_and_forget() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let (tenant_id, api_key) = ctx.register("reqlog").await;

    let response = ctx
        .http
        .get(format!("{}/phone-numbers", ctx.base_url))
        .header("x-api-key", &api_key)
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The log write is detached; give it a moment to land.
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    let row: Option<(String, String, Option<String>, i32)> = sqlx::query_as(
        "SELECT endpoint, method, ip_address, status_code FROM request_logs \
         WHERE tenant_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(tenant_id)
    .fetch_optional(&ctx.pool)
    .await
    .unwrap();

    let (endpoint, method, ip_address, status_code) = row.expect("request log row");
    assert_eq!(endpoint, "/phone-numbers");
    assert_eq!(method, "GET");
    assert_eq!(ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(status_code, 200);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_unmatched_route_returns_envelope_404() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let response = ctx
        .http
        .get(format!("{}/no-such-route", ctx.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Endpoint not found");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_health_requires_no_auth() {
    skip_if_no_db!();
    let Some(ctx) = TestContext::new().await else {
        eprintln!("Skipping test: could not create test context");
        return;
    };

    let response = ctx
        .http
        .get(format!("{}/health", ctx.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());

    ctx.cleanup().await;
}
