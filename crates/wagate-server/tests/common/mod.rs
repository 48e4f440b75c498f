// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared test harness for wagate-server integration tests.
//!
//! Each context boots the full axum application on an ephemeral port,
//! backed by the real database (gated on `WAGATE_TEST_DATABASE_URL`) and
//! wiremock upstream gateway servers. Test data is namespaced by a per-run
//! id so contexts never interfere; `cleanup()` removes everything a context
//! created through the cascading tenant delete.

#![allow(dead_code)]

use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wagate_core::config::Config;
use wagate_server::{AppState, router};

/// A running wagate-server instance plus its collaborators.
pub struct TestContext {
    /// Direct database handle for assertions and fixtures.
    pub pool: PgPool,
    /// Base URL of the running application.
    pub base_url: String,
    /// HTTP client for driving the API.
    pub http: reqwest::Client,
    /// Mock upstream gateway servers, in pool order.
    pub upstreams: Vec<MockServer>,
    /// Per-run namespace for test data.
    pub run_id: String,
}

impl TestContext {
    /// Create a context with a single upstream server.
    pub async fn new() -> Option<Self> {
        Self::with_upstreams(1).await
    }

    /// Create a context with `count` upstream servers in the pool.
    pub async fn with_upstreams(count: usize) -> Option<Self> {
        let database_url = std::env::var("WAGATE_TEST_DATABASE_URL")
            .or_else(|_| std::env::var("WAGATE_DATABASE_URL"))
            .ok()?;

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .ok()?;

        wagate_core::migrations::run(&pool).await.ok()?;
        wagate_core::db::health_check(&pool).await.ok()?;

        let mut upstreams = Vec::with_capacity(count);
        for _ in 0..count {
            upstreams.push(MockServer::start().await);
        }

        let config = Config {
            database_url,
            http_addr: "127.0.0.1:0".parse().ok()?,
            upstream_servers: upstreams.iter().map(|s| s.uri()).collect(),
            upstream_api_key: "test-gateway-key".to_string(),
            default_webhook_url: None,
            default_country_code: "62".to_string(),
            production: false,
        };

        let state = AppState::new(pool.clone(), &config);
        let app = router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.ok()?;
        let addr = listener.local_addr().ok()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Some(Self {
            pool,
            base_url: format!("http://{addr}"),
            http: reqwest::Client::new(),
            upstreams,
            run_id: Uuid::new_v4().simple().to_string(),
        })
    }

    /// The first (often only) upstream server.
    pub fn upstream(&self) -> &MockServer {
        &self.upstreams[0]
    }

    /// A run-namespaced email address.
    pub fn email(&self, name: &str) -> String {
        format!("{name}-{}@wagate-tests.local", self.run_id)
    }

    /// Register a tenant, returning `(tenant_id, api_key)`.
    pub async fn register(&self, name: &str) -> (Uuid, String) {
        self.register_with_plan(name, None).await
    }

    /// Register a tenant on a specific plan, returning `(tenant_id, api_key)`.
    pub async fn register_with_plan(&self, name: &str, plan: Option<&str>) -> (Uuid, String) {
        let mut body = json!({
            "email": self.email(name),
            "password": "hunter2hunter2",
        });
        if let Some(plan) = plan {
            body["plan_type"] = json!(plan);
        }

        let response = self
            .http
            .post(format!("{}/auth/register", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("register request");
        assert_eq!(response.status(), 201, "registration failed");

        let body: Value = response.json().await.expect("register body");
        let tenant_id = Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap();
        let api_key = body["user"]["api_key"].as_str().unwrap().to_string();
        (tenant_id, api_key)
    }

    /// Mount the default instance-creation mock on every upstream.
    pub async fn mock_instance_create(&self) {
        for upstream in &self.upstreams {
            Mock::given(method("POST"))
                .and(path("/instance/create"))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "qrcode": { "base64": "QR-INITIAL" }
                })))
                .mount(upstream)
                .await;
        }
    }

    /// Provision an instance through the API, returning the `phone_number`
    /// object from the response.
    pub async fn create_instance(&self, api_key: &str, body: Value) -> Value {
        let response = self
            .http
            .post(format!("{}/phone-numbers/create", self.base_url))
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .expect("create instance request");
        assert_eq!(response.status(), 201, "instance creation failed");

        let body: Value = response.json().await.expect("create instance body");
        body["phone_number"].clone()
    }

    /// Force an instance's status directly in the database.
    pub async fn set_instance_status(&self, instance_id: Uuid, status: &str) {
        sqlx::query("UPDATE instances SET status = $2 WHERE id = $1")
            .bind(instance_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .expect("set instance status");
    }

    /// Deliver a webhook event as an upstream server would.
    pub async fn deliver_webhook(&self, body: Value) -> reqwest::StatusCode {
        self.http
            .post(format!("{}/webhook", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("webhook request")
            .status()
    }

    /// Remove everything this context created (cascades from tenants).
    pub async fn cleanup(&self) {
        let _ = sqlx::query("DELETE FROM tenants WHERE email LIKE $1")
            .bind(format!("%-{}@wagate-tests.local", self.run_id))
            .execute(&self.pool)
            .await;
    }
}

/// Parse an instance id out of a creation response.
pub fn instance_id(phone_number: &Value) -> Uuid {
    Uuid::parse_str(phone_number["id"].as_str().unwrap()).unwrap()
}
