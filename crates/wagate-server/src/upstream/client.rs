// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP client for upstream gateway servers.
//!
//! Wraps the gateway's instance and messaging endpoints. Every call carries
//! the deployment-wide `apikey` header and an operation-specific timeout;
//! timeouts and transport errors surface as `Error::Upstream` exactly like a
//! non-2xx response. Nothing here retries - retry policy (none) belongs to
//! the callers.
//!
//! Webhook forwarding to tenant callback URLs also lives here; it is the one
//! call that never fails the caller, returning a [`ForwardOutcome`] for the
//! audit log instead.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

use wagate_core::db::logs::ForwardOutcome;
use wagate_core::error::{Error, Result};

const CREATE_TIMEOUT: Duration = Duration::from_secs(30);
const QR_TIMEOUT: Duration = Duration::from_secs(15);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const DELETE_TIMEOUT: Duration = Duration::from_secs(10);
const SEND_TEXT_TIMEOUT: Duration = Duration::from_secs(30);
const SEND_MEDIA_TIMEOUT: Duration = Duration::from_secs(60);
const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// The gateway integration identifier sent at instance creation.
const INTEGRATION: &str = "WHATSAPP-BAILEYS";

/// Client for upstream gateway servers and tenant callbacks.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstanceBody<'a> {
    instance_name: &'a str,
    token: &'a str,
    qrcode: bool,
    integration: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_url: Option<&'a str>,
    webhook_by_events: bool,
    webhook_base64: bool,
}

#[derive(Debug, Serialize)]
struct TextMessageBody<'a> {
    number: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaMessageBody<'a> {
    number: &'a str,
    media_url: &'a str,
    caption: &'a str,
    mediatype: &'a str,
}

impl UpstreamClient {
    /// Create a client carrying the shared gateway API key.
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Create an instance on the given server.
    ///
    /// Returns the raw gateway response; the QR credential, when issued
    /// immediately, is at `qrcode.base64`.
    pub async fn create_instance(
        &self,
        server: &str,
        instance_name: &str,
        token: &str,
        webhook_url: Option<&str>,
    ) -> Result<Value> {
        let body = CreateInstanceBody {
            instance_name,
            token,
            qrcode: true,
            integration: INTEGRATION,
            webhook_url,
            webhook_by_events: true,
            webhook_base64: false,
        };

        self.execute(
            self.http
                .post(format!("{server}/instance/create"))
                .timeout(CREATE_TIMEOUT)
                .json(&body),
        )
        .await
    }

    /// Request a fresh pairing QR for an instance. The QR string is at `base64`.
    pub async fn fetch_qr(&self, server: &str, instance_name: &str) -> Result<Value> {
        self.execute(
            self.http
                .get(format!("{server}/instance/connect/{instance_name}"))
                .timeout(QR_TIMEOUT),
        )
        .await
    }

    /// Query the live connection state of an instance. The state string is at `state`.
    pub async fn connection_state(&self, server: &str, instance_name: &str) -> Result<Value> {
        self.execute(
            self.http
                .get(format!("{server}/instance/connectionState/{instance_name}"))
                .timeout(STATUS_TIMEOUT),
        )
        .await
    }

    /// Deprovision an instance on its server.
    pub async fn delete_instance(&self, server: &str, instance_name: &str) -> Result<Value> {
        self.execute(
            self.http
                .delete(format!("{server}/instance/delete/{instance_name}"))
                .timeout(DELETE_TIMEOUT),
        )
        .await
    }

    /// Send a text message through an instance.
    ///
    /// The recipient number must already be normalized.
    pub async fn send_text(
        &self,
        server: &str,
        instance_name: &str,
        number: &str,
        text: &str,
    ) -> Result<Value> {
        let body = TextMessageBody { number, text };

        self.execute(
            self.http
                .post(format!("{server}/message/sendText/{instance_name}"))
                .timeout(SEND_TEXT_TIMEOUT)
                .json(&body),
        )
        .await
    }

    /// Send a media message through an instance.
    ///
    /// Audio uses the gateway's dedicated voice-note endpoint; everything
    /// else goes through the generic media endpoint.
    pub async fn send_media(
        &self,
        server: &str,
        instance_name: &str,
        number: &str,
        media_url: &str,
        caption: &str,
        media_type: &str,
    ) -> Result<Value> {
        let endpoint = if media_type == "audio" {
            "sendWhatsAppAudio"
        } else {
            "sendMedia"
        };
        let body = MediaMessageBody {
            number,
            media_url,
            caption,
            mediatype: media_type,
        };

        self.execute(
            self.http
                .post(format!("{server}/message/{endpoint}/{instance_name}"))
                .timeout(SEND_MEDIA_TIMEOUT)
                .json(&body),
        )
        .await
    }

    /// Forward a raw event body to a tenant callback URL.
    ///
    /// Never fails: every outcome (2xx, non-2xx, transport error, timeout)
    /// is folded into a [`ForwardOutcome`] for the webhook log.
    pub async fn forward_event(&self, url: &str, body: &Value) -> ForwardOutcome {
        let started = Instant::now();
        let result = self
            .http
            .post(url)
            .timeout(FORWARD_TIMEOUT)
            .json(body)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                let response_time_ms = started.elapsed().as_millis() as i32;

                if status.is_success() {
                    ForwardOutcome {
                        status_code: Some(i32::from(status.as_u16())),
                        response_body: Some(text),
                        error_message: None,
                        response_time_ms,
                    }
                } else {
                    ForwardOutcome {
                        status_code: Some(i32::from(status.as_u16())),
                        response_body: None,
                        error_message: Some(format!("callback returned HTTP {}", status.as_u16())),
                        response_time_ms,
                    }
                }
            }
            Err(err) => ForwardOutcome {
                status_code: None,
                response_body: None,
                error_message: Some(err.to_string()),
                response_time_ms: started.elapsed().as_millis() as i32,
            },
        }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Error::Upstream {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(Error::Upstream {
                message: upstream_message(status.as_u16(), &body),
            });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        // Some gateway endpoints answer with non-JSON bodies; keep them as-is.
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

/// Extract the gateway's error message from a failure body, falling back to
/// the status code and a body snippet.
fn upstream_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match json.get("message") {
            Some(Value::String(s)) => return s.clone(),
            Some(other) if !other.is_null() => return other.to_string(),
            _ => {}
        }
    }

    let snippet: String = body.chars().take(200).collect();
    if snippet.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {snippet}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> UpstreamClient {
        UpstreamClient::new("shared-key".to_string())
    }

    #[tokio::test]
    async fn test_create_instance_sends_apikey_and_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/instance/create"))
            .and(header("apikey", "shared-key"))
            .and(body_partial_json(serde_json::json!({
                "instanceName": "wa_abc",
                "token": "tok",
                "qrcode": true,
                "integration": "WHATSAPP-BAILEYS",
                "webhookByEvents": true,
                "webhookBase64": false,
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "qrcode": { "base64": "data:image/png;base64,AAA" }
            })))
            .mount(&mock_server)
            .await;

        let response = client()
            .create_instance(&mock_server.uri(), "wa_abc", "tok", None)
            .await
            .unwrap();

        assert_eq!(
            response.pointer("/qrcode/base64").and_then(Value::as_str),
            Some("data:image/png;base64,AAA")
        );
    }

    #[tokio::test]
    async fn test_non_2xx_extracts_upstream_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/instance/create"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "instance already exists"})),
            )
            .mount(&mock_server)
            .await;

        let err = client()
            .create_instance(&mock_server.uri(), "wa_abc", "tok", None)
            .await
            .unwrap_err();

        match err {
            Error::Upstream { message } => assert_eq!(message, "instance already exists"),
            other => panic!("expected Upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_2xx_without_message_falls_back_to_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/instance/connect/wa_abc"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let err = client()
            .fetch_qr(&mock_server.uri(), "wa_abc")
            .await
            .unwrap_err();

        match err {
            Error::Upstream { message } => assert_eq!(message, "HTTP 500"),
            other => panic!("expected Upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_upstream_error() {
        // Port 1 is never listening.
        let err = client()
            .connection_state("http://127.0.0.1:1", "wa_abc")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_send_text_returns_message_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message/sendText/wa_abc"))
            .and(body_partial_json(serde_json::json!({
                "number": "6281234567890",
                "text": "hello",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "key": { "id": "MSG-1" }
            })))
            .mount(&mock_server)
            .await;

        let response = client()
            .send_text(&mock_server.uri(), "wa_abc", "6281234567890", "hello")
            .await
            .unwrap();

        assert_eq!(
            response.pointer("/key/id").and_then(Value::as_str),
            Some("MSG-1")
        );
    }

    #[tokio::test]
    async fn test_send_media_audio_uses_voice_endpoint() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message/sendWhatsAppAudio/wa_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        client()
            .send_media(
                &mock_server.uri(),
                "wa_abc",
                "6281234567890",
                "https://cdn.example/voice.ogg",
                "",
                "audio",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_forward_event_success_outcome() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let outcome = client()
            .forward_event(
                &format!("{}/hook", mock_server.uri()),
                &serde_json::json!({"event": "connection.update"}),
            )
            .await;

        assert_eq!(outcome.status_code, Some(200));
        assert_eq!(outcome.response_body.as_deref(), Some("ok"));
        assert!(outcome.error_message.is_none());
    }

    #[tokio::test]
    async fn test_forward_event_failure_outcome() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let outcome = client()
            .forward_event(
                &format!("{}/hook", mock_server.uri()),
                &serde_json::json!({"event": "x"}),
            )
            .await;

        assert_eq!(outcome.status_code, Some(503));
        assert!(outcome.response_body.is_none());
        assert!(outcome.error_message.is_some());
    }

    #[tokio::test]
    async fn test_forward_event_unreachable_outcome() {
        let outcome = client()
            .forward_event("http://127.0.0.1:1/hook", &serde_json::json!({}))
            .await;

        assert!(outcome.status_code.is_none());
        assert!(outcome.error_message.is_some());
    }

    #[test]
    fn test_upstream_message_fallbacks() {
        assert_eq!(upstream_message(502, ""), "HTTP 502");
        assert_eq!(upstream_message(500, "boom"), "HTTP 500: boom");
        assert_eq!(
            upstream_message(400, r#"{"message": "bad instance"}"#),
            "bad instance"
        );
        assert_eq!(
            upstream_message(400, r#"{"message": ["a", "b"]}"#),
            r#"["a","b"]"#
        );
    }
}
