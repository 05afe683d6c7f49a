// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WhatsApp Cloud API (Graph `/{phone_number_id}/messages`).
//!
//! Handles request construction, bearer authentication and a single retry
//! on transient errors.

use std::time::Duration;

use async_trait::async_trait;
use cabline_config::model::WhatsAppConfig;
use cabline_core::types::{AdapterType, Button, HealthStatus, MessageId};
use cabline_core::{CablineError, NotificationGateway, PluginAdapter};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// WhatsApp renders at most three reply buttons.
const MAX_BUTTONS: usize = 3;
/// Longer button titles are rejected by the API.
const MAX_BUTTON_TITLE: usize = 20;
/// Interactive message bodies are capped at 1024 characters.
const MAX_INTERACTIVE_BODY: usize = 1024;

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentId>,
}

#[derive(Debug, Deserialize)]
struct SentId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphErrorResponse {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// Sends messages as the configured business phone number.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: reqwest::Client,
    messages_url: String,
    max_retries: u32,
}

impl WhatsAppClient {
    /// Builds a client from config. Fails when the access token or phone
    /// number id is missing.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, CablineError> {
        let token = config.access_token.as_deref().ok_or_else(|| {
            CablineError::Config("whatsapp.access_token is required to send messages".into())
        })?;
        let phone_number_id = config.phone_number_id.as_deref().ok_or_else(|| {
            CablineError::Config("whatsapp.phone_number_id is required to send messages".into())
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                CablineError::Config(format!("invalid WhatsApp access token header value: {e}"))
            })?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CablineError::Notification {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            messages_url: format!(
                "{}/{}/{}/messages",
                config.api_base_url.trim_end_matches('/'),
                config.api_version,
                phone_number_id
            ),
            max_retries: 1,
        })
    }

    /// Posts one message object and returns the provider message id.
    async fn post(&self, to: &str, mut message: Value) -> Result<MessageId, CablineError> {
        message["messaging_product"] = json!("whatsapp");
        message["recipient_type"] = json!("individual");
        message["to"] = json!(to);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying WhatsApp send after transient error");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }

            let response = self
                .client
                .post(&self.messages_url)
                .json(&message)
                .send()
                .await
                .map_err(|e| CablineError::Notification {
                    message: format!("WhatsApp request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, to, "WhatsApp response received");
            let body = response.text().await.unwrap_or_default();

            if status.is_success() {
                let parsed: SendResponse =
                    serde_json::from_str(&body).map_err(|e| CablineError::Notification {
                        message: format!("failed to parse WhatsApp response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return parsed
                    .messages
                    .into_iter()
                    .next()
                    .map(|m| MessageId(m.id))
                    .ok_or_else(|| CablineError::Notification {
                        message: "WhatsApp response carried no message id".into(),
                        source: None,
                    });
            }

            let error = graph_error(status, &body);
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, "transient WhatsApp error, will retry");
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| CablineError::Notification {
            message: "WhatsApp send failed after retries".into(),
            source: None,
        }))
    }
}

fn graph_error(status: reqwest::StatusCode, body: &str) -> CablineError {
    let message = match serde_json::from_str::<GraphErrorResponse>(body) {
        Ok(err) => match err.error.code {
            Some(code) => format!("WhatsApp API error ({code}): {}", err.error.message),
            None => format!("WhatsApp API error: {}", err.error.message),
        },
        Err(_) => format!("WhatsApp API returned {status}: {body}"),
    };
    CablineError::Notification {
        message,
        source: None,
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn text_message(body: &str) -> Value {
    json!({
        "type": "text",
        "text": { "preview_url": false, "body": body },
    })
}

fn button_message(body: &str, buttons: &[Button]) -> Value {
    let buttons: Vec<Value> = buttons
        .iter()
        .take(MAX_BUTTONS)
        .map(|b| {
            json!({
                "type": "reply",
                "reply": { "id": b.id, "title": truncate_chars(&b.title, MAX_BUTTON_TITLE) },
            })
        })
        .collect();
    json!({
        "type": "interactive",
        "interactive": {
            "type": "button",
            "body": { "text": truncate_chars(body, MAX_INTERACTIVE_BODY) },
            "action": { "buttons": buttons },
        },
    })
}

fn template_message(name: &str, params: &[String]) -> Value {
    let mut template = json!({
        "name": name,
        "language": { "code": "en" },
    });
    if !params.is_empty() {
        let parameters: Vec<Value> = params
            .iter()
            .map(|p| json!({ "type": "text", "text": p }))
            .collect();
        template["components"] = json!([{ "type": "body", "parameters": parameters }]);
    }
    json!({ "type": "template", "template": template })
}

fn image_message(media_ref: &str, caption: Option<&str>) -> Value {
    let mut image = if media_ref.starts_with("http://") || media_ref.starts_with("https://") {
        json!({ "link": media_ref })
    } else {
        json!({ "id": media_ref })
    };
    if let Some(caption) = caption {
        image["caption"] = json!(caption);
    }
    json!({ "type": "image", "image": image })
}

#[async_trait]
impl PluginAdapter for WhatsAppClient {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, CablineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CablineError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for WhatsAppClient {
    async fn send_text(&self, phone: &str, body: &str) -> Result<MessageId, CablineError> {
        self.post(phone, text_message(body)).await
    }

    async fn send_buttons(
        &self,
        phone: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<MessageId, CablineError> {
        if buttons.is_empty() {
            return self.send_text(phone, body).await;
        }
        self.post(phone, button_message(body, buttons)).await
    }

    async fn send_template(
        &self,
        phone: &str,
        template_name: &str,
        params: &[String],
    ) -> Result<MessageId, CablineError> {
        self.post(phone, template_message(template_name, params)).await
    }

    async fn send_image(
        &self,
        phone: &str,
        media_ref: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, CablineError> {
        self.post(phone, image_message(media_ref, caption)).await
    }
}
