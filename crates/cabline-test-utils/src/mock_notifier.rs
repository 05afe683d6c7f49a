// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notification gateway for deterministic testing.
//!
//! `MockNotifier` implements `NotificationGateway` and captures every
//! outbound message for assertion in tests. Sends to phones registered with
//! [`MockNotifier::fail_for`] return an error instead.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use cabline_core::types::{AdapterType, Button, HealthStatus, MessageId};
use cabline_core::{CablineError, NotificationGateway, PluginAdapter};

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum SentMessage {
    Text {
        phone: String,
        body: String,
    },
    Buttons {
        phone: String,
        body: String,
        buttons: Vec<Button>,
    },
    Template {
        phone: String,
        name: String,
        params: Vec<String>,
    },
    Image {
        phone: String,
        media_ref: String,
        caption: Option<String>,
    },
}

impl SentMessage {
    pub fn phone(&self) -> &str {
        match self {
            Self::Text { phone, .. }
            | Self::Buttons { phone, .. }
            | Self::Template { phone, .. }
            | Self::Image { phone, .. } => phone,
        }
    }

    /// Visible text of the message.
    pub fn body(&self) -> String {
        match self {
            Self::Text { body, .. } | Self::Buttons { body, .. } => body.clone(),
            Self::Template { name, params, .. } => format!("{name}: {}", params.join(", ")),
            Self::Image { caption, .. } => caption.clone().unwrap_or_default(),
        }
    }

    /// Button ids, empty for non-interactive messages.
    pub fn button_ids(&self) -> Vec<String> {
        match self {
            Self::Buttons { buttons, .. } => buttons.iter().map(|b| b.id.clone()).collect(),
            _ => Vec::new(),
        }
    }
}

/// A mock WhatsApp sender for testing.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<String>>,
    counter: AtomicU64,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `phone` fail.
    pub async fn fail_for(&self, phone: &str) {
        self.failing.lock().await.insert(phone.to_string());
    }

    /// Get all messages that were sent.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Messages sent to one phone, oldest first.
    pub async fn sent_to(&self, phone: &str) -> Vec<SentMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.phone() == phone)
            .cloned()
            .collect()
    }

    /// Most recent message sent to `phone`.
    pub async fn last_to(&self, phone: &str) -> Option<SentMessage> {
        self.sent_to(phone).await.pop()
    }

    /// True when any message to `phone` contains `needle`.
    pub async fn any_to_contains(&self, phone: &str, needle: &str) -> bool {
        self.sent_to(phone)
            .await
            .iter()
            .any(|m| m.body().contains(needle))
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    async fn record(&self, message: SentMessage) -> Result<MessageId, CablineError> {
        if self.failing.lock().await.contains(message.phone()) {
            return Err(CablineError::Notification {
                message: format!("mock send to {} failed", message.phone()),
                source: None,
            });
        }
        self.sent.lock().await.push(message);
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(MessageId(format!("wamid.mock-{n}")))
    }
}

#[async_trait]
impl PluginAdapter for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
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
impl NotificationGateway for MockNotifier {
    async fn send_text(&self, phone: &str, body: &str) -> Result<MessageId, CablineError> {
        self.record(SentMessage::Text {
            phone: phone.to_string(),
            body: body.to_string(),
        })
        .await
    }

    async fn send_buttons(
        &self,
        phone: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<MessageId, CablineError> {
        self.record(SentMessage::Buttons {
            phone: phone.to_string(),
            body: body.to_string(),
            buttons: buttons.to_vec(),
        })
        .await
    }

    async fn send_template(
        &self,
        phone: &str,
        template_name: &str,
        params: &[String],
    ) -> Result<MessageId, CablineError> {
        self.record(SentMessage::Template {
            phone: phone.to_string(),
            name: template_name.to_string(),
            params: params.to_vec(),
        })
        .await
    }

    async fn send_image(
        &self,
        phone: &str,
        media_ref: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, CablineError> {
        self.record(SentMessage::Image {
            phone: phone.to_string(),
            media_ref: media_ref.to_string(),
            caption: caption.map(str::to_string),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_messages_per_phone() {
        let notifier = MockNotifier::new();
        notifier.send_text("911", "hello").await.unwrap();
        notifier
            .send_buttons("912", "pick", &[Button::new("book_ride", "Book")])
            .await
            .unwrap();

        assert_eq!(notifier.sent_count().await, 2);
        assert_eq!(notifier.sent_to("911").await.len(), 1);
        let last = notifier.last_to("912").await.unwrap();
        assert_eq!(last.button_ids(), vec!["book_ride".to_string()]);
        assert!(notifier.any_to_contains("911", "hell").await);
    }

    #[tokio::test]
    async fn failing_phone_is_not_recorded() {
        let notifier = MockNotifier::new();
        notifier.fail_for("911").await;
        assert!(notifier.send_text("911", "x").await.is_err());
        assert_eq!(notifier.sent_count().await, 0);
    }

    #[tokio::test]
    async fn message_ids_are_unique() {
        let notifier = MockNotifier::new();
        let a = notifier.send_text("911", "a").await.unwrap();
        let b = notifier.send_text("911", "b").await.unwrap();
        assert_ne!(a, b);
    }
}
