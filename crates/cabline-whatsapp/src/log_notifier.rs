// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier used when WhatsApp credentials are not configured. Every send
//! is logged and reported as delivered.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use cabline_core::types::{AdapterType, Button, HealthStatus, MessageId};
use cabline_core::{CablineError, NotificationGateway, PluginAdapter};
use tracing::info;

#[derive(Debug, Default)]
pub struct LogNotifier {
    counter: AtomicU64,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> MessageId {
        MessageId(format!("log-{}", self.counter.fetch_add(1, Ordering::Relaxed)))
    }
}

#[async_trait]
impl PluginAdapter for LogNotifier {
    fn name(&self) -> &str {
        "log-notifier"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, CablineError> {
        Ok(HealthStatus::Degraded(
            "whatsapp.access_token not set, messages are only logged".into(),
        ))
    }

    async fn shutdown(&self) -> Result<(), CablineError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for LogNotifier {
    async fn send_text(&self, phone: &str, body: &str) -> Result<MessageId, CablineError> {
        info!(to = phone, body, "outbound text (not sent)");
        Ok(self.next_id())
    }

    async fn send_buttons(
        &self,
        phone: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<MessageId, CablineError> {
        let ids: Vec<&str> = buttons.iter().map(|b| b.id.as_str()).collect();
        info!(to = phone, body, buttons = ?ids, "outbound buttons (not sent)");
        Ok(self.next_id())
    }

    async fn send_template(
        &self,
        phone: &str,
        template_name: &str,
        params: &[String],
    ) -> Result<MessageId, CablineError> {
        info!(to = phone, template = template_name, ?params, "outbound template (not sent)");
        Ok(self.next_id())
    }

    async fn send_image(
        &self,
        phone: &str,
        media_ref: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, CablineError> {
        info!(to = phone, media_ref, caption, "outbound image (not sent)");
        Ok(self.next_id())
    }
}
