// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound messaging to a phone number.

use async_trait::async_trait;

use crate::error::CablineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Button, MessageId};

/// Sends chat messages to customers, drivers and admins.
///
/// Callers treat every send as fire-and-forget: failures are logged and do
/// not abort the conversation turn.
#[async_trait]
pub trait NotificationGateway: PluginAdapter {
    async fn send_text(&self, phone: &str, body: &str) -> Result<MessageId, CablineError>;

    /// Text with up to three reply buttons.
    async fn send_buttons(
        &self,
        phone: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<MessageId, CablineError>;

    /// Pre-approved template message with positional body parameters.
    async fn send_template(
        &self,
        phone: &str,
        template_name: &str,
        params: &[String],
    ) -> Result<MessageId, CablineError>;

    /// Image by public link or uploaded media id.
    async fn send_image(
        &self,
        phone: &str,
        media_ref: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, CablineError>;
}
