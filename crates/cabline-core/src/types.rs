// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier returned by the messaging provider for a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of external collaborator an adapter implements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Notification,
    Storage,
    Routing,
    Payment,
    Mail,
}

/// A reply button shown under an interactive message.
///
/// WhatsApp renders at most three buttons per message and truncates titles
/// longer than 20 characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub title: String,
}

impl Button {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One message received from a customer or driver, after channel decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Digits-only sender phone.
    pub phone: String,
    /// Message text; empty for pure button replies.
    pub text: String,
    /// Id of the tapped reply button, if any.
    pub payload: Option<String>,
    /// Provider message id, used for de-duplication in logs.
    pub message_id: Option<String>,
}

impl InboundMessage {
    pub fn text(phone: &str, text: impl Into<String>) -> Self {
        Self {
            phone: normalize_phone(phone),
            text: text.into(),
            payload: None,
            message_id: None,
        }
    }

    pub fn button(phone: &str, payload: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            phone: normalize_phone(phone),
            text: title.into(),
            payload: Some(payload.into()),
            message_id: None,
        }
    }
}

/// Normalizes a phone number to the digits-only form WhatsApp uses as `wa_id`.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_phone_strips_formatting() {
        assert_eq!(normalize_phone("+91 95509-54674"), "919550954674");
        assert_eq!(normalize_phone("919550954674"), "919550954674");
    }

    #[test]
    fn inbound_constructors_normalize_phone() {
        let m = InboundMessage::button("+91 90000 00001", "pay_cash", "Pay Cash");
        assert_eq!(m.phone, "919000000001");
        assert_eq!(m.payload.as_deref(), Some("pay_cash"));
        assert_eq!(InboundMessage::text("91-900", "hi").payload, None);
    }

    #[test]
    fn button_new_accepts_str_and_string() {
        let b = Button::new("pay_cash", String::from("Pay Cash"));
        assert_eq!(b.id, "pay_cash");
        assert_eq!(b.title, "Pay Cash");
    }
}
