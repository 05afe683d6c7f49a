// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook payloads.
//!
//! A delivery nests messages under `entry[].changes[].value.messages[]`.
//! Status callbacks (sent/delivered/read) arrive through the same endpoint
//! and carry no messages; they decode to an empty list.

use cabline_core::InboundMessage;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<WaMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaMessage {
    pub from: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub interactive: Option<Interactive>,
    /// Quick-reply button on a template message.
    #[serde(default)]
    pub button: Option<TemplateButton>,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interactive {
    #[serde(default)]
    pub button_reply: Option<Reply>,
    #[serde(default)]
    pub list_reply: Option<Reply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateButton {
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl WaMessage {
    fn to_inbound(&self) -> Option<InboundMessage> {
        let mut inbound = match self.kind.as_str() {
            "text" => InboundMessage::text(&self.from, self.text.as_ref()?.body.clone()),
            "interactive" => {
                let interactive = self.interactive.as_ref()?;
                let reply = interactive
                    .button_reply
                    .as_ref()
                    .or(interactive.list_reply.as_ref())?;
                InboundMessage::button(&self.from, reply.id.clone(), reply.title.clone())
            }
            "button" => {
                let button = self.button.as_ref()?;
                InboundMessage::button(&self.from, button.payload.clone(), button.text.clone())
            }
            "location" => {
                let location = self.location.as_ref()?;
                let text = location
                    .name
                    .clone()
                    .or_else(|| location.address.clone())
                    .unwrap_or_else(|| format!("{},{}", location.latitude, location.longitude));
                InboundMessage::text(&self.from, text)
            }
            other => {
                debug!(kind = other, "unsupported WhatsApp message type ignored");
                return None;
            }
        };
        inbound.message_id = Some(self.id.clone());
        Some(inbound)
    }
}

/// Customer and driver messages contained in one delivery, in order.
pub fn parse_inbound(payload: &WebhookPayload) -> Vec<InboundMessage> {
    payload
        .entry
        .iter()
        .flat_map(|e| e.changes.iter())
        .flat_map(|c| c.value.messages.iter())
        .filter_map(WaMessage::to_inbound)
        .filter(|m| !m.phone.is_empty())
        .collect()
}

/// Answers the subscription handshake: returns the challenge to echo when
/// `hub.mode` is `subscribe` and the token matches.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected_token: &str,
) -> Option<String> {
    if mode != Some("subscribe") || expected_token.is_empty() || token != Some(expected_token) {
        return None;
    }
    challenge.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(message: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA_ID",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": { "display_phone_number": "15550001111", "phone_number_id": "1234567890" },
                        "contacts": [{ "profile": { "name": "Asha" }, "wa_id": "919000000001" }],
                        "messages": [message],
                    },
                }],
            }],
        }))
        .unwrap()
    }

    #[test]
    fn text_message_decodes() {
        let payload = delivery(serde_json::json!({
            "from": "919000000001", "id": "wamid.1", "timestamp": "1760700000",
            "type": "text", "text": { "body": "hi" },
        }));
        let inbound = parse_inbound(&payload);
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].phone, "919000000001");
        assert_eq!(inbound[0].text, "hi");
        assert_eq!(inbound[0].payload, None);
        assert_eq!(inbound[0].message_id.as_deref(), Some("wamid.1"));
    }

    #[test]
    fn button_reply_carries_payload() {
        let payload = delivery(serde_json::json!({
            "from": "919000000001", "id": "wamid.2", "timestamp": "1760700000",
            "type": "interactive",
            "interactive": { "type": "button_reply", "button_reply": { "id": "pay_cash", "title": "Pay cash" } },
        }));
        let inbound = parse_inbound(&payload);
        assert_eq!(inbound[0].payload.as_deref(), Some("pay_cash"));
        assert_eq!(inbound[0].text, "Pay cash");
    }

    #[test]
    fn location_uses_name_then_coordinates() {
        let payload = delivery(serde_json::json!({
            "from": "919000000001", "id": "wamid.3", "timestamp": "1760700000",
            "type": "location", "location": { "latitude": 12.93, "longitude": 77.62 },
        }));
        assert_eq!(parse_inbound(&payload)[0].text, "12.93,77.62");
    }

    #[test]
    fn status_callbacks_and_unsupported_types_yield_nothing() {
        let status: WebhookPayload = serde_json::from_value(serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{ "id": "WABA_ID", "changes": [{ "field": "messages", "value": {
                "statuses": [{ "id": "wamid.9", "status": "delivered" }]
            }}]}],
        }))
        .unwrap();
        assert!(parse_inbound(&status).is_empty());

        let sticker = delivery(serde_json::json!({
            "from": "919000000001", "id": "wamid.4", "timestamp": "1760700000",
            "type": "sticker", "sticker": { "id": "s1" },
        }));
        assert!(parse_inbound(&sticker).is_empty());
    }

    #[test]
    fn subscription_handshake() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("tok"), Some("123"), "tok").as_deref(),
            Some("123")
        );
        assert_eq!(verify_subscription(Some("subscribe"), Some("bad"), Some("123"), "tok"), None);
        assert_eq!(verify_subscription(Some("unsubscribe"), Some("tok"), Some("123"), "tok"), None);
        assert_eq!(verify_subscription(Some("subscribe"), Some(""), Some("1"), ""), None);
    }
}
