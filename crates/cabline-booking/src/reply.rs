// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound chat messages and their delivery through the notification gateway.

use std::time::Duration;

use cabline_core::{Button, CablineError, MessageId, NotificationGateway};
use tracing::{debug, warn};

/// A message queued by a transition, sent after the session is persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text {
        to: String,
        body: String,
    },
    Buttons {
        to: String,
        body: String,
        buttons: Vec<Button>,
    },
    Template {
        to: String,
        name: String,
        params: Vec<String>,
    },
    Image {
        to: String,
        media: String,
        caption: Option<String>,
    },
}

impl Outbound {
    pub fn text(to: &str, body: impl Into<String>) -> Self {
        Outbound::Text {
            to: to.to_string(),
            body: body.into(),
        }
    }

    pub fn buttons(to: &str, body: impl Into<String>, buttons: Vec<Button>) -> Self {
        Outbound::Buttons {
            to: to.to_string(),
            body: body.into(),
            buttons,
        }
    }

    pub fn to(&self) -> &str {
        match self {
            Outbound::Text { to, .. }
            | Outbound::Buttons { to, .. }
            | Outbound::Template { to, .. }
            | Outbound::Image { to, .. } => to,
        }
    }

    /// Visible text of the message; template name for templates.
    pub fn body(&self) -> &str {
        match self {
            Outbound::Text { body, .. } | Outbound::Buttons { body, .. } => body,
            Outbound::Template { name, .. } => name,
            Outbound::Image { caption, media, .. } => caption.as_deref().unwrap_or(media),
        }
    }
}

/// Sends one message, bounded by `timeout`.
pub async fn deliver(
    notifier: &dyn NotificationGateway,
    message: &Outbound,
    timeout: Duration,
) -> Result<MessageId, CablineError> {
    let send = async {
        match message {
            Outbound::Text { to, body } => notifier.send_text(to, body).await,
            Outbound::Buttons { to, body, buttons } => {
                notifier.send_buttons(to, body, buttons).await
            }
            Outbound::Template { to, name, params } => {
                notifier.send_template(to, name, params).await
            }
            Outbound::Image { to, media, caption } => {
                notifier.send_image(to, media, caption.as_deref()).await
            }
        }
    };
    tokio::time::timeout(timeout, send)
        .await
        .map_err(|_| CablineError::Timeout { duration: timeout })?
}

/// Sends every message in order. Failures are logged and skipped; a failed
/// send never undoes the transition that produced it.
///
/// Returns the number of messages accepted by the gateway.
pub async fn deliver_all(
    notifier: &dyn NotificationGateway,
    messages: &[Outbound],
    timeout: Duration,
) -> usize {
    let mut sent = 0;
    for message in messages {
        match deliver(notifier, message, timeout).await {
            Ok(id) => {
                sent += 1;
                debug!(to = message.to(), message_id = %id.0, "message sent");
            }
            Err(e) => {
                warn!(to = message.to(), error = %e, "message delivery failed");
            }
        }
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_cover_every_variant() {
        let text = Outbound::text("9190", "hello");
        assert_eq!((text.to(), text.body()), ("9190", "hello"));

        let image = Outbound::Image {
            to: "9191".into(),
            media: "https://example.com/qr.png".into(),
            caption: None,
        };
        assert_eq!(image.body(), "https://example.com/qr.png");

        let template = Outbound::Template {
            to: "9192".into(),
            name: "ride_reminder".into(),
            params: vec![],
        };
        assert_eq!(template.body(), "ride_reminder");
    }
}
