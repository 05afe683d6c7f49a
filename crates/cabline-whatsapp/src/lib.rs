// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API adapter for Cabline.
//!
//! - [`WhatsAppClient`] sends text, reply-button, template and image
//!   messages through the Graph API and implements `NotificationGateway`.
//! - [`webhook`] decodes inbound webhook deliveries into `InboundMessage`s.
//! - [`signature`] checks `X-Hub-Signature-256`.
//! - [`LogNotifier`] stands in when no access token is configured.

pub mod client;
pub mod log_notifier;
pub mod signature;
pub mod webhook;

pub use client::WhatsAppClient;
pub use log_notifier::LogNotifier;
pub use signature::{sign_body, verify_signature};
pub use webhook::{WebhookPayload, parse_inbound, verify_subscription};
