// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of Cabline.
//!
//! Receives WhatsApp webhook deliveries and feeds them to the
//! [`ConversationEngine`](cabline_booking::ConversationEngine), accepts
//! payment callbacks, customer and owner logins, and serves the
//! bearer-protected admin API.

pub mod account;
pub mod admin;
pub mod auth;
pub mod error;
pub mod server;
pub mod webhooks;

pub use auth::AuthConfig;
pub use error::{ApiError, ApiResult};
pub use server::{GatewayState, WebhookSecrets, router, start_server};
