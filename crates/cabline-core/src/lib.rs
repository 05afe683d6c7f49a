// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cabline booking service.
//!
//! Holds the domain model, the error type, fare arithmetic and the adapter
//! traits every backend (SQLite, WhatsApp, Google Maps, SMTP) implements.

pub mod billing;
pub mod clock;
pub mod error;
pub mod model;
pub mod traits;
pub mod types;

pub use billing::{Invoice, compute_fare, format_inr};
pub use clock::{Clock, SystemClock};
pub use error::CablineError;
pub use types::{AdapterType, Button, HealthStatus, InboundMessage, MessageId, normalize_phone};

pub use traits::{
    LocationNormalizer, NotificationGateway, OtpMailer, PaymentLinks, PluginAdapter, RouteInfo,
    RouteLookup, StorageAdapter,
};
