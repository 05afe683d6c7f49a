// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits for the collaborators the booking core talks to.
//!
//! Adapters extend [`PluginAdapter`] and use `#[async_trait]` so they can be
//! held as `Arc<dyn Trait>`.

pub mod adapter;
pub mod mail;
pub mod notification;
pub mod payment;
pub mod routing;
pub mod storage;

pub use adapter::PluginAdapter;
pub use mail::OtpMailer;
pub use notification::NotificationGateway;
pub use payment::PaymentLinks;
pub use routing::{LocationNormalizer, RouteInfo, RouteLookup};
pub use storage::StorageAdapter;
