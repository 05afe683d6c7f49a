// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state machine and ride assignment for Cabline.
//!
//! The [`ConversationEngine`] is the central coordinator that:
//! - Serializes turns per phone number
//! - Classifies each message and runs the handler for the session's state
//! - Books rides, claiming a driver immediately when the ride is urgent
//! - Drives the driver trip workflow
//!
//! The [`AssignmentSweep`] runs beside it and assigns pre-booked rides as
//! their start time approaches.

pub mod assignment;
pub mod credentials;
mod driver;
pub mod engine;
mod flow;
pub mod messages;
pub mod payment;
mod registration;
pub mod reply;
pub mod settings;
pub mod shutdown;
pub mod sweep;
pub mod timeparse;

pub use assignment::AssignmentEngine;
pub use engine::{ConversationEngine, Services, TurnReport};
pub use payment::{UpiPaymentLinks, record_online_payment};
pub use reply::Outbound;
pub use settings::{BookingSettings, SweepSettings};
pub use sweep::{AssignmentSweep, SweepReport};
