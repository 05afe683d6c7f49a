// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cabline integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockNotifier`] - Captures every outbound WhatsApp message
//! - [`MockRouteLookup`] - Canned routes, errors and delays
//! - [`MockMailer`] - Captures OTP mails
//! - [`FixedClock`] - Pinned, manually advanced time
//! - [`TestHarness`] - Temp SQLite plus a fully wired conversation engine

pub mod clock;
pub mod harness;
pub mod mock_mailer;
pub mod mock_notifier;
pub mod mock_routes;

pub use clock::FixedClock;
pub use harness::{TEST_PASSWORD, TestHarness, TestHarnessBuilder};
pub use mock_mailer::MockMailer;
pub use mock_notifier::{MockNotifier, SentMessage};
pub use mock_routes::MockRouteLookup;
