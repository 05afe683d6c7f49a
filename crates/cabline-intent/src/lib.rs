// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent classification and location correction for the Cabline chatbot.
//!
//! This crate provides:
//! - [`IntentClassifier`]: maps text, button payload and conversation state to an [`Intent`]
//! - [`KnownLocations`]: fuzzy correction of typed place names
//!
//! Both are pure and synchronous; no network or storage access.

pub mod classifier;
pub mod locations;

pub use classifier::{DateOption, DriverStep, Intent, IntentClassifier, PaymentMode, classify};
pub use locations::KnownLocations;
