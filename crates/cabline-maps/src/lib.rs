// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Maps route lookup for Cabline.
//!
//! Both ends of a trip are geocoded with a components filter that biases
//! results to the service city, each result is checked against the
//! accepted locality names, and the route is then requested between the
//! two place ids. Failures carry a message that can be shown to the
//! customer as-is.

pub mod client;
pub mod types;

pub use client::GoogleRouteLookup;
