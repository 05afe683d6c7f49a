// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route lookup and location normalization.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CablineError;
use crate::traits::adapter::PluginAdapter;

/// Driving distance and time between two places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub distance_km: f64,
    pub duration_minutes: i64,
}

/// Resolves two free-text places to a driving route.
///
/// Out-of-area and no-path failures come back as [`CablineError::Route`]
/// whose message is shown to the customer as-is.
#[async_trait]
pub trait RouteLookup: PluginAdapter {
    async fn get_route(&self, pickup: &str, destination: &str)
    -> Result<RouteInfo, CablineError>;
}

/// Best-effort mapping of typed place names to canonical spellings.
pub trait LocationNormalizer: Send + Sync + 'static {
    /// Never fails; returns the lowercased input when nothing matches.
    fn correct_location(&self, text: &str) -> String;
}
