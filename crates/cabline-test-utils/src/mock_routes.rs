// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock route lookup with canned answers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use cabline_core::types::{AdapterType, HealthStatus};
use cabline_core::{CablineError, PluginAdapter, RouteInfo, RouteLookup};

#[derive(Debug, Clone)]
enum Canned {
    Route(RouteInfo),
    Fail(String),
}

/// Returns a fixed route for every pair unless a specific pair was
/// configured. Pairs are matched on the normalized names the engine passes.
pub struct MockRouteLookup {
    default: Mutex<Canned>,
    pairs: Mutex<HashMap<(String, String), Canned>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockRouteLookup {
    /// Every lookup answers `distance_km` / `duration_minutes`.
    pub fn new(distance_km: f64, duration_minutes: i64) -> Self {
        Self {
            default: Mutex::new(Canned::Route(RouteInfo {
                distance_km,
                duration_minutes,
            })),
            pairs: Mutex::new(HashMap::new()),
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_route(&self, pickup: &str, destination: &str, route: RouteInfo) {
        self.pairs.lock().unwrap().insert(
            (pickup.to_string(), destination.to_string()),
            Canned::Route(route),
        );
    }

    /// Every lookup fails with a customer-facing route error.
    pub fn fail_with(&self, message: &str) {
        *self.default.lock().unwrap() = Canned::Fail(message.to_string());
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockRouteLookup {
    fn default() -> Self {
        Self::new(10.0, 25)
    }
}

#[async_trait]
impl PluginAdapter for MockRouteLookup {
    fn name(&self) -> &str {
        "mock-routes"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Routing
    }

    async fn health_check(&self) -> Result<HealthStatus, CablineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CablineError> {
        Ok(())
    }
}

#[async_trait]
impl RouteLookup for MockRouteLookup {
    async fn get_route(
        &self,
        pickup: &str,
        destination: &str,
    ) -> Result<RouteInfo, CablineError> {
        let key = (pickup.to_string(), destination.to_string());
        self.calls.lock().unwrap().push(key.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let canned = self
            .pairs
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.default.lock().unwrap().clone());
        match canned {
            Canned::Route(route) => Ok(route),
            Canned::Fail(message) => Err(CablineError::route(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_and_specific_routes() {
        let routes = MockRouteLookup::new(10.0, 25);
        routes.set_route(
            "koramangala",
            "whitefield",
            RouteInfo {
                distance_km: 18.5,
                duration_minutes: 55,
            },
        );
        let r = routes.get_route("koramangala", "whitefield").await.unwrap();
        assert_eq!(r.duration_minutes, 55);
        let r = routes.get_route("hebbal", "jayanagar").await.unwrap();
        assert_eq!(r.distance_km, 10.0);
        assert_eq!(routes.calls().len(), 2);
    }

    #[tokio::test]
    async fn failure_carries_message() {
        let routes = MockRouteLookup::default();
        routes.fail_with("A route could not be found between the specified locations.");
        let err = routes.get_route("a", "b").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "A route could not be found between the specified locations."
        );
    }
}
