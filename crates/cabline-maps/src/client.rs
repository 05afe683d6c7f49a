// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Geocoding and Directions APIs.

use std::time::Duration;

use async_trait::async_trait;
use cabline_config::model::MapsConfig;
use cabline_core::types::{AdapterType, HealthStatus};
use cabline_core::{CablineError, PluginAdapter, RouteInfo, RouteLookup};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{DirectionsResponse, GeocodeResponse, GeocodeResult};

pub const NO_ROUTE: &str = "A route could not be found between the specified locations.";

#[derive(Debug, Clone, Copy)]
enum End {
    Pickup,
    DropOff,
}

impl End {
    fn label(self) -> &'static str {
        match self {
            End::Pickup => "pickup",
            End::DropOff => "drop-off",
        }
    }
}

/// `RouteLookup` backed by Google Maps.
#[derive(Debug, Clone)]
pub struct GoogleRouteLookup {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    components: String,
    localities: Vec<String>,
}

impl GoogleRouteLookup {
    pub fn new(config: &MapsConfig) -> Result<Self, CablineError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CablineError::Config("maps.api_key is required".into()))?;
        if config.service_localities.is_empty() {
            return Err(CablineError::Config(
                "maps.service_localities must name at least one locality".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CablineError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            components: config.components.clone(),
            localities: config.service_localities.clone(),
        })
    }

    /// Name used in "outside our service area (...)" replies.
    fn area_name(&self) -> &str {
        self.localities.first().map(String::as_str).unwrap_or("our city")
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, CablineError> {
        let url = Url::parse_with_params(
            &format!("{}/maps/api/{endpoint}/json", self.base_url),
            params.iter().copied().chain([("key", self.api_key.as_str())]),
        )
        .map_err(|e| CablineError::Config(format!("invalid maps.base_url: {e}")))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(endpoint, error = %e, "maps request failed");
            CablineError::route(NO_ROUTE)
        })?;
        let status = response.status();
        debug!(endpoint, status = %status, "maps response received");
        if !status.is_success() {
            warn!(endpoint, status = %status, "maps API returned an error status");
            return Err(CablineError::route(NO_ROUTE));
        }
        response.json::<T>().await.map_err(|e| {
            warn!(endpoint, error = %e, "maps response did not parse");
            CablineError::route(NO_ROUTE)
        })
    }

    /// Geocodes one end of the trip and checks it lies inside the service area.
    async fn place_id(&self, address: &str, end: End) -> Result<String, CablineError> {
        let outside = || {
            CablineError::route(format!(
                "Sorry, the {} location '{address}' is outside our service area ({}).",
                end.label(),
                self.area_name()
            ))
        };
        let geocode: GeocodeResponse = self
            .get_json(
                "geocode",
                &[("address", address), ("components", self.components.as_str())],
            )
            .await?;
        let Some(first) = geocode.results.first() else {
            debug!(address, status = %geocode.status, "no geocode result");
            return Err(outside());
        };
        if !first.within(&self.localities) || first.place_id.is_empty() {
            return Err(outside());
        }
        Ok(first.place_id.clone())
    }

    /// Best-effort street address for a coordinate.
    pub async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> String {
        let latlng = format!("{latitude},{longitude}");
        match self
            .get_json::<GeocodeResponse>("geocode", &[("latlng", latlng.as_str())])
            .await
        {
            Ok(response) if response.status == "OK" => response
                .results
                .first()
                .map(|r: &GeocodeResult| r.formatted_address.clone())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "Unknown Address".to_string()),
            _ => "Unknown Address".to_string(),
        }
    }
}

#[async_trait]
impl PluginAdapter for GoogleRouteLookup {
    fn name(&self) -> &str {
        "google-maps"
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
impl RouteLookup for GoogleRouteLookup {
    async fn get_route(
        &self,
        pickup: &str,
        destination: &str,
    ) -> Result<RouteInfo, CablineError> {
        let origin = self.place_id(pickup, End::Pickup).await?;
        let target = self.place_id(destination, End::DropOff).await?;

        let origin = format!("place_id:{origin}");
        let target = format!("place_id:{target}");
        let directions: DirectionsResponse = self
            .get_json(
                "directions",
                &[("origin", origin.as_str()), ("destination", target.as_str())],
            )
            .await?;
        if directions.status != "OK" {
            warn!(status = %directions.status, "directions lookup failed");
            return Err(CablineError::route(NO_ROUTE));
        }
        let Some(leg) = directions.routes.first().and_then(|r| r.legs.first()) else {
            return Err(CablineError::route(NO_ROUTE));
        };

        let distance_km = (leg.distance.value / 100.0).round() / 10.0;
        let duration_minutes = ((leg.duration.value / 60.0).round() as i64).max(1);
        debug!(
            distance = %leg.distance.text,
            duration = %leg.duration.text,
            "route resolved"
        );
        Ok(RouteInfo {
            distance_km,
            duration_minutes,
        })
    }
}
