// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Geocoding and Directions API response shapes (only the fields we read).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl GeocodeResult {
    /// True when a locality or district component names one of `accepted`.
    pub fn within(&self, accepted: &[String]) -> bool {
        self.address_components.iter().any(|c| {
            c.types
                .iter()
                .any(|t| t == "locality" || t == "administrative_area_level_2")
                && accepted.iter().any(|a| a.eq_ignore_ascii_case(&c.long_name))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsRoute {
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Leg {
    pub distance: Measure,
    pub duration: Measure,
}

/// `value` is metres for distance and seconds for duration.
#[derive(Debug, Clone, Deserialize)]
pub struct Measure {
    pub value: f64,
    #[serde(default)]
    pub text: String,
}
