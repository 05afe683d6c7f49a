// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fuzzy correction of typed place names against a known-location list.

use cabline_config::model::BookingConfig;
use cabline_core::LocationNormalizer;
use strsim::jaro_winkler;

/// Canonical place names with a similarity cutoff.
#[derive(Debug, Clone)]
pub struct KnownLocations {
    names: Vec<String>,
    threshold: f64,
}

impl KnownLocations {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>, threshold: f64) -> Self {
        Self {
            names: names
                .into_iter()
                .map(|n| n.into().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
            threshold,
        }
    }

    pub fn from_config(config: &BookingConfig) -> Self {
        Self::new(
            config.known_locations.iter().cloned(),
            config.location_match_threshold,
        )
    }

    /// Best matching known name and its score, if any clears the threshold.
    pub fn best_match(&self, text: &str) -> Option<(&str, f64)> {
        let needle = normalize(text);
        if needle.is_empty() {
            return None;
        }
        self.names
            .iter()
            .map(|name| (name.as_str(), jaro_winkler(&needle, name)))
            .filter(|(_, score)| *score >= self.threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl LocationNormalizer for KnownLocations {
    fn correct_location(&self, text: &str) -> String {
        match self.best_match(text) {
            Some((name, _)) => name.to_string(),
            None => normalize(text),
        }
    }
}

/// Lowercase and collapse runs of whitespace.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bangalore() -> KnownLocations {
        KnownLocations::from_config(&BookingConfig::default())
    }

    #[test]
    fn misspelled_names_are_corrected() {
        let locs = bangalore();
        assert_eq!(locs.correct_location("Koramangla"), "koramangala");
        assert_eq!(locs.correct_location("indira nagar"), "indiranagar");
        assert_eq!(locs.correct_location("  WHITEFIELD "), "whitefield");
    }

    #[test]
    fn unknown_place_falls_back_to_lowercased_input() {
        let locs = bangalore();
        assert_eq!(
            locs.correct_location("Prestige  Tech Park"),
            "prestige tech park"
        );
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(bangalore().correct_location("   "), "");
        assert!(bangalore().best_match("").is_none());
    }

    #[test]
    fn threshold_is_respected() {
        let strict = KnownLocations::new(["hebbal"], 0.99);
        assert_eq!(strict.correct_location("hebal"), "hebal");
        let loose = KnownLocations::new(["hebbal"], 0.8);
        assert_eq!(loose.correct_location("hebal"), "hebbal");
    }
}
