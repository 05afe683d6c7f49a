// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime knobs for the conversation and assignment engines, resolved once
//! from [`CablineConfig`].

use std::time::Duration;

use cabline_config::model::CablineConfig;
use cabline_core::CablineError;
use chrono::{FixedOffset, TimeDelta};

#[derive(Debug, Clone)]
pub struct BookingSettings {
    /// Display name used in greetings.
    pub service_name: String,
    /// Local timezone of the service area.
    pub utc_offset: FixedOffset,
    /// Rides starting sooner than this are assigned on confirmation.
    pub immediate_window: TimeDelta,
    pub tax_rate_percent: f64,
    pub otp_ttl: TimeDelta,
    /// Wrong codes tolerated before a new one is issued.
    pub otp_max_attempts: u32,
    /// Upper bound on every route lookup, mail and message send.
    pub external_timeout: Duration,
    /// Phones alerted when an urgent ride needs a manual assignment.
    pub admin_phones: Vec<String>,
    pub my_rides_limit: u32,
}

impl BookingSettings {
    pub fn from_config(config: &CablineConfig) -> Result<Self, CablineError> {
        let utc_offset = FixedOffset::east_opt(config.service.utc_offset_minutes * 60)
            .ok_or_else(|| {
                CablineError::Config(format!(
                    "service.utc_offset_minutes out of range: {}",
                    config.service.utc_offset_minutes
                ))
            })?;
        Ok(Self {
            service_name: config.service.name.clone(),
            utc_offset,
            immediate_window: TimeDelta::minutes(config.booking.immediate_window_minutes),
            tax_rate_percent: config.booking.tax_rate_percent,
            otp_ttl: TimeDelta::seconds(config.booking.otp_ttl_secs as i64),
            otp_max_attempts: config.booking.otp_max_attempts,
            external_timeout: Duration::from_secs(config.booking.external_timeout_secs),
            admin_phones: config
                .booking
                .admin_phones
                .iter()
                .map(|p| cabline_core::normalize_phone(p))
                .filter(|p| !p.is_empty())
                .collect(),
            my_rides_limit: config.booking.my_rides_limit,
        })
    }
}

/// Timing of the background assignment sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    pub interval: Duration,
    pub lookahead: TimeDelta,
}

impl SweepSettings {
    pub fn from_config(config: &CablineConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.assignment.sweep_interval_secs),
            lookahead: TimeDelta::minutes(config.assignment.lookahead_minutes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_to_india_standard_time() {
        let settings = BookingSettings::from_config(&CablineConfig::default()).unwrap();
        assert_eq!(settings.utc_offset.local_minus_utc(), 330 * 60);
        assert_eq!(settings.immediate_window, TimeDelta::minutes(120));
        assert_eq!(settings.tax_rate_percent, 5.0);
        assert_eq!(settings.otp_max_attempts, 3);
    }

    #[test]
    fn admin_phones_are_normalized() {
        let mut config = CablineConfig::default();
        config.booking.admin_phones = vec!["+91 90000 00009".into(), "  ".into()];
        let settings = BookingSettings::from_config(&config).unwrap();
        assert_eq!(settings.admin_phones, vec!["919000000009"]);
    }

    #[test]
    fn out_of_range_offset_is_a_config_error() {
        let mut config = CablineConfig::default();
        config.service.utc_offset_minutes = 24 * 60;
        assert!(matches!(
            BookingSettings::from_config(&config),
            Err(CablineError::Config(_))
        ));
    }

    #[test]
    fn sweep_defaults() {
        let sweep = SweepSettings::from_config(&CablineConfig::default());
        assert_eq!(sweep.interval, Duration::from_secs(300));
        assert_eq!(sweep.lookahead, TimeDelta::minutes(120));
    }
}
