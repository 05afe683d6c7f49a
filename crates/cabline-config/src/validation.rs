// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, positive intervals and sane tax rates.

use crate::diagnostic::ConfigError;
use crate::model::CablineConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &CablineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    // chrono::FixedOffset accepts strictly less than a day.
    if config.service.utc_offset_minutes.abs() >= 24 * 60 {
        fail(format!(
            "service.utc_offset_minutes must be within +/-1439, got {}",
            config.service.utc_offset_minutes
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.booking.immediate_window_minutes < 0 {
        fail(format!(
            "booking.immediate_window_minutes must be non-negative, got {}",
            config.booking.immediate_window_minutes
        ));
    }

    if !(0.0..=100.0).contains(&config.booking.tax_rate_percent) {
        fail(format!(
            "booking.tax_rate_percent must be between 0 and 100, got {}",
            config.booking.tax_rate_percent
        ));
    }

    if !(0.0..=1.0).contains(&config.booking.location_match_threshold) {
        fail(format!(
            "booking.location_match_threshold must be between 0 and 1, got {}",
            config.booking.location_match_threshold
        ));
    }

    if config.booking.otp_ttl_secs == 0 {
        fail("booking.otp_ttl_secs must be greater than 0".to_string());
    }

    if config.booking.otp_max_attempts == 0 {
        fail("booking.otp_max_attempts must be greater than 0".to_string());
    }

    if config.booking.external_timeout_secs == 0 {
        fail("booking.external_timeout_secs must be greater than 0".to_string());
    }

    if config.assignment.sweep_interval_secs == 0 {
        fail("assignment.sweep_interval_secs must be greater than 0".to_string());
    }

    if config.assignment.lookahead_minutes <= 0 {
        fail(format!(
            "assignment.lookahead_minutes must be positive, got {}",
            config.assignment.lookahead_minutes
        ));
    }

    if config.payment.upi_vpa.trim().is_empty() || !config.payment.upi_vpa.contains('@') {
        fail(format!(
            "payment.upi_vpa `{}` is not a UPI address (expected name@bank)",
            config.payment.upi_vpa
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
