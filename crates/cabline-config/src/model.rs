// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cabline booking service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Cabline configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section defaults to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CablineConfig {
    /// Service identity, logging and local timezone.
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Cloud API credentials.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Geocoding and directions provider.
    #[serde(default)]
    pub maps: MapsConfig,

    /// HTTP server for webhooks and the admin API.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversation and pricing rules.
    #[serde(default)]
    pub booking: BookingConfig,

    /// Background assignment sweep.
    #[serde(default)]
    pub assignment: AssignmentConfig,

    /// UPI payee used for payment links.
    #[serde(default)]
    pub payment: PaymentConfig,

    /// SMTP relay for OTP mails.
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in greetings.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Fixed offset of the service's local time from UTC, in minutes.
    /// Typed times and dates are interpreted in this zone.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

fn default_service_name() -> String {
    "Cabline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_utc_offset_minutes() -> i32 {
    // IST
    330
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cabline").join("cabline.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("cabline.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Permanent or system-user access token. `None` disables outbound sends.
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Token echoed during the webhook subscription handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret for `X-Hub-Signature-256`. Signatures are not checked when unset.
    #[serde(default)]
    pub app_secret: Option<String>,

    #[serde(default = "default_graph_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_graph_api_version")]
    pub api_version: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            verify_token: None,
            app_secret: None,
            api_base_url: default_graph_base_url(),
            api_version: default_graph_api_version(),
        }
    }
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_graph_api_version() -> String {
    "v18.0".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MapsConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_maps_base_url")]
    pub base_url: String,

    /// Locality names accepted as inside the service area.
    #[serde(default = "default_service_localities")]
    pub service_localities: Vec<String>,

    /// Geocoding `components` filter biasing results to the service area.
    #[serde(default = "default_geocode_components")]
    pub components: String,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_maps_base_url(),
            service_localities: default_service_localities(),
            components: default_geocode_components(),
        }
    }
}

fn default_maps_base_url() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_service_localities() -> Vec<String> {
    vec!["Bengaluru".to_string(), "Bangalore Urban".to_string()]
}

fn default_geocode_components() -> String {
    "locality:Bengaluru|country:IN".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for the admin API. Admin routes reject every request
    /// when unset.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BookingConfig {
    /// Rides starting within this many minutes are assigned immediately.
    #[serde(default = "default_immediate_window_minutes")]
    pub immediate_window_minutes: i64,

    #[serde(default = "default_tax_rate_percent")]
    pub tax_rate_percent: f64,

    /// Canonical place names used by the location normalizer.
    #[serde(default = "default_known_locations")]
    pub known_locations: Vec<String>,

    /// Minimum Jaro-Winkler similarity for a location correction.
    #[serde(default = "default_location_match_threshold")]
    pub location_match_threshold: f64,

    /// Lifetime of a registration or reset OTP.
    #[serde(default = "default_otp_ttl_secs")]
    pub otp_ttl_secs: u64,

    /// Wrong codes accepted before a fresh one is mailed.
    #[serde(default = "default_otp_max_attempts")]
    pub otp_max_attempts: u32,

    /// Upper bound on each route lookup or outbound send.
    #[serde(default = "default_external_timeout_secs")]
    pub external_timeout_secs: u64,

    /// Phones alerted when an urgent ride needs a manual assignment.
    #[serde(default)]
    pub admin_phones: Vec<String>,

    /// How many rides "my rides" lists.
    #[serde(default = "default_my_rides_limit")]
    pub my_rides_limit: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            immediate_window_minutes: default_immediate_window_minutes(),
            tax_rate_percent: default_tax_rate_percent(),
            known_locations: default_known_locations(),
            location_match_threshold: default_location_match_threshold(),
            otp_ttl_secs: default_otp_ttl_secs(),
            otp_max_attempts: default_otp_max_attempts(),
            external_timeout_secs: default_external_timeout_secs(),
            admin_phones: Vec::new(),
            my_rides_limit: default_my_rides_limit(),
        }
    }
}

fn default_immediate_window_minutes() -> i64 {
    120
}

fn default_tax_rate_percent() -> f64 {
    5.0
}

fn default_known_locations() -> Vec<String> {
    [
        "mg road",
        "koramangala",
        "indiranagar",
        "btm layout",
        "whitefield",
        "hebbal",
        "marathahalli",
        "banashankari",
        "rajajinagar",
        "jayanagar",
        "malleshwaram",
        "hsr layout",
        "yelachenahalli",
        "electronic city",
        "bommanahalli",
        "shivajinagar",
        "rt nagar",
        "kr puram",
        "airport",
        "yeshwanthpur",
        "kammanahalli",
        "bannerghatta road",
        "majestic",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_location_match_threshold() -> f64 {
    0.85
}

fn default_otp_ttl_secs() -> u64 {
    300
}

fn default_otp_max_attempts() -> u32 {
    3
}

fn default_external_timeout_secs() -> u64 {
    10
}

fn default_my_rides_limit() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssignmentConfig {
    /// Seconds between sweep ticks.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Prebooked rides starting within this many minutes are swept.
    #[serde(default = "default_lookahead_minutes")]
    pub lookahead_minutes: i64,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            lookahead_minutes: default_lookahead_minutes(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_lookahead_minutes() -> i64 {
    120
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// UPI virtual payment address receiving ride payments.
    #[serde(default = "default_upi_vpa")]
    pub upi_vpa: String,

    #[serde(default = "default_upi_payee_name")]
    pub upi_payee_name: String,

    /// Shared secret expected in the payment webhook's bearer header.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            upi_vpa: default_upi_vpa(),
            upi_payee_name: default_upi_payee_name(),
            webhook_secret: None,
        }
    }
}

fn default_upi_vpa() -> String {
    "cabline@upi".to_string()
}

fn default_upi_payee_name() -> String {
    "Cabline".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// SMTP relay host. `None` disables OTP mails (registration still works
    /// but codes are only logged at debug level).
    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_from_address")]
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: default_from_address(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "Cabline <no-reply@cabline.local>".to_string()
}
