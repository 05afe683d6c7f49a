// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cabline.toml` > `~/.config/cabline/cabline.toml` > `/etc/cabline/cabline.toml`
//! with environment variable overrides via `CABLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CablineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cabline/cabline.toml` (system-wide)
/// 3. `~/.config/cabline/cabline.toml` (user XDG config)
/// 4. `./cabline.toml` (local directory)
/// 5. `CABLINE_*` environment variables
pub fn load_config() -> Result<CablineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CablineConfig::default()))
        .merge(Toml::file("/etc/cabline/cabline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("cabline/cabline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("cabline.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<CablineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CablineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CablineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CablineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CABLINE_WHATSAPP_ACCESS_TOKEN` must map to
/// `whatsapp.access_token`, not `whatsapp.access.token`.
fn env_provider() -> Env {
    Env::prefixed("CABLINE_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) const SECTIONS: [&str; 9] = [
    "service",
    "storage",
    "whatsapp",
    "maps",
    "gateway",
    "booking",
    "assignment",
    "payment",
    "email",
];

/// Maps a lowercased, prefix-stripped env key such as `whatsapp_access_token`
/// to its dotted path `whatsapp.access_token`.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
