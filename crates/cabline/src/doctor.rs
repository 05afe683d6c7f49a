// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cabline doctor` command implementation.
//!
//! Builds every adapter from the loaded configuration and runs its health
//! check, so credentials and connectivity can be verified before serving.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use cabline_config::model::CablineConfig;
use cabline_core::{CablineError, HealthStatus, PluginAdapter};
use cabline_storage::SqliteStorage;

use crate::serve::{build_mailer, build_notifier};

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn from_health(name: &str, health: Result<HealthStatus, CablineError>, start: Instant) -> Self {
        let (status, message) = match health {
            Ok(HealthStatus::Healthy) => (CheckStatus::Pass, "healthy".to_string()),
            Ok(HealthStatus::Degraded(reason)) => (CheckStatus::Warn, reason),
            Ok(HealthStatus::Unhealthy(reason)) => (CheckStatus::Fail, reason),
            Err(e) => (CheckStatus::Fail, e.to_string()),
        };
        Self {
            name: name.to_string(),
            status,
            message,
            duration: start.elapsed(),
        }
    }

    fn failed(name: &str, error: CablineError, start: Instant) -> Self {
        Self::from_health(name, Err(error), start)
    }
}

/// Run the `cabline doctor` command.
///
/// Returns the number of failed checks; warnings do not count.
pub async fn run_doctor(config: &CablineConfig, plain: bool) -> Result<usize, CablineError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_database(config).await,
        check_whatsapp(config).await,
        check_maps(config).await,
        check_mail(config).await,
    ];

    println!();
    println!("  cabline doctor");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();

    let fail_count = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    let warn_count = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warn)
        .count();
    if fail_count + warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(fail_count)
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!("    {symbol} {:<12} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<12} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Opens the database, applies migrations and runs a query.
async fn check_database(config: &CablineConfig) -> CheckResult {
    let start = Instant::now();
    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = cabline_core::StorageAdapter::initialize(&storage).await {
        return CheckResult::failed("Database", e, start);
    }
    let result = CheckResult::from_health("Database", storage.health_check().await, start);
    let _ = cabline_core::StorageAdapter::close(&storage).await;
    result
}

async fn check_whatsapp(config: &CablineConfig) -> CheckResult {
    let start = Instant::now();
    match build_notifier(config) {
        Ok(notifier) => CheckResult::from_health("WhatsApp", notifier.health_check().await, start),
        Err(e) => CheckResult::failed("WhatsApp", e, start),
    }
}

async fn check_maps(config: &CablineConfig) -> CheckResult {
    let start = Instant::now();
    match cabline_maps::GoogleRouteLookup::new(&config.maps) {
        Ok(routes) => CheckResult::from_health("Maps", routes.health_check().await, start),
        Err(e) => CheckResult::failed("Maps", e, start),
    }
}

async fn check_mail(config: &CablineConfig) -> CheckResult {
    let start = Instant::now();
    match build_mailer(config) {
        Ok(mailer) => CheckResult::from_health("Mail", mailer.health_check().await, start),
        Err(e) => CheckResult::failed("Mail", e, start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> CablineConfig {
        let mut config = CablineConfig::default();
        config.storage.database_path = dir.path().join("doctor.db").display().to_string();
        config
    }

    #[test]
    fn degraded_health_is_a_warning() {
        let result = CheckResult::from_health(
            "WhatsApp",
            Ok(HealthStatus::Degraded("logging only".into())),
            Instant::now(),
        );
        assert_eq!(result.status, CheckStatus::Warn);
        assert_eq!(result.message, "logging only");
    }

    #[test]
    fn plain_output_uses_bracket_tags() {
        let result = CheckResult {
            name: "Maps".to_string(),
            status: CheckStatus::Fail,
            message: "maps.api_key is required".to_string(),
            duration: Duration::from_millis(3),
        };
        let line = render_line(&result, false);
        assert!(line.contains("[FAIL]"));
        assert!(line.contains("maps.api_key is required"));
        assert!(line.ends_with("(3ms)"));
    }

    #[tokio::test]
    async fn database_check_passes_on_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_database(&config_in(&dir)).await;
        assert_eq!(result.status, CheckStatus::Pass, "{}", result.message);
    }

    #[tokio::test]
    async fn missing_maps_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_maps(&config_in(&dir)).await;
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("maps.api_key"));
    }

    #[tokio::test]
    async fn log_only_adapters_warn() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_whatsapp(&config_in(&dir)).await;
        assert_eq!(result.status, CheckStatus::Warn);
    }
}
