// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cabline serve` command implementation.
//!
//! Opens the SQLite store, picks the outbound adapters the configuration
//! allows, wires the conversation and assignment engines, then runs the
//! HTTP gateway and the assignment sweep until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use cabline_booking::shutdown::{drain_tasks, install_signal_handler};
use cabline_booking::{
    AssignmentEngine, AssignmentSweep, BookingSettings, ConversationEngine, Services,
    SweepSettings, UpiPaymentLinks,
};
use cabline_config::model::CablineConfig;
use cabline_core::{
    CablineError, NotificationGateway, OtpMailer, RouteLookup, StorageAdapter, SystemClock,
};
use cabline_email::{LogOtpMailer, SmtpOtpMailer};
use cabline_gateway::{GatewayState, start_server};
use cabline_intent::KnownLocations;
use cabline_maps::GoogleRouteLookup;
use cabline_storage::SqliteStorage;
use cabline_whatsapp::{LogNotifier, WhatsAppClient};
use tracing::{error, info, warn};

/// Time background tasks get to finish after the server stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound collaborators chosen from the configuration.
pub struct Adapters {
    pub storage: Arc<SqliteStorage>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub routes: Arc<dyn RouteLookup>,
    pub mailer: Arc<dyn OtpMailer>,
}

/// WhatsApp client when credentials are present, otherwise a logging stand-in.
pub fn build_notifier(
    config: &CablineConfig,
) -> Result<Arc<dyn NotificationGateway>, CablineError> {
    if config.whatsapp.access_token.is_none() {
        warn!("whatsapp.access_token not set; outbound messages will only be logged");
        return Ok(Arc::new(LogNotifier::new()));
    }
    Ok(Arc::new(WhatsAppClient::new(&config.whatsapp)?))
}

/// SMTP mailer when a relay is configured, otherwise codes go to the debug log.
pub fn build_mailer(config: &CablineConfig) -> Result<Arc<dyn OtpMailer>, CablineError> {
    if config.email.smtp_host.is_none() {
        warn!("email.smtp_host not set; OTP codes will only be logged at debug level");
        return Ok(Arc::new(LogOtpMailer));
    }
    Ok(Arc::new(SmtpOtpMailer::new(&config.email, &config.service.name)?))
}

/// Builds every adapter and opens (and migrates) the database.
pub async fn build_adapters(config: &CablineConfig) -> Result<Adapters, CablineError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;

    Ok(Adapters {
        storage: Arc::new(storage),
        notifier: build_notifier(config)?,
        routes: Arc::new(GoogleRouteLookup::new(&config.maps)?),
        mailer: build_mailer(config)?,
    })
}

/// Runs the `cabline serve` command.
pub async fn run_serve(config: CablineConfig) -> Result<(), CablineError> {
    info!(service = %config.service.name, "starting cabline serve");

    let adapters = build_adapters(&config).await?;
    let storage: Arc<dyn StorageAdapter> = adapters.storage.clone();
    let clock = Arc::new(SystemClock);
    let settings = BookingSettings::from_config(&config)?;

    let assignment = Arc::new(AssignmentEngine::new(
        storage.clone(),
        adapters.notifier.clone(),
        clock.clone(),
        settings.clone(),
    ));
    let sweep = AssignmentSweep::new(
        storage.clone(),
        assignment.clone(),
        clock.clone(),
        SweepSettings::from_config(&config),
    );
    let services = Services {
        storage: storage.clone(),
        notifier: adapters.notifier.clone(),
        routes: adapters.routes.clone(),
        locations: Arc::new(KnownLocations::from_config(&config.booking)),
        payments: Arc::new(UpiPaymentLinks::from_config(&config.payment)),
        mailer: adapters.mailer.clone(),
        clock,
    };
    let engine = Arc::new(ConversationEngine::new(services, assignment, settings));

    let cancel = install_signal_handler();

    let sweep_cancel = cancel.clone();
    let sweep_task = tokio::spawn(async move { sweep.run(sweep_cancel).await });

    let state = GatewayState::new(engine, &config);
    let served = start_server(&config.gateway, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "gateway stopped with an error");
    }
    // Stops the sweep as well when the server exits on its own.
    cancel.cancel();

    let interrupted = drain_tasks(vec![("assignment-sweep", sweep_task)], DRAIN_TIMEOUT).await;
    if interrupted > 0 {
        warn!(interrupted, "background tasks did not finish in time");
    }

    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }
    info!("cabline stopped");
    served
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `service.log_level` when set.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cabline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabline_core::PluginAdapter;

    #[test]
    fn missing_token_falls_back_to_log_notifier() {
        let config = CablineConfig::default();
        let notifier = build_notifier(&config).unwrap();
        assert_eq!(notifier.name(), LogNotifier::new().name());
    }

    #[test]
    fn token_without_phone_id_is_a_config_error() {
        let mut config = CablineConfig::default();
        config.whatsapp.access_token = Some("token".into());
        assert!(matches!(
            build_notifier(&config),
            Err(CablineError::Config(_))
        ));
    }

    #[test]
    fn missing_smtp_host_falls_back_to_log_mailer() {
        let config = CablineConfig::default();
        let mailer = build_mailer(&config).unwrap();
        assert_eq!(mailer.name(), LogOtpMailer.name());
    }

    #[tokio::test]
    async fn adapters_require_maps_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CablineConfig::default();
        config.storage.database_path = dir.path().join("cabline.db").display().to_string();
        assert!(matches!(
            build_adapters(&config).await,
            Err(CablineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn adapters_build_with_maps_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CablineConfig::default();
        config.storage.database_path = dir.path().join("cabline.db").display().to_string();
        config.maps.api_key = Some("maps-key".into());
        let adapters = build_adapters(&config).await.unwrap();
        assert_eq!(adapters.routes.adapter_type(), cabline_core::AdapterType::Routing);
        adapters.storage.close().await.unwrap();
    }
}
