// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete booking stack with mock adapters,
//! a temp SQLite database and a pinned clock. Provides `send()` and
//! `press()` to drive conversations through the real engine in tests.

use std::sync::Arc;

use cabline_booking::{
    AssignmentEngine, AssignmentSweep, BookingSettings, ConversationEngine, Services,
    SweepSettings, TurnReport, UpiPaymentLinks, credentials,
};
use cabline_config::model::{CablineConfig, StorageConfig};
use cabline_core::model::{
    ConversationSession, Driver, NewDriver, NewUser, NewVehicle, User, Vehicle,
};
use cabline_core::{CablineError, InboundMessage, StorageAdapter};
use cabline_intent::KnownLocations;
use cabline_storage::SqliteStorage;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::clock::FixedClock;
use crate::mock_mailer::MockMailer;
use crate::mock_notifier::MockNotifier;
use crate::mock_routes::MockRouteLookup;

/// Password given to customers created by [`TestHarness::register`].
pub const TEST_PASSWORD: &str = "secret-pass";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: CablineConfig,
    now: Option<DateTime<Utc>>,
    route: (f64, i64),
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = CablineConfig::default();
        config.booking.admin_phones = vec!["919999999999".to_string()];
        config.booking.external_timeout_secs = 2;
        Self {
            config,
            now: None,
            route: (10.0, 25),
        }
    }

    /// Adjust the configuration before the stack is built.
    pub fn with_config(mut self, edit: impl FnOnce(&mut CablineConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Pin the clock to a UTC instant.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Default answer of the mock route lookup.
    pub fn with_route(mut self, distance_km: f64, duration_minutes: i64) -> Self {
        self.route = (distance_km, duration_minutes);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CablineError> {
        let mut config = self.config;
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CablineError::Storage { source: e.into() })?;
        config.storage = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };

        let sqlite = SqliteStorage::new(config.storage.clone());
        sqlite.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(sqlite);

        let settings = BookingSettings::from_config(&config)?;
        let offset = settings.utc_offset;
        let now = self.now.unwrap_or_else(|| {
            // A fixed mid-afternoon local time keeps "today" bookings possible.
            local_at(offset, 2026, 10, 17, 14, 0)
        });

        let clock = Arc::new(FixedClock::new(now));
        let notifier = Arc::new(MockNotifier::new());
        let routes = Arc::new(MockRouteLookup::new(self.route.0, self.route.1));
        let mailer = Arc::new(MockMailer::new());

        let services = Services {
            storage: storage.clone(),
            notifier: notifier.clone(),
            routes: routes.clone(),
            locations: Arc::new(KnownLocations::from_config(&config.booking)),
            payments: Arc::new(UpiPaymentLinks::from_config(&config.payment)),
            mailer: mailer.clone(),
            clock: clock.clone(),
        };
        let assignment = Arc::new(AssignmentEngine::new(
            storage.clone(),
            notifier.clone(),
            clock.clone(),
            settings.clone(),
        ));
        let sweep = AssignmentSweep::new(
            storage.clone(),
            assignment.clone(),
            clock.clone(),
            SweepSettings::from_config(&config),
        );
        let engine = Arc::new(ConversationEngine::new(services, assignment.clone(), settings));

        Ok(TestHarness {
            engine,
            assignment,
            sweep,
            storage,
            notifier,
            routes,
            mailer,
            clock,
            config,
            offset,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub engine: Arc<ConversationEngine>,
    pub assignment: Arc<AssignmentEngine>,
    pub sweep: AssignmentSweep,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    pub notifier: Arc<MockNotifier>,
    pub routes: Arc<MockRouteLookup>,
    pub mailer: Arc<MockMailer>,
    pub clock: Arc<FixedClock>,
    pub config: CablineConfig,
    pub offset: FixedOffset,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Deliver a typed message from `phone`.
    pub async fn send(&self, phone: &str, text: &str) -> Result<TurnReport, CablineError> {
        self.engine
            .handle_message(&InboundMessage::text(phone, text))
            .await
    }

    /// Deliver a button tap from `phone`.
    pub async fn press(&self, phone: &str, payload: &str) -> Result<TurnReport, CablineError> {
        self.engine
            .handle_message(&InboundMessage::button(phone, payload, payload))
            .await
    }

    /// Local wall-clock time in the service zone, as UTC.
    pub fn local(&self, year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        local_at(self.offset, year, month, day, hour, minute)
    }

    pub async fn session(&self, phone: &str) -> Option<ConversationSession> {
        self.storage.get_session(phone).await.unwrap()
    }

    /// Create a registered customer.
    pub async fn register(&self, phone: &str, name: &str) -> User {
        let password_hash = credentials::hash_password(TEST_PASSWORD).unwrap();
        self.storage
            .create_user(&NewUser {
                phone: phone.to_string(),
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash,
            })
            .await
            .unwrap()
    }

    pub async fn add_car(&self, plate: &str, car_type: &str, rate_per_km: f64) -> Vehicle {
        self.storage
            .create_vehicle(&NewVehicle {
                plate_number: plate.to_string(),
                model: "Dzire".to_string(),
                car_type: car_type.to_string(),
                rate_per_km,
            })
            .await
            .unwrap()
    }

    pub async fn add_driver(&self, name: &str, phone: &str, car_id: Option<i64>) -> Driver {
        self.storage
            .create_driver(&NewDriver {
                name: name.to_string(),
                phone: phone.to_string(),
                car_id,
                is_fixed: false,
            })
            .await
            .unwrap()
    }

    /// `count` free drivers, each with a home vehicle of `car_type`.
    pub async fn add_fleet(&self, car_type: &str, count: usize) -> Vec<(Driver, Vehicle)> {
        let mut fleet = Vec::with_capacity(count);
        for i in 0..count {
            let vehicle = self
                .add_car(&format!("KA01{car_type}{i:04}"), car_type, 12.0)
                .await;
            let driver = self
                .add_driver(
                    &format!("Driver {i}"),
                    &format!("9180000{i:05}"),
                    Some(vehicle.id),
                )
                .await;
            fleet.push((driver, vehicle));
        }
        fleet
    }

    /// Walks a registered customer from the menu to the fare quote.
    ///
    /// `date` is a date-option payload (`date_today`, `date_tomorrow`) and
    /// `time` is typed as the customer would.
    pub async fn quote(&self, phone: &str, date: &str, time: &str, car_type: &str) -> TurnReport {
        self.press(phone, "book_ride").await.unwrap();
        self.press(phone, date).await.unwrap();
        self.send(phone, time).await.unwrap();
        self.send(phone, "Koramangala").await.unwrap();
        self.send(phone, "Whitefield").await.unwrap();
        self.press(phone, &format!("car_{car_type}")).await.unwrap()
    }
}

fn local_at(
    offset: FixedOffset,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .and_then(|dt| offset.from_local_datetime(&dt).single())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabline_core::model::ConversationState;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert!(harness.storage.list_rides(None).await.unwrap().is_empty());
        assert!(harness.storage.auto_assignment_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn greeting_shows_menu() {
        let harness = TestHarness::builder().build().await.unwrap();
        let report = harness.send("919000000001", "hi").await.unwrap();
        assert_eq!(report.state, ConversationState::AwaitingIntent);
        let reply = harness.notifier.last_to("919000000001").await.unwrap();
        assert!(reply.button_ids().contains(&"book_ride".to_string()));
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder().build().await.unwrap();
        let h2 = TestHarness::builder().build().await.unwrap();
        h1.register("919000000001", "Asha").await;
        assert!(h1.storage.get_user("919000000001").await.unwrap().is_some());
        assert!(h2.storage.get_user("919000000001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn local_time_uses_service_offset() {
        let harness = TestHarness::builder().build().await.unwrap();
        let t = harness.local(2026, 10, 17, 20, 0);
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 10, 17, 14, 30, 0).unwrap());
    }
}
