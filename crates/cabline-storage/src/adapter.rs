// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use cabline_config::model::StorageConfig;
use cabline_core::model::{
    AssignedRide, ConversationSession, Coupon, DashboardStats, DeleteOutcome, Driver,
    ManualAssignOutcome, NewDriver, NewOwner, NewRide, NewUser, NewVehicle, Owner, PaymentStatus,
    PricingRule, RevenuePeriod, RevenuePoint, Ride, RideStatus, RideUpdate, User, Vehicle,
};
use cabline_core::{AdapterType, CablineError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, CablineError> {
        self.db
            .get()
            .ok_or_else(|| {
                CablineError::storage_msg("storage not initialized -- call initialize() first")
            })
    }

    async fn checkpoint(&self) -> Result<(), CablineError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CablineError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CablineError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), CablineError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| CablineError::storage_msg("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CablineError> {
        self.db()?;
        self.checkpoint().await
    }

    // --- Sessions ---

    async fn get_session(&self, phone: &str) -> Result<Option<ConversationSession>, CablineError> {
        queries::sessions::get_session(self.db()?, phone).await
    }

    async fn save_session(&self, session: &ConversationSession) -> Result<(), CablineError> {
        queries::sessions::save_session(self.db()?, session).await
    }

    // --- Users ---

    async fn get_user(&self, phone: &str) -> Result<Option<User>, CablineError> {
        queries::users::get_user(self.db()?, phone).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, CablineError> {
        queries::users::create_user(self.db()?, user).await
    }

    async fn update_password(&self, phone: &str, password_hash: &str) -> Result<(), CablineError> {
        queries::users::update_password(self.db()?, phone, password_hash).await
    }

    async fn list_user_phones(&self) -> Result<Vec<String>, CablineError> {
        queries::users::list_user_phones(self.db()?).await
    }

    // --- Fleet ---

    async fn get_driver(&self, id: i64) -> Result<Option<Driver>, CablineError> {
        queries::fleet::get_driver(self.db()?, id).await
    }

    async fn get_driver_by_phone(&self, phone: &str) -> Result<Option<Driver>, CablineError> {
        queries::fleet::get_driver_by_phone(self.db()?, phone).await
    }

    async fn list_drivers(&self) -> Result<Vec<Driver>, CablineError> {
        queries::fleet::list_drivers(self.db()?).await
    }

    async fn create_driver(&self, driver: &NewDriver) -> Result<Driver, CablineError> {
        queries::fleet::create_driver(self.db()?, driver).await
    }

    async fn update_driver(
        &self,
        driver_id: i64,
        driver: &NewDriver,
    ) -> Result<Option<Driver>, CablineError> {
        queries::fleet::update_driver(self.db()?, driver_id, driver).await
    }

    async fn delete_driver(&self, driver_id: i64) -> Result<DeleteOutcome, CablineError> {
        queries::fleet::delete_driver(self.db()?, driver_id).await
    }

    async fn update_driver_location(
        &self,
        driver_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), CablineError> {
        queries::fleet::update_driver_location(self.db()?, driver_id, latitude, longitude).await
    }

    async fn get_vehicle(&self, id: i64) -> Result<Option<Vehicle>, CablineError> {
        queries::fleet::get_vehicle(self.db()?, id).await
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, CablineError> {
        queries::fleet::list_vehicles(self.db()?).await
    }

    async fn create_vehicle(&self, vehicle: &NewVehicle) -> Result<Vehicle, CablineError> {
        queries::fleet::create_vehicle(self.db()?, vehicle).await
    }

    async fn update_vehicle(
        &self,
        car_id: i64,
        vehicle: &NewVehicle,
    ) -> Result<Option<Vehicle>, CablineError> {
        queries::fleet::update_vehicle(self.db()?, car_id, vehicle).await
    }

    async fn delete_vehicle(&self, car_id: i64) -> Result<DeleteOutcome, CablineError> {
        queries::fleet::delete_vehicle(self.db()?, car_id).await
    }

    async fn available_car_types(&self) -> Result<Vec<String>, CablineError> {
        queries::fleet::available_car_types(self.db()?).await
    }

    async fn rate_for_type(&self, car_type: &str) -> Result<Option<f64>, CablineError> {
        queries::fleet::rate_for_type(self.db()?, car_type).await
    }

    async fn list_pricing(&self) -> Result<Vec<PricingRule>, CablineError> {
        queries::fleet::list_pricing(self.db()?).await
    }

    async fn upsert_pricing(&self, rule: &PricingRule) -> Result<(), CablineError> {
        queries::fleet::upsert_pricing(self.db()?, rule).await
    }

    // --- Coupons and owners ---

    async fn get_coupon(&self, code: &str) -> Result<Option<Coupon>, CablineError> {
        queries::coupons::get_coupon(self.db()?, code).await
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>, CablineError> {
        queries::coupons::list_coupons(self.db()?).await
    }

    async fn add_coupon(&self, code: &str, discount: f64) -> Result<Coupon, CablineError> {
        queries::coupons::add_coupon(self.db()?, code, discount).await
    }

    async fn delete_coupon(&self, code: &str) -> Result<bool, CablineError> {
        queries::coupons::delete_coupon(self.db()?, code).await
    }

    async fn add_owner(&self, owner: &NewOwner) -> Result<Owner, CablineError> {
        queries::owners::add_owner(self.db()?, owner).await
    }

    async fn get_owner_by_email(&self, email: &str) -> Result<Option<Owner>, CablineError> {
        queries::owners::get_owner_by_email(self.db()?, email).await
    }

    async fn list_owners(&self) -> Result<Vec<Owner>, CablineError> {
        queries::owners::list_owners(self.db()?).await
    }

    async fn update_owner(
        &self,
        owner_id: i64,
        owner: &NewOwner,
    ) -> Result<Option<Owner>, CablineError> {
        queries::owners::update_owner(self.db()?, owner_id, owner).await
    }

    async fn delete_owner(&self, owner_id: i64) -> Result<bool, CablineError> {
        queries::owners::delete_owner(self.db()?, owner_id).await
    }

    async fn owner_phones(&self) -> Result<Vec<String>, CablineError> {
        queries::owners::owner_phones(self.db()?).await
    }

    // --- Rides ---

    async fn create_ride(&self, ride: &NewRide) -> Result<Ride, CablineError> {
        queries::rides::create_ride(self.db()?, ride).await
    }

    async fn get_ride(&self, id: i64) -> Result<Option<Ride>, CablineError> {
        queries::rides::get_ride(self.db()?, id).await
    }

    async fn list_rides(&self, status: Option<RideStatus>) -> Result<Vec<Ride>, CablineError> {
        queries::rides::list_rides(self.db()?, status).await
    }

    async fn list_unassigned_rides(&self) -> Result<Vec<Ride>, CablineError> {
        queries::rides::list_unassigned_rides(self.db()?).await
    }

    async fn rides_for_phone(&self, phone: &str, limit: u32) -> Result<Vec<Ride>, CablineError> {
        queries::rides::rides_for_phone(self.db()?, phone, limit).await
    }

    async fn latest_ride_for_phone(&self, phone: &str) -> Result<Option<Ride>, CablineError> {
        queries::rides::latest_ride_for_phone(self.db()?, phone).await
    }

    async fn set_payment_status(
        &self,
        ride_id: i64,
        status: PaymentStatus,
    ) -> Result<bool, CablineError> {
        queries::rides::set_payment_status(self.db()?, ride_id, status).await
    }

    async fn prebooked_due(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Ride>, CablineError> {
        queries::rides::prebooked_due(self.db()?, from, until).await
    }

    async fn advance_ride(
        &self,
        ride_id: i64,
        driver_id: Option<i64>,
        from: RideStatus,
        to: RideStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Ride>, CablineError> {
        queries::rides::advance_ride(self.db()?, ride_id, driver_id, from, to, at).await
    }

    async fn complete_ride(
        &self,
        ride_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<Ride>, CablineError> {
        queries::rides::complete_ride(self.db()?, ride_id, at).await
    }

    async fn cancel_ride(&self, ride_id: i64) -> Result<Option<Ride>, CablineError> {
        queries::rides::cancel_ride(self.db()?, ride_id).await
    }

    async fn delete_ride(&self, ride_id: i64) -> Result<Option<Ride>, CablineError> {
        queries::rides::delete_ride(self.db()?, ride_id).await
    }

    async fn update_ride(
        &self,
        ride_id: i64,
        update: &RideUpdate,
    ) -> Result<Option<Ride>, CablineError> {
        queries::rides::update_ride(self.db()?, ride_id, update).await
    }

    // --- Assignment ---

    async fn find_available(
        &self,
        car_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<(Driver, Vehicle)>, CablineError> {
        queries::assignment::find_available(self.db()?, car_type, start, end).await
    }

    async fn create_assigned_ride(
        &self,
        ride: &NewRide,
    ) -> Result<Option<AssignedRide>, CablineError> {
        queries::assignment::create_assigned_ride(self.db()?, ride).await
    }

    async fn assign_ride(&self, ride_id: i64) -> Result<Option<AssignedRide>, CablineError> {
        queries::assignment::assign_ride(self.db()?, ride_id).await
    }

    async fn manual_assign(
        &self,
        ride_id: i64,
        driver_id: i64,
        car_id: i64,
    ) -> Result<ManualAssignOutcome, CablineError> {
        queries::assignment::manual_assign(self.db()?, ride_id, driver_id, car_id).await
    }

    // --- Settings and stats ---

    async fn auto_assignment_enabled(&self) -> Result<bool, CablineError> {
        queries::settings::auto_assignment_enabled(self.db()?).await
    }

    async fn set_auto_assignment(&self, enabled: bool) -> Result<(), CablineError> {
        queries::settings::set_auto_assignment(self.db()?, enabled).await
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, CablineError> {
        queries::stats::dashboard_stats(self.db()?).await
    }

    async fn revenue_by_period(
        &self,
        period: RevenuePeriod,
        utc_offset: FixedOffset,
    ) -> Result<Vec<RevenuePoint>, CablineError> {
        queries::stats::revenue_by_period(self.db()?, period, utc_offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        assert!(storage.get_session("91900").await.is_err());
    }

    #[tokio::test]
    async fn health_check_and_shutdown_after_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage
            .save_session(&ConversationSession::new("919000000001"))
            .await
            .unwrap();
        storage.shutdown().await.unwrap();
    }
}
