// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the persistence backend.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};

use crate::error::CablineError;
use crate::model::{
    AssignedRide, ConversationSession, Coupon, DashboardStats, DeleteOutcome, Driver,
    ManualAssignOutcome, NewDriver, NewOwner, NewRide, NewUser, NewVehicle, Owner, PaymentStatus,
    PricingRule, RevenuePeriod, RevenuePoint, Ride, RideStatus, RideUpdate, User, Vehicle,
};
use crate::traits::adapter::PluginAdapter;

/// Persistence for sessions, users, the fleet, rides and settings.
///
/// The assignment primitives (`create_assigned_ride`, `assign_ride`,
/// `manual_assign`) must apply the ride binding and both busy flags as a
/// single unit of work. Losing a compare-and-set on a resource status is
/// reported as "nothing available", never as an error.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), CablineError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), CablineError>;

    // --- Sessions ---

    async fn get_session(&self, phone: &str) -> Result<Option<ConversationSession>, CablineError>;

    /// Inserts or overwrites the session keyed by its phone.
    async fn save_session(&self, session: &ConversationSession) -> Result<(), CablineError>;

    // --- Users ---

    async fn get_user(&self, phone: &str) -> Result<Option<User>, CablineError>;

    async fn create_user(&self, user: &NewUser) -> Result<User, CablineError>;

    async fn update_password(&self, phone: &str, password_hash: &str)
    -> Result<(), CablineError>;

    /// Phones of every registered user, for bulk messaging.
    async fn list_user_phones(&self) -> Result<Vec<String>, CablineError>;

    // --- Fleet ---

    async fn get_driver(&self, id: i64) -> Result<Option<Driver>, CablineError>;

    async fn get_driver_by_phone(&self, phone: &str) -> Result<Option<Driver>, CablineError>;

    async fn list_drivers(&self) -> Result<Vec<Driver>, CablineError>;

    async fn create_driver(&self, driver: &NewDriver) -> Result<Driver, CablineError>;

    async fn update_driver(
        &self,
        driver_id: i64,
        driver: &NewDriver,
    ) -> Result<Option<Driver>, CablineError>;

    /// Refused with [`DeleteOutcome::InUse`] while the driver is on a ride.
    async fn delete_driver(&self, driver_id: i64) -> Result<DeleteOutcome, CablineError>;

    async fn update_driver_location(
        &self,
        driver_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), CablineError>;

    async fn get_vehicle(&self, id: i64) -> Result<Option<Vehicle>, CablineError>;

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, CablineError>;

    async fn create_vehicle(&self, vehicle: &NewVehicle) -> Result<Vehicle, CablineError>;

    async fn update_vehicle(
        &self,
        car_id: i64,
        vehicle: &NewVehicle,
    ) -> Result<Option<Vehicle>, CablineError>;

    /// Refused while the vehicle is on a ride; drivers fixed to it are unbound.
    async fn delete_vehicle(&self, car_id: i64) -> Result<DeleteOutcome, CablineError>;

    /// Distinct types among currently free vehicles, sorted.
    async fn available_car_types(&self) -> Result<Vec<String>, CablineError>;

    /// Per-km rate for a vehicle type: the pricing table first, then the
    /// cheapest vehicle of that type.
    async fn rate_for_type(&self, car_type: &str) -> Result<Option<f64>, CablineError>;

    async fn list_pricing(&self) -> Result<Vec<PricingRule>, CablineError>;

    async fn upsert_pricing(&self, rule: &PricingRule) -> Result<(), CablineError>;

    // --- Coupons and owners ---

    async fn get_coupon(&self, code: &str) -> Result<Option<Coupon>, CablineError>;

    async fn list_coupons(&self) -> Result<Vec<Coupon>, CablineError>;

    /// Inserts or replaces a code as unused.
    async fn add_coupon(&self, code: &str, discount: f64) -> Result<Coupon, CablineError>;

    async fn delete_coupon(&self, code: &str) -> Result<bool, CablineError>;

    async fn add_owner(&self, owner: &NewOwner) -> Result<Owner, CablineError>;

    async fn get_owner_by_email(&self, email: &str) -> Result<Option<Owner>, CablineError>;

    async fn list_owners(&self) -> Result<Vec<Owner>, CablineError>;

    async fn update_owner(
        &self,
        owner_id: i64,
        owner: &NewOwner,
    ) -> Result<Option<Owner>, CablineError>;

    async fn delete_owner(&self, owner_id: i64) -> Result<bool, CablineError>;

    /// Phones that receive operator alerts.
    async fn owner_phones(&self) -> Result<Vec<String>, CablineError>;

    // --- Rides ---

    /// Inserts an unassigned ride. A coupon on the ride is redeemed in the
    /// same write; a code that is unknown or already used fails with
    /// `Validation` and nothing is written.
    async fn create_ride(&self, ride: &NewRide) -> Result<Ride, CablineError>;

    async fn get_ride(&self, id: i64) -> Result<Option<Ride>, CablineError>;

    /// All rides, newest first, optionally filtered by status.
    async fn list_rides(&self, status: Option<RideStatus>) -> Result<Vec<Ride>, CablineError>;

    /// Active and waiting rides with no driver bound.
    async fn list_unassigned_rides(&self) -> Result<Vec<Ride>, CablineError>;

    /// Most recent rides booked by a phone, newest first.
    async fn rides_for_phone(&self, phone: &str, limit: u32) -> Result<Vec<Ride>, CablineError>;

    async fn latest_ride_for_phone(&self, phone: &str) -> Result<Option<Ride>, CablineError>;

    /// Returns `false` when the ride does not exist.
    async fn set_payment_status(
        &self,
        ride_id: i64,
        status: PaymentStatus,
    ) -> Result<bool, CablineError>;

    /// Prebooked rides with no driver whose start lies in `[from, until]`,
    /// earliest first.
    async fn prebooked_due(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Ride>, CablineError>;

    /// Compare-and-set a ride from `from` to `to`, stamping the milestone for
    /// `to` with `at`. When `driver_id` is given the ride must be bound to
    /// that driver. Moving to `Completed` marks the ride paid and frees its
    /// driver and vehicle in the same transaction.
    ///
    /// Returns `None` when the ride was not in the expected status.
    async fn advance_ride(
        &self,
        ride_id: i64,
        driver_id: Option<i64>,
        from: RideStatus,
        to: RideStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Ride>, CablineError>;

    /// Completes a ride from any active status and frees its resources.
    async fn complete_ride(
        &self,
        ride_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<Ride>, CablineError>;

    /// Cancels a ride that has not finished, freeing its driver and vehicle.
    /// `None` when the ride is missing or already completed or cancelled.
    async fn cancel_ride(&self, ride_id: i64) -> Result<Option<Ride>, CablineError>;

    /// Deletes a ride row, freeing its driver and vehicle if it was active.
    async fn delete_ride(&self, ride_id: i64) -> Result<Option<Ride>, CablineError>;

    /// Finished rides accept a payment status change only.
    async fn update_ride(
        &self,
        ride_id: i64,
        update: &RideUpdate,
    ) -> Result<Option<Ride>, CablineError>;

    // --- Assignment ---

    /// A free vehicle of `car_type` and a free driver allowed to drive it.
    /// The window is accepted for callers; exclusivity is status-based.
    async fn find_available(
        &self,
        car_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<(Driver, Vehicle)>, CablineError>;

    /// Inserts a ride already bound to a claimed driver and vehicle.
    /// Returns `None` and writes nothing when no pair could be claimed.
    async fn create_assigned_ride(
        &self,
        ride: &NewRide,
    ) -> Result<Option<AssignedRide>, CablineError>;

    /// Claims a pair for an existing unassigned ride of its requested type.
    async fn assign_ride(&self, ride_id: i64) -> Result<Option<AssignedRide>, CablineError>;

    async fn manual_assign(
        &self,
        ride_id: i64,
        driver_id: i64,
        car_id: i64,
    ) -> Result<ManualAssignOutcome, CablineError>;

    // --- Settings and stats ---

    async fn auto_assignment_enabled(&self) -> Result<bool, CablineError>;

    async fn set_auto_assignment(&self, enabled: bool) -> Result<(), CablineError>;

    async fn dashboard_stats(&self) -> Result<DashboardStats, CablineError>;

    /// Paid revenue per local week, month or year.
    async fn revenue_by_period(
        &self,
        period: RevenuePeriod,
        utc_offset: FixedOffset,
    ) -> Result<Vec<RevenuePoint>, CablineError>;
}
