// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain records shared by the state machine, assignment engine and storage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Every state a conversation can be in.
///
/// Stored as its snake_case name in the `chat_sessions.state` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    AwaitingIntent,
    AwaitingBookingDateOption,
    AwaitingSpecificDate,
    AwaitingBookingTime,
    AwaitingPickup,
    AwaitingDestination,
    AwaitingCarType,
    AwaitingConfirmation,
    AwaitingPaymentOption,
    RideConfirmed,
    AwaitingRegistrationName,
    AwaitingRegistrationEmail,
    AwaitingRegistrationPassword,
    AwaitingRegistrationOtp,
    AwaitingResetOtp,
    AwaitingNewPassword,
}

impl ConversationState {
    /// States that collect a specific piece of input and re-prompt for it.
    pub fn awaits_input(self) -> bool {
        !matches!(
            self,
            ConversationState::AwaitingIntent | ConversationState::RideConfirmed
        )
    }

    /// States belonging to the new-user registration sub-machine.
    pub fn is_registration(self) -> bool {
        matches!(
            self,
            ConversationState::AwaitingRegistrationName
                | ConversationState::AwaitingRegistrationEmail
                | ConversationState::AwaitingRegistrationPassword
                | ConversationState::AwaitingRegistrationOtp
        )
    }

    /// States belonging to the forgot-password sub-machine.
    pub fn is_password_reset(self) -> bool {
        matches!(
            self,
            ConversationState::AwaitingResetOtp | ConversationState::AwaitingNewPassword
        )
    }
}

/// How a confirmed booking obtained (or will obtain) its driver.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationType {
    ImmediateAssigned,
    ManualAssignment,
    FuturePrebooking,
}

/// Lifecycle of a ride row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    /// Scheduled for later, waiting for the sweep.
    Prebooked,
    /// Urgent but auto-assignment is off; waiting for an operator.
    Pending,
    Assigned,
    EnroutePickup,
    AtPickup,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    /// Statuses in which the ride holds its driver and vehicle busy.
    pub const ACTIVE: [RideStatus; 4] = [
        RideStatus::Assigned,
        RideStatus::EnroutePickup,
        RideStatus::AtPickup,
        RideStatus::InProgress,
    ];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Cash,
    Paid,
}

/// Availability of a driver or vehicle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Free,
    Busy,
}

/// Per-phone conversation record.
///
/// Optional fields are filled in by the transition that collects them and
/// are only read by later states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub phone: String,
    pub state: ConversationState,
    pub booking_date: Option<NaiveDate>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub pickup: Option<String>,
    pub destination: Option<String>,
    pub car_type: Option<String>,
    pub route_distance_km: Option<f64>,
    pub route_duration_minutes: Option<i64>,
    pub fare: Option<f64>,
    pub ride_id: Option<i64>,
    pub confirmation_type: Option<ConfirmationType>,
    pub assigned_driver: Option<i64>,
    pub assigned_car: Option<i64>,
    pub payment_reference: Option<String>,
    pub invoice_total: Option<f64>,
    /// Coupon accepted for the current quote, upper-cased.
    pub coupon_code: Option<String>,
    pub discount: Option<f64>,
    pub new_user_name: Option<String>,
    pub new_user_email: Option<String>,
    pub new_user_password_hash: Option<String>,
    pub otp: Option<String>,
    pub otp_timestamp: Option<DateTime<Utc>>,
    /// Wrong codes typed against the current OTP.
    pub otp_attempts: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationSession {
    /// A fresh session for a phone seen for the first time.
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            state: ConversationState::AwaitingIntent,
            booking_date: None,
            start_time: None,
            end_time: None,
            pickup: None,
            destination: None,
            car_type: None,
            route_distance_km: None,
            route_duration_minutes: None,
            fare: None,
            ride_id: None,
            confirmation_type: None,
            assigned_driver: None,
            assigned_car: None,
            payment_reference: None,
            invoice_total: None,
            coupon_code: None,
            discount: None,
            new_user_name: None,
            new_user_email: None,
            new_user_password_hash: None,
            otp: None,
            otp_timestamp: None,
            otp_attempts: 0,
            updated_at: None,
        }
    }

    /// Clears every booking field so a new cycle starts clean. Identity and
    /// registration scratch fields are kept.
    pub fn reset_booking(&mut self) {
        self.booking_date = None;
        self.start_time = None;
        self.end_time = None;
        self.pickup = None;
        self.destination = None;
        self.car_type = None;
        self.route_distance_km = None;
        self.route_duration_minutes = None;
        self.fare = None;
        self.ride_id = None;
        self.confirmation_type = None;
        self.assigned_driver = None;
        self.assigned_car = None;
        self.payment_reference = None;
        self.invoice_total = None;
        self.coupon_code = None;
        self.discount = None;
    }

    /// Clears OTP and registration scratch fields.
    pub fn clear_otp(&mut self) {
        self.otp = None;
        self.otp_timestamp = None;
        self.otp_attempts = 0;
        self.new_user_name = None;
        self.new_user_email = None;
        self.new_user_password_hash = None;
    }
}

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub phone: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub phone: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: i64,
    pub name: String,
    pub phone: String,
    /// Home vehicle, if any.
    pub car_id: Option<i64>,
    /// When set the driver may only ever drive `car_id`.
    pub is_fixed: bool,
    pub status: ResourceStatus,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDriver {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub car_id: Option<i64>,
    #[serde(default)]
    pub is_fixed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub plate_number: String,
    pub model: String,
    /// Category used for matching (sedan, suv, ...).
    pub car_type: String,
    pub rate_per_km: f64,
    pub status: ResourceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    pub plate_number: String,
    pub model: String,
    pub car_type: String,
    pub rate_per_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub vehicle_type: String,
    pub price_per_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    pub id: i64,
    pub customer_phone: String,
    pub pickup: String,
    pub destination: String,
    pub distance_km: f64,
    pub duration_minutes: i64,
    pub fare: f64,
    pub car_type: String,
    pub driver_id: Option<i64>,
    pub car_id: Option<i64>,
    pub status: RideStatus,
    pub payment_status: PaymentStatus,
    /// Coupon amount taken off the fare, never more than the fare.
    pub discount: f64,
    pub coupon_code: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub enroute_at: Option<DateTime<Utc>>,
    pub at_pickup_at: Option<DateTime<Utc>>,
    pub trip_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Values needed to insert a ride row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRide {
    pub customer_phone: String,
    pub pickup: String,
    pub destination: String,
    pub distance_km: f64,
    pub duration_minutes: i64,
    pub fare: f64,
    pub car_type: String,
    pub status: RideStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Redeemed in the same write that inserts the ride.
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Operator edit of a ride. Unset fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RideUpdate {
    pub pickup: Option<String>,
    pub destination: Option<String>,
    pub fare: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub payment_status: Option<PaymentStatus>,
}

impl RideUpdate {
    /// True when only the payment status is being changed.
    pub fn is_payment_only(&self) -> bool {
        self.pickup.is_none()
            && self.destination.is_none()
            && self.fare.is_none()
            && self.start_time.is_none()
    }
}

/// A flat-amount discount code, redeemable once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    /// Rupees taken off the fare.
    pub discount: f64,
    #[serde(default)]
    pub used: bool,
}

/// Fleet owner; receives operator alerts on their phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOwner {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// Bucket size for the revenue report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RevenuePeriod {
    Weekly,
    Monthly,
    Yearly,
}

/// Paid revenue for one bucket, e.g. `2026-41`, `2026-10` or `2026`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub period: String,
    pub revenue: f64,
}

/// What an operator delete did, or why it was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    /// The driver or vehicle is on an active ride.
    InUse,
    NotFound,
}

/// A ride together with the driver and vehicle bound to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedRide {
    pub ride: Ride,
    pub driver: Driver,
    pub vehicle: Vehicle,
}

/// Result of an operator-initiated assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum ManualAssignOutcome {
    Assigned(AssignedRide),
    /// The ride already has a driver; nothing changed.
    AlreadyAssigned,
    /// The driver is fixed to a different vehicle.
    DriverPermanentlyBound { bound_car_id: Option<i64> },
    DriverBusy,
    VehicleBusy,
    /// The ride is in a status that cannot take a driver.
    RideNotAssignable(RideStatus),
    NotFound(&'static str),
}

/// Counters shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub users: i64,
    pub rides: i64,
    pub completed_rides: i64,
    pub prebooked_rides: i64,
    pub drivers: i64,
    pub vehicles: i64,
    pub drivers_on_ride: i64,
    pub vehicles_on_ride: i64,
    pub revenue: f64,
    pub pending_payments: i64,
}
