// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin REST API: fleet, pricing, coupons, owners, rides, assignment and
//! reports.
//!
//! All routes sit behind the bearer-token middleware and speak JSON.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cabline_booking::Outbound;
use cabline_booking::credentials;
use cabline_booking::reply::deliver_all;
use cabline_core::model::{
    AssignedRide, Coupon, DashboardStats, DeleteOutcome, Driver, ManualAssignOutcome, NewDriver,
    NewOwner, NewVehicle, Owner, PricingRule, RevenuePeriod, RevenuePoint, Ride, RideStatus,
    RideUpdate, Vehicle,
};
use cabline_core::{CablineError, Invoice, normalize_phone};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::server::GatewayState;

/// GET /admin/stats
pub async fn get_stats(State(state): State<GatewayState>) -> ApiResult<Json<DashboardStats>> {
    let stats = state.engine.services().storage.dashboard_stats().await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct RidesQuery {
    /// Optional status filter, e.g. `prebooked` or `in_progress`.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    /// `weekly`, `monthly` or `yearly`; monthly when omitted.
    pub period: Option<String>,
}

/// GET /admin/revenue
///
/// Buckets are local calendar periods of the service timezone.
pub async fn get_revenue(
    State(state): State<GatewayState>,
    Query(query): Query<RevenueQuery>,
) -> ApiResult<Json<Vec<RevenuePoint>>> {
    let period = match query.period.as_deref() {
        None => RevenuePeriod::Monthly,
        Some(p) => RevenuePeriod::from_str(p)
            .map_err(|_| ApiError::BadRequest(format!("unknown revenue period '{p}'")))?,
    };
    let offset = state.engine.settings().utc_offset;
    let points = state
        .engine
        .services()
        .storage
        .revenue_by_period(period, offset)
        .await?;
    Ok(Json(points))
}

/// GET /admin/rides
pub async fn list_rides(
    State(state): State<GatewayState>,
    Query(query): Query<RidesQuery>,
) -> ApiResult<Json<Vec<Ride>>> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            RideStatus::from_str(s)
                .map_err(|_| ApiError::BadRequest(format!("unknown ride status '{s}'")))
        })
        .transpose()?;
    let rides = state.engine.services().storage.list_rides(status).await?;
    Ok(Json(rides))
}

/// GET /admin/rides/unassigned
pub async fn list_unassigned(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Ride>>> {
    let rides = state.engine.services().storage.list_unassigned_rides().await?;
    Ok(Json(rides))
}

async fn load_ride(state: &GatewayState, id: i64) -> ApiResult<Ride> {
    state
        .engine
        .services()
        .storage
        .get_ride(id)
        .await?
        .ok_or_else(|| ApiError::not_found("ride", id))
}

/// GET /admin/rides/{id}
pub async fn get_ride(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Ride>> {
    Ok(Json(load_ride(&state, id).await?))
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub ride_id: i64,
    pub customer_phone: String,
    pub payment_status: String,
    pub subtotal: f64,
    pub discount: f64,
    pub coupon_code: Option<String>,
    pub tax_rate_percent: f64,
    pub tax: f64,
    pub total: f64,
}

/// GET /admin/rides/{id}/invoice
///
/// Uses the same arithmetic as the chat summary, so both show the same total.
pub async fn get_invoice(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<InvoiceResponse>> {
    let ride = load_ride(&state, id).await?;
    let tax_rate = state.engine.settings().tax_rate_percent;
    let invoice = Invoice::with_discount(ride.fare, ride.discount, tax_rate);
    Ok(Json(InvoiceResponse {
        ride_id: ride.id,
        customer_phone: ride.customer_phone,
        payment_status: ride.payment_status.to_string(),
        subtotal: invoice.fare,
        discount: invoice.discount,
        coupon_code: ride.coupon_code,
        tax_rate_percent: invoice.tax_rate_percent,
        tax: invoice.tax,
        total: invoice.total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub driver_id: i64,
    pub car_id: i64,
}

/// POST /admin/rides/{id}/assign
///
/// A repeated request for an already assigned ride answers 409 and sends
/// nothing.
pub async fn assign_ride(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<Json<AssignedRide>> {
    let outcome = state
        .engine
        .assignment()
        .manual_assign(id, request.driver_id, request.car_id)
        .await?;
    match outcome {
        ManualAssignOutcome::Assigned(assigned) => Ok(Json(assigned)),
        ManualAssignOutcome::AlreadyAssigned => Err(ApiError::Conflict(format!(
            "ride {id} already has a driver"
        ))),
        ManualAssignOutcome::DriverPermanentlyBound { bound_car_id } => {
            Err(ApiError::Conflict(match bound_car_id {
                Some(car) => format!("driver {} can only drive vehicle {car}", request.driver_id),
                None => format!("driver {} is fixed but has no vehicle", request.driver_id),
            }))
        }
        ManualAssignOutcome::DriverBusy => Err(ApiError::Conflict(format!(
            "driver {} is on another ride",
            request.driver_id
        ))),
        ManualAssignOutcome::VehicleBusy => Err(ApiError::Conflict(format!(
            "vehicle {} is on another ride",
            request.car_id
        ))),
        ManualAssignOutcome::RideNotAssignable(status) => Err(ApiError::Conflict(format!(
            "ride {id} is {status} and cannot take a driver"
        ))),
        ManualAssignOutcome::NotFound(entity) => Err(ApiError::not_found(
            entity,
            match entity {
                "driver" => request.driver_id,
                "vehicle" => request.car_id,
                _ => id,
            },
        )),
    }
}

/// POST /admin/rides/{id}/complete
pub async fn complete_ride(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Ride>> {
    if let Some(ride) = state.engine.assignment().complete(id).await? {
        return Ok(Json(ride));
    }
    let ride = load_ride(&state, id).await?;
    Err(ApiError::Conflict(format!(
        "ride {id} is {} and cannot be completed",
        ride.status
    )))
}

/// POST /admin/rides/{id}/cancel
///
/// Frees the driver and vehicle of an active ride and tells the customer
/// and driver. Completed or already cancelled rides answer 409.
pub async fn cancel_ride(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Ride>> {
    if let Some(ride) = state.engine.assignment().cancel(id).await? {
        return Ok(Json(ride));
    }
    let ride = load_ride(&state, id).await?;
    Err(ApiError::Conflict(format!(
        "ride {id} is {} and cannot be cancelled",
        ride.status
    )))
}

/// PUT /admin/rides/{id}
///
/// Finished rides only take a payment status change.
pub async fn update_ride(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(mut update): Json<RideUpdate>,
) -> ApiResult<Json<Ride>> {
    for field in [&mut update.pickup, &mut update.destination] {
        if let Some(value) = field.as_mut() {
            *value = value.trim().to_string();
            if value.is_empty() {
                return Err(ApiError::BadRequest("locations must not be empty".into()));
            }
        }
    }
    if let Some(fare) = update.fare
        && (!fare.is_finite() || fare < 0.0)
    {
        return Err(ApiError::BadRequest(format!("invalid fare {fare}")));
    }
    let storage = &state.engine.services().storage;
    match storage.update_ride(id, &update).await {
        Ok(Some(ride)) => {
            info!(ride_id = id, "ride edited");
            Ok(Json(ride))
        }
        Ok(None) => Err(ApiError::not_found("ride", id)),
        // The input is checked above, so a refusal here comes from the ride's state.
        Err(CablineError::Validation(message)) => Err(ApiError::Conflict(message)),
        Err(e) => Err(e.into()),
    }
}

/// DELETE /admin/rides/{id}
pub async fn delete_ride(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    match state.engine.services().storage.delete_ride(id).await? {
        Some(ride) => {
            info!(ride_id = id, status = %ride.status, "ride deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::not_found("ride", id)),
    }
}

fn deleted(entity: &'static str, id: i64, outcome: DeleteOutcome) -> ApiResult<StatusCode> {
    match outcome {
        DeleteOutcome::Deleted => {
            info!(entity, id, "deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        DeleteOutcome::InUse => Err(ApiError::Conflict(format!(
            "{entity} {id} is on an active ride"
        ))),
        DeleteOutcome::NotFound => Err(ApiError::not_found(entity, id)),
    }
}

/// GET /admin/drivers
pub async fn list_drivers(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Driver>>> {
    Ok(Json(state.engine.services().storage.list_drivers().await?))
}

fn check_driver(driver: &mut NewDriver) -> ApiResult<()> {
    driver.phone = normalize_phone(&driver.phone);
    if driver.name.trim().is_empty() || driver.phone.is_empty() {
        return Err(ApiError::BadRequest("name and phone are required".into()));
    }
    Ok(())
}

/// POST /admin/drivers
pub async fn create_driver(
    State(state): State<GatewayState>,
    Json(mut driver): Json<NewDriver>,
) -> ApiResult<(StatusCode, Json<Driver>)> {
    check_driver(&mut driver)?;
    let created = state.engine.services().storage.create_driver(&driver).await?;
    info!(driver_id = created.id, "driver created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /admin/drivers/{id}
pub async fn update_driver(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(mut driver): Json<NewDriver>,
) -> ApiResult<Json<Driver>> {
    check_driver(&mut driver)?;
    let updated = state.engine.services().storage.update_driver(id, &driver).await?;
    let updated = updated.ok_or_else(|| ApiError::not_found("driver", id))?;
    info!(driver_id = id, "driver updated");
    Ok(Json(updated))
}

/// DELETE /admin/drivers/{id}
pub async fn delete_driver(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let outcome = state.engine.services().storage.delete_driver(id).await?;
    deleted("driver", id, outcome)
}

#[derive(Debug, Deserialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

/// PUT /admin/drivers/{id}/location
pub async fn update_location(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(location): Json<LocationUpdate>,
) -> ApiResult<StatusCode> {
    if !(-90.0..=90.0).contains(&location.latitude)
        || !(-180.0..=180.0).contains(&location.longitude)
    {
        return Err(ApiError::BadRequest("coordinates out of range".into()));
    }
    state
        .engine
        .services()
        .storage
        .update_driver_location(id, location.latitude, location.longitude)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/vehicles
pub async fn list_vehicles(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Vehicle>>> {
    Ok(Json(state.engine.services().storage.list_vehicles().await?))
}

/// POST /admin/vehicles
pub async fn create_vehicle(
    State(state): State<GatewayState>,
    Json(vehicle): Json<NewVehicle>,
) -> ApiResult<(StatusCode, Json<Vehicle>)> {
    let created = state.engine.services().storage.create_vehicle(&vehicle).await?;
    info!(car_id = created.id, car_type = %created.car_type, "vehicle created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /admin/vehicles/{id}
pub async fn update_vehicle(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(vehicle): Json<NewVehicle>,
) -> ApiResult<Json<Vehicle>> {
    let updated = state.engine.services().storage.update_vehicle(id, &vehicle).await?;
    let updated = updated.ok_or_else(|| ApiError::not_found("vehicle", id))?;
    info!(car_id = id, "vehicle updated");
    Ok(Json(updated))
}

/// DELETE /admin/vehicles/{id}
///
/// Drivers bound to the vehicle become free-floating.
pub async fn delete_vehicle(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let outcome = state.engine.services().storage.delete_vehicle(id).await?;
    deleted("vehicle", id, outcome)
}

/// GET /admin/pricing
pub async fn list_pricing(State(state): State<GatewayState>) -> ApiResult<Json<Vec<PricingRule>>> {
    Ok(Json(state.engine.services().storage.list_pricing().await?))
}

/// PUT /admin/pricing
pub async fn upsert_pricing(
    State(state): State<GatewayState>,
    Json(rule): Json<PricingRule>,
) -> ApiResult<Json<PricingRule>> {
    state.engine.services().storage.upsert_pricing(&rule).await?;
    info!(vehicle_type = %rule.vehicle_type, price_per_km = rule.price_per_km, "pricing updated");
    Ok(Json(rule))
}

/// GET /admin/coupons
pub async fn list_coupons(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Coupon>>> {
    Ok(Json(state.engine.services().storage.list_coupons().await?))
}

#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    pub code: String,
    pub discount: f64,
}

/// POST /admin/coupons
///
/// Re-adding an existing code replaces its discount and makes it usable
/// again.
pub async fn add_coupon(
    State(state): State<GatewayState>,
    Json(request): Json<CouponRequest>,
) -> ApiResult<(StatusCode, Json<Coupon>)> {
    let storage = &state.engine.services().storage;
    let coupon = storage.add_coupon(&request.code, request.discount).await?;
    info!(code = %coupon.code, discount = coupon.discount, "coupon saved");
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// DELETE /admin/coupons/{code}
pub async fn delete_coupon(
    State(state): State<GatewayState>,
    Path(code): Path<String>,
) -> ApiResult<StatusCode> {
    if state.engine.services().storage.delete_coupon(&code).await? {
        info!(%code, "coupon deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("coupon", code))
    }
}

/// GET /admin/owners
pub async fn list_owners(State(state): State<GatewayState>) -> ApiResult<Json<Vec<Owner>>> {
    Ok(Json(state.engine.services().storage.list_owners().await?))
}

#[derive(Debug, Deserialize)]
pub struct OwnerRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl OwnerRequest {
    /// Validates the fields and hashes the password off the async workers.
    async fn into_new_owner(self) -> ApiResult<NewOwner> {
        let phone = normalize_phone(&self.phone);
        if self.name.trim().is_empty() || phone.is_empty() {
            return Err(ApiError::BadRequest("name and phone are required".into()));
        }
        if !credentials::looks_like_email(&self.email) {
            return Err(ApiError::BadRequest(format!("invalid email '{}'", self.email)));
        }
        if self.password.chars().count() < credentials::MIN_PASSWORD_LEN {
            return Err(ApiError::BadRequest(format!(
                "password must be at least {} characters",
                credentials::MIN_PASSWORD_LEN
            )));
        }
        let password = self.password;
        let password_hash =
            tokio::task::spawn_blocking(move || credentials::hash_password(&password))
                .await
                .map_err(|e| CablineError::Internal(format!("password hashing failed: {e}")))??;
        Ok(NewOwner {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone,
            password_hash,
        })
    }
}

/// POST /admin/owners
pub async fn add_owner(
    State(state): State<GatewayState>,
    Json(request): Json<OwnerRequest>,
) -> ApiResult<(StatusCode, Json<Owner>)> {
    let owner = request.into_new_owner().await?;
    let created = state.engine.services().storage.add_owner(&owner).await?;
    info!(owner_id = created.id, "owner added");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /admin/owners/{id}
pub async fn update_owner(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(request): Json<OwnerRequest>,
) -> ApiResult<Json<Owner>> {
    let owner = request.into_new_owner().await?;
    let updated = state.engine.services().storage.update_owner(id, &owner).await?;
    let updated = updated.ok_or_else(|| ApiError::not_found("owner", id))?;
    info!(owner_id = id, "owner updated");
    Ok(Json(updated))
}

/// DELETE /admin/owners/{id}
pub async fn delete_owner(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.engine.services().storage.delete_owner(id).await? {
        info!(owner_id = id, "owner deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("owner", id))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutoAssignment {
    pub enabled: bool,
}

/// GET /admin/settings/auto-assignment
pub async fn get_auto_assignment(
    State(state): State<GatewayState>,
) -> ApiResult<Json<AutoAssignment>> {
    let enabled = state
        .engine
        .services()
        .storage
        .auto_assignment_enabled()
        .await?;
    Ok(Json(AutoAssignment { enabled }))
}

/// PUT /admin/settings/auto-assignment
pub async fn set_auto_assignment(
    State(state): State<GatewayState>,
    Json(setting): Json<AutoAssignment>,
) -> ApiResult<Json<AutoAssignment>> {
    state
        .engine
        .services()
        .storage
        .set_auto_assignment(setting.enabled)
        .await?;
    info!(enabled = setting.enabled, "auto-assignment toggled");
    Ok(Json(setting))
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub sent: usize,
}

/// POST /admin/broadcast
///
/// Sends the text to every registered customer. Individual failures are
/// counted, not fatal.
pub async fn broadcast(
    State(state): State<GatewayState>,
    Json(request): Json<BroadcastRequest>,
) -> ApiResult<Json<BroadcastReport>> {
    let text = request.message.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }
    let services = state.engine.services();
    let phones = services.storage.list_user_phones().await?;
    let messages: Vec<Outbound> = phones.iter().map(|p| Outbound::text(p, text)).collect();
    let sent = deliver_all(
        services.notifier.as_ref(),
        &messages,
        state.engine.settings().external_timeout,
    )
    .await;
    info!(recipients = phones.len(), sent, "broadcast delivered");
    Ok(Json(BroadcastReport {
        recipients: phones.len(),
        sent,
    }))
}
