// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver and vehicle claims.
//!
//! Every claim runs inside one IMMEDIATE transaction on the writer thread and
//! flips `status` from `free` to `busy` with a compare-and-set. A claim that
//! loses a race sees zero changed rows, rolls back, and reports nothing
//! available. The partial unique indexes on `rides` back this up.

use cabline_core::CablineError;
use cabline_core::model::{
    AssignedRide, Driver, ManualAssignOutcome, NewRide, ResourceStatus, RideStatus, Vehicle,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use super::fleet::{load_driver, load_vehicle};
use super::rides::{insert_ride, load_ride};
use crate::database::Database;

/// Picks a free vehicle of the type and a free driver allowed to drive it,
/// preferring the vehicle's home driver.
fn pick_pair(conn: &Connection, car_type: &str) -> rusqlite::Result<Option<(i64, i64)>> {
    conn.query_row(
        "SELECT d.id, c.id
         FROM cars c
         JOIN drivers d
           ON d.status = 'free' AND (d.is_fixed = 0 OR d.car_id = c.id)
         WHERE c.status = 'free' AND c.car_type = ?1
         ORDER BY COALESCE(d.car_id = c.id, 0) DESC, c.id, d.id
         LIMIT 1",
        params![car_type.trim().to_lowercase()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Flips both resources to busy. Returns `false` when either was no longer free.
fn mark_busy(conn: &Connection, driver_id: i64, car_id: i64) -> rusqlite::Result<bool> {
    let driver = conn.execute(
        "UPDATE drivers SET status = 'busy' WHERE id = ?1 AND status = 'free'",
        params![driver_id],
    )?;
    if driver != 1 {
        return Ok(false);
    }
    let car = conn.execute(
        "UPDATE cars SET status = 'busy' WHERE id = ?1 AND status = 'free'",
        params![car_id],
    )?;
    Ok(car == 1)
}

fn bind_ride(
    conn: &Connection,
    ride_id: i64,
    driver_id: i64,
    car_id: i64,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE rides SET driver_id = ?1, car_id = ?2, status = 'assigned'
         WHERE id = ?3 AND driver_id IS NULL AND status IN ('prebooked', 'pending')",
        params![driver_id, car_id, ride_id],
    )?;
    Ok(changed == 1)
}

fn assembled(
    conn: &Connection,
    ride_id: i64,
    driver_id: i64,
    car_id: i64,
) -> rusqlite::Result<Option<AssignedRide>> {
    let ride = load_ride(conn, ride_id)?;
    let driver = load_driver(conn, driver_id)?;
    let vehicle = load_vehicle(conn, car_id)?;
    Ok(match (ride, driver, vehicle) {
        (Some(ride), Some(driver), Some(vehicle)) => Some(AssignedRide {
            ride,
            driver,
            vehicle,
        }),
        _ => None,
    })
}

/// Read-only availability check. The window is accepted but exclusivity is
/// decided by current status alone.
pub async fn find_available(
    db: &Database,
    car_type: &str,
    _start: DateTime<Utc>,
    _end: DateTime<Utc>,
) -> Result<Option<(Driver, Vehicle)>, CablineError> {
    let car_type = car_type.to_string();
    db.connection()
        .call(move |conn| {
            let Some((driver_id, car_id)) = pick_pair(conn, &car_type)? else {
                return Ok(None);
            };
            let driver = load_driver(conn, driver_id)?;
            let vehicle = load_vehicle(conn, car_id)?;
            Ok(driver.zip(vehicle))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claims a pair and inserts the ride bound to it, or writes nothing.
pub async fn create_assigned_ride(
    db: &Database,
    ride: &NewRide,
) -> Result<Option<AssignedRide>, CablineError> {
    let mut ride = ride.clone();
    ride.status = RideStatus::Assigned;
    let claimed = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some((driver_id, car_id)) = pick_pair(&tx, &ride.car_type)? else {
                return Ok(Ok(None));
            };
            if !mark_busy(&tx, driver_id, car_id)? {
                return Ok(Ok(None));
            }
            let ride_id = match insert_ride(&tx, &ride, Some((driver_id, car_id)))? {
                Ok(id) => id,
                Err(unavailable) => return Ok(Err(unavailable)),
            };
            let result = assembled(&tx, ride_id, driver_id, car_id)?;
            tx.commit()?;
            Ok(Ok(result))
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    claimed.map_err(Into::into)
}

/// Claims a pair for an existing prebooked or pending ride.
pub async fn assign_ride(
    db: &Database,
    ride_id: i64,
) -> Result<Option<AssignedRide>, CablineError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(ride) = load_ride(&tx, ride_id)? else {
                return Ok(None);
            };
            if ride.driver_id.is_some()
                || !matches!(ride.status, RideStatus::Prebooked | RideStatus::Pending)
            {
                return Ok(None);
            }
            let Some((driver_id, car_id)) = pick_pair(&tx, &ride.car_type)? else {
                return Ok(None);
            };
            if !mark_busy(&tx, driver_id, car_id)? || !bind_ride(&tx, ride_id, driver_id, car_id)? {
                return Ok(None);
            }
            let result = assembled(&tx, ride_id, driver_id, car_id)?;
            tx.commit()?;
            Ok(result)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Operator-chosen driver and vehicle for a ride.
pub async fn manual_assign(
    db: &Database,
    ride_id: i64,
    driver_id: i64,
    car_id: i64,
) -> Result<ManualAssignOutcome, CablineError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(ride) = load_ride(&tx, ride_id)? else {
                return Ok(ManualAssignOutcome::NotFound("ride"));
            };
            if ride.driver_id.is_some() {
                return Ok(ManualAssignOutcome::AlreadyAssigned);
            }
            if !matches!(ride.status, RideStatus::Prebooked | RideStatus::Pending) {
                return Ok(ManualAssignOutcome::RideNotAssignable(ride.status));
            }
            let Some(driver) = load_driver(&tx, driver_id)? else {
                return Ok(ManualAssignOutcome::NotFound("driver"));
            };
            if driver.is_fixed && driver.car_id != Some(car_id) {
                return Ok(ManualAssignOutcome::DriverPermanentlyBound {
                    bound_car_id: driver.car_id,
                });
            }
            let Some(vehicle) = load_vehicle(&tx, car_id)? else {
                return Ok(ManualAssignOutcome::NotFound("vehicle"));
            };
            if driver.status != ResourceStatus::Free {
                return Ok(ManualAssignOutcome::DriverBusy);
            }
            if vehicle.status != ResourceStatus::Free {
                return Ok(ManualAssignOutcome::VehicleBusy);
            }
            if !mark_busy(&tx, driver_id, car_id)? || !bind_ride(&tx, ride_id, driver_id, car_id)? {
                return Ok(ManualAssignOutcome::AlreadyAssigned);
            }
            let result = assembled(&tx, ride_id, driver_id, car_id)?;
            tx.commit()?;
            Ok(match result {
                Some(assigned) => ManualAssignOutcome::Assigned(assigned),
                None => ManualAssignOutcome::NotFound("ride"),
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}
