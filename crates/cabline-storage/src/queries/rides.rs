// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ride rows and the driver-driven status transitions.

use cabline_core::CablineError;
use cabline_core::model::{NewRide, PaymentStatus, Ride, RideStatus, RideUpdate};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use super::{get_enum, get_opt_ts, get_ts, opt_ts, ts};
use crate::database::Database;

const RIDE_COLUMNS: &str = "id, customer_phone, pickup, destination, distance_km,
    duration_minutes, fare, car_type, driver_id, car_id, status, payment_status, start_time,
    end_time, enroute_at, at_pickup_at, trip_started_at, completed_at, created_at, discount,
    coupon_code";

fn ride_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ride> {
    Ok(Ride {
        id: row.get(0)?,
        customer_phone: row.get(1)?,
        pickup: row.get(2)?,
        destination: row.get(3)?,
        distance_km: row.get(4)?,
        duration_minutes: row.get(5)?,
        fare: row.get(6)?,
        car_type: row.get(7)?,
        driver_id: row.get(8)?,
        car_id: row.get(9)?,
        status: get_enum(row, 10)?,
        payment_status: get_enum(row, 11)?,
        start_time: get_ts(row, 12)?,
        end_time: get_opt_ts(row, 13)?,
        enroute_at: get_opt_ts(row, 14)?,
        at_pickup_at: get_opt_ts(row, 15)?,
        trip_started_at: get_opt_ts(row, 16)?,
        completed_at: get_opt_ts(row, 17)?,
        created_at: get_ts(row, 18)?,
        discount: row.get(19)?,
        coupon_code: row.get(20)?,
    })
}

pub(crate) fn load_ride(conn: &Connection, id: i64) -> rusqlite::Result<Option<Ride>> {
    conn.query_row(
        &format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id = ?1"),
        params![id],
        ride_from_row,
    )
    .optional()
}

fn query_rides(
    conn: &Connection,
    filter: &str,
    args: impl rusqlite::Params,
) -> rusqlite::Result<Vec<Ride>> {
    let mut stmt = conn.prepare(&format!("SELECT {RIDE_COLUMNS} FROM rides {filter}"))?;
    let rides = stmt
        .query_map(args, ride_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rides)
}

/// Marks an unused coupon as used and returns its discount capped at `fare`.
/// `None` when the code is unknown or already redeemed.
fn redeem_coupon(conn: &Connection, code: &str, fare: f64) -> rusqlite::Result<Option<f64>> {
    let discount: Option<f64> = conn
        .query_row(
            "SELECT discount FROM coupons WHERE code = ?1 AND used = 0",
            params![code],
            |row| row.get(0),
        )
        .optional()?;
    let Some(discount) = discount else {
        return Ok(None);
    };
    let claimed = super::coupons::claim(conn, code)?;
    Ok(claimed.then(|| discount.min(fare.max(0.0))))
}

/// Puts a coupon back when the ride that redeemed it never happened.
pub(crate) fn restore_coupon(conn: &Connection, ride: &Ride) -> rusqlite::Result<()> {
    if ride.status != RideStatus::Completed
        && let Some(code) = &ride.coupon_code
    {
        conn.execute("UPDATE coupons SET used = 0 WHERE code = ?1", params![code])?;
    }
    Ok(())
}

/// Why a ride insert wrote nothing.
#[derive(Debug)]
pub(crate) struct CouponUnavailable(pub String);

impl From<CouponUnavailable> for CablineError {
    fn from(e: CouponUnavailable) -> Self {
        CablineError::Validation(format!("coupon {} is no longer available", e.0))
    }
}

/// Inserts a ride row, optionally already bound to a driver and car, and
/// redeems its coupon. Nothing is written when the coupon is gone.
pub(crate) fn insert_ride(
    conn: &Connection,
    ride: &NewRide,
    binding: Option<(i64, i64)>,
) -> rusqlite::Result<Result<i64, CouponUnavailable>> {
    let coupon = ride
        .coupon_code
        .as_deref()
        .map(|code| code.trim().to_uppercase())
        .filter(|code| !code.is_empty());
    let discount = match &coupon {
        Some(code) => match redeem_coupon(conn, code, ride.fare)? {
            Some(discount) => discount,
            None => return Ok(Err(CouponUnavailable(code.clone()))),
        },
        None => 0.0,
    };
    let (driver_id, car_id) = binding.unzip();
    conn.execute(
        "INSERT INTO rides (customer_phone, pickup, destination, distance_km, duration_minutes,
            fare, car_type, driver_id, car_id, status, start_time, end_time, discount, coupon_code)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            ride.customer_phone,
            ride.pickup,
            ride.destination,
            ride.distance_km,
            ride.duration_minutes,
            ride.fare,
            ride.car_type.trim().to_lowercase(),
            driver_id,
            car_id,
            ride.status.as_ref(),
            ts(&ride.start_time),
            opt_ts(ride.end_time.as_ref()),
            discount,
            coupon,
        ],
    )?;
    Ok(Ok(conn.last_insert_rowid()))
}

/// Sets driver and car back to free.
pub(crate) fn release_resources(
    conn: &Connection,
    driver_id: Option<i64>,
    car_id: Option<i64>,
) -> rusqlite::Result<()> {
    if let Some(driver_id) = driver_id {
        conn.execute(
            "UPDATE drivers SET status = 'free' WHERE id = ?1",
            params![driver_id],
        )?;
    }
    if let Some(car_id) = car_id {
        conn.execute("UPDATE cars SET status = 'free' WHERE id = ?1", params![car_id])?;
    }
    Ok(())
}

/// Create a ride without a driver (prebooked or pending).
pub async fn create_ride(db: &Database, ride: &NewRide) -> Result<Ride, CablineError> {
    if ride.status.is_active() {
        return Err(CablineError::Validation(format!(
            "a ride cannot be created as {} without a driver",
            ride.status
        )));
    }
    let ride = ride.clone();
    let created = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let id = match insert_ride(&tx, &ride, None)? {
                Ok(id) => id,
                Err(unavailable) => return Ok(Err(unavailable)),
            };
            let created = load_ride(&tx, id)?;
            tx.commit()?;
            Ok(Ok(created))
        })
        .await
        .map_err(crate::database::map_tr_err)??;
    created.ok_or_else(|| CablineError::Internal("inserted ride not found".to_string()))
}

pub async fn get_ride(db: &Database, id: i64) -> Result<Option<Ride>, CablineError> {
    db.connection()
        .call(move |conn| load_ride(conn, id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// All rides, newest first, optionally filtered by status.
pub async fn list_rides(
    db: &Database,
    status: Option<RideStatus>,
) -> Result<Vec<Ride>, CablineError> {
    db.connection()
        .call(move |conn| match status {
            Some(status) => query_rides(
                conn,
                "WHERE status = ?1 ORDER BY id DESC",
                params![status.as_ref()],
            ),
            None => query_rides(conn, "ORDER BY id DESC", []),
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Prebooked and pending rides that still need a driver, earliest start first.
pub async fn list_unassigned_rides(db: &Database) -> Result<Vec<Ride>, CablineError> {
    db.connection()
        .call(|conn| {
            query_rides(
                conn,
                "WHERE driver_id IS NULL AND status IN ('prebooked', 'pending')
                 ORDER BY start_time, id",
                [],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn rides_for_phone(
    db: &Database,
    phone: &str,
    limit: u32,
) -> Result<Vec<Ride>, CablineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            query_rides(
                conn,
                "WHERE customer_phone = ?1 ORDER BY start_time DESC, id DESC LIMIT ?2",
                params![phone, limit],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The most recently booked ride for a phone.
pub async fn latest_ride_for_phone(
    db: &Database,
    phone: &str,
) -> Result<Option<Ride>, CablineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut rides = query_rides(
                conn,
                "WHERE customer_phone = ?1 ORDER BY id DESC LIMIT 1",
                params![phone],
            )?;
            Ok(rides.pop())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn set_payment_status(
    db: &Database,
    ride_id: i64,
    status: PaymentStatus,
) -> Result<bool, CablineError> {
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE rides SET payment_status = ?1 WHERE id = ?2",
                params![status.as_ref(), ride_id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(updated == 1)
}

/// Prebooked rides with no driver starting within `[from, until]`.
pub async fn prebooked_due(
    db: &Database,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<Ride>, CablineError> {
    let from = ts(&from);
    let until = ts(&until);
    db.connection()
        .call(move |conn| {
            query_rides(
                conn,
                "WHERE status = 'prebooked' AND driver_id IS NULL
                   AND start_time BETWEEN ?1 AND ?2
                 ORDER BY start_time, id",
                params![from, until],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn milestone_column(to: RideStatus) -> Option<&'static str> {
    match to {
        RideStatus::EnroutePickup => Some("enroute_at"),
        RideStatus::AtPickup => Some("at_pickup_at"),
        RideStatus::InProgress => Some("trip_started_at"),
        RideStatus::Completed => Some("completed_at"),
        _ => None,
    }
}

/// Compare-and-set a ride's status and stamp the milestone for the new status.
///
/// Completion also sets `end_time`, marks the ride paid and frees the driver
/// and car, all in one transaction.
pub async fn advance_ride(
    db: &Database,
    ride_id: i64,
    driver_id: Option<i64>,
    from: RideStatus,
    to: RideStatus,
    at: DateTime<Utc>,
) -> Result<Option<Ride>, CablineError> {
    let at = ts(&at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let mut sql = String::from("UPDATE rides SET status = ?1");
            if let Some(column) = milestone_column(to) {
                sql.push_str(&format!(", {column} = ?2"));
            }
            if to == RideStatus::Completed {
                sql.push_str(", end_time = ?2, payment_status = 'paid'");
            }
            sql.push_str(
                " WHERE id = ?3 AND status = ?4 AND (?5 IS NULL OR driver_id = ?5)",
            );

            let changed = tx.execute(
                &sql,
                params![to.as_ref(), at, ride_id, from.as_ref(), driver_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            let ride = load_ride(&tx, ride_id)?;
            if to == RideStatus::Completed
                && let Some(ride) = &ride
            {
                release_resources(&tx, ride.driver_id, ride.car_id)?;
            }
            tx.commit()?;
            Ok(ride)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Complete a ride from any active status, freeing its resources.
/// Payment status is left as recorded.
pub async fn complete_ride(
    db: &Database,
    ride_id: i64,
    at: DateTime<Utc>,
) -> Result<Option<Ride>, CablineError> {
    let at = ts(&at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let changed = tx.execute(
                "UPDATE rides SET status = 'completed', completed_at = ?1, end_time = ?1
                 WHERE id = ?2
                   AND status IN ('assigned', 'enroute_pickup', 'at_pickup', 'in_progress')",
                params![at, ride_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let ride = load_ride(&tx, ride_id)?;
            if let Some(ride) = &ride {
                release_resources(&tx, ride.driver_id, ride.car_id)?;
            }
            tx.commit()?;
            Ok(ride)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Cancels a ride that has not finished, freeing its driver and car and
/// returning its coupon. `None` when the ride is missing or already terminal.
pub async fn cancel_ride(db: &Database, ride_id: i64) -> Result<Option<Ride>, CablineError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(before) = load_ride(&tx, ride_id)? else {
                return Ok(None);
            };
            if before.status.is_terminal() {
                return Ok(None);
            }
            tx.execute(
                "UPDATE rides SET status = 'cancelled' WHERE id = ?1",
                params![ride_id],
            )?;
            if before.status.is_active() {
                release_resources(&tx, before.driver_id, before.car_id)?;
            }
            restore_coupon(&tx, &before)?;
            let ride = load_ride(&tx, ride_id)?;
            tx.commit()?;
            Ok(ride)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Removes a ride row. An active ride frees its driver and car first.
/// Returns the deleted ride.
pub async fn delete_ride(db: &Database, ride_id: i64) -> Result<Option<Ride>, CablineError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(ride) = load_ride(&tx, ride_id)? else {
                return Ok(None);
            };
            if ride.status.is_active() {
                release_resources(&tx, ride.driver_id, ride.car_id)?;
            }
            restore_coupon(&tx, &ride)?;
            tx.execute("DELETE FROM rides WHERE id = ?1", params![ride_id])?;
            tx.commit()?;
            Ok(Some(ride))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Applies an operator edit. Finished rides accept a payment status only.
pub async fn update_ride(
    db: &Database,
    ride_id: i64,
    update: &RideUpdate,
) -> Result<Option<Ride>, CablineError> {
    if let Some(fare) = update.fare
        && (!fare.is_finite() || fare < 0.0)
    {
        return Err(CablineError::Validation(format!("invalid fare {fare}")));
    }
    let update = update.clone();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(current) = load_ride(&tx, ride_id)? else {
                return Ok(Ok(None));
            };
            if current.status.is_terminal() && !update.is_payment_only() {
                return Ok(Err(current.status));
            }
            tx.execute(
                "UPDATE rides SET
                    pickup = COALESCE(?1, pickup),
                    destination = COALESCE(?2, destination),
                    fare = COALESCE(?3, fare),
                    start_time = COALESCE(?4, start_time),
                    payment_status = COALESCE(?5, payment_status)
                 WHERE id = ?6",
                params![
                    update.pickup,
                    update.destination,
                    update.fare,
                    opt_ts(update.start_time.as_ref()),
                    update.payment_status.map(|p| p.to_string()),
                    ride_id,
                ],
            )?;
            let ride = load_ride(&tx, ride_id)?;
            tx.commit()?;
            Ok(Ok(ride))
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    outcome.map_err(|status| {
        CablineError::Validation(format!(
            "ride {ride_id} is {status} and only its payment status can change"
        ))
    })
}
