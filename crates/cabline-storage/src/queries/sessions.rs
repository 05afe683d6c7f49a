// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session persistence, one row per phone.

use cabline_core::CablineError;
use cabline_core::model::ConversationSession;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::{get_enum, get_opt_date, get_opt_enum, get_opt_ts, opt_ts, ts};
use crate::database::Database;

const SESSION_COLUMNS: &str = "phone, state, booking_date, start_time, end_time, pickup,
    destination, car_type, route_distance_km, route_duration_minutes, fare, ride_id,
    confirmation_type, assigned_driver, assigned_car, payment_reference, invoice_total,
    coupon_code, discount, new_user_name, new_user_email, new_user_password_hash, otp,
    otp_timestamp, otp_attempts, updated_at";

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationSession> {
    Ok(ConversationSession {
        phone: row.get(0)?,
        state: get_enum(row, 1)?,
        booking_date: get_opt_date(row, 2)?,
        start_time: get_opt_ts(row, 3)?,
        end_time: get_opt_ts(row, 4)?,
        pickup: row.get(5)?,
        destination: row.get(6)?,
        car_type: row.get(7)?,
        route_distance_km: row.get(8)?,
        route_duration_minutes: row.get(9)?,
        fare: row.get(10)?,
        ride_id: row.get(11)?,
        confirmation_type: get_opt_enum(row, 12)?,
        assigned_driver: row.get(13)?,
        assigned_car: row.get(14)?,
        payment_reference: row.get(15)?,
        invoice_total: row.get(16)?,
        coupon_code: row.get(17)?,
        discount: row.get(18)?,
        new_user_name: row.get(19)?,
        new_user_email: row.get(20)?,
        new_user_password_hash: row.get(21)?,
        otp: row.get(22)?,
        otp_timestamp: get_opt_ts(row, 23)?,
        otp_attempts: row.get(24)?,
        updated_at: get_opt_ts(row, 25)?,
    })
}

/// Get the session for a phone.
pub async fn get_session(
    db: &Database,
    phone: &str,
) -> Result<Option<ConversationSession>, CablineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE phone = ?1"),
                params![phone],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or overwrite the session, stamping `updated_at`.
pub async fn save_session(
    db: &Database,
    session: &ConversationSession,
) -> Result<(), CablineError> {
    let s = session.clone();
    let updated_at = ts(&Utc::now());
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO chat_sessions ({SESSION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                             ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)
                     ON CONFLICT(phone) DO UPDATE SET
                        state = excluded.state,
                        booking_date = excluded.booking_date,
                        start_time = excluded.start_time,
                        end_time = excluded.end_time,
                        pickup = excluded.pickup,
                        destination = excluded.destination,
                        car_type = excluded.car_type,
                        route_distance_km = excluded.route_distance_km,
                        route_duration_minutes = excluded.route_duration_minutes,
                        fare = excluded.fare,
                        ride_id = excluded.ride_id,
                        confirmation_type = excluded.confirmation_type,
                        assigned_driver = excluded.assigned_driver,
                        assigned_car = excluded.assigned_car,
                        payment_reference = excluded.payment_reference,
                        invoice_total = excluded.invoice_total,
                        coupon_code = excluded.coupon_code,
                        discount = excluded.discount,
                        new_user_name = excluded.new_user_name,
                        new_user_email = excluded.new_user_email,
                        new_user_password_hash = excluded.new_user_password_hash,
                        otp = excluded.otp,
                        otp_timestamp = excluded.otp_timestamp,
                        otp_attempts = excluded.otp_attempts,
                        updated_at = excluded.updated_at"
                ),
                params![
                    s.phone,
                    s.state.as_ref(),
                    s.booking_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    opt_ts(s.start_time.as_ref()),
                    opt_ts(s.end_time.as_ref()),
                    s.pickup,
                    s.destination,
                    s.car_type,
                    s.route_distance_km,
                    s.route_duration_minutes,
                    s.fare,
                    s.ride_id,
                    s.confirmation_type.map(|c| c.to_string()),
                    s.assigned_driver,
                    s.assigned_car,
                    s.payment_reference,
                    s.invoice_total,
                    s.coupon_code,
                    s.discount,
                    s.new_user_name,
                    s.new_user_email,
                    s.new_user_password_hash,
                    s.otp,
                    opt_ts(s.otp_timestamp.as_ref()),
                    s.otp_attempts,
                    updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
