// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dashboard counters and the revenue report.
//!
//! Revenue is the fare less any coupon discount, over rides marked paid.

use cabline_core::CablineError;
use cabline_core::model::{DashboardStats, RevenuePeriod, RevenuePoint};
use chrono::FixedOffset;
use rusqlite::params;

use crate::database::Database;

pub async fn dashboard_stats(db: &Database) -> Result<DashboardStats, CablineError> {
    db.connection()
        .call(|conn| {
            let count = |sql: &str| conn.query_row(sql, [], |row| row.get::<_, i64>(0));
            Ok(DashboardStats {
                users: count("SELECT COUNT(*) FROM users")?,
                rides: count("SELECT COUNT(*) FROM rides")?,
                completed_rides: count("SELECT COUNT(*) FROM rides WHERE status = 'completed'")?,
                prebooked_rides: count("SELECT COUNT(*) FROM rides WHERE status = 'prebooked'")?,
                drivers: count("SELECT COUNT(*) FROM drivers")?,
                vehicles: count("SELECT COUNT(*) FROM cars")?,
                drivers_on_ride: count("SELECT COUNT(*) FROM drivers WHERE status = 'busy'")?,
                vehicles_on_ride: count("SELECT COUNT(*) FROM cars WHERE status = 'busy'")?,
                revenue: conn.query_row(
                    "SELECT COALESCE(SUM(fare - discount), 0.0) FROM rides
                     WHERE payment_status = 'paid'",
                    [],
                    |row| row.get(0),
                )?,
                pending_payments: count(
                    "SELECT COUNT(*) FROM rides WHERE payment_status = 'pending'
                     AND status != 'cancelled'",
                )?,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn bucket_format(period: RevenuePeriod) -> &'static str {
    match period {
        RevenuePeriod::Weekly => "%Y-%W",
        RevenuePeriod::Monthly => "%Y-%m",
        RevenuePeriod::Yearly => "%Y",
    }
}

/// Paid revenue grouped by local week, month or year, oldest first.
pub async fn revenue_by_period(
    db: &Database,
    period: RevenuePeriod,
    utc_offset: FixedOffset,
) -> Result<Vec<RevenuePoint>, CablineError> {
    let format = bucket_format(period);
    let shift = format!("{:+} seconds", utc_offset.local_minus_utc());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT strftime(?1, start_time, ?2) AS bucket,
                        SUM(fare - discount)
                 FROM rides
                 WHERE payment_status = 'paid'
                 GROUP BY bucket
                 ORDER BY bucket",
            )?;
            let points = stmt
                .query_map(params![format, shift], |row| {
                    Ok(RevenuePoint {
                        period: row.get(0)?,
                        revenue: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(points)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn empty_database_has_zero_stats() {
        let (db, _dir) = setup_db().await;
        let stats = dashboard_stats(&db).await.unwrap();
        assert_eq!(stats, DashboardStats::default());
    }

    #[tokio::test]
    async fn revenue_sums_paid_fares_only() {
        let (db, _dir) = setup_db().await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "INSERT INTO rides (customer_phone, pickup, destination, distance_km,
                        duration_minutes, fare, car_type, status, payment_status, start_time)
                     VALUES ('1', 'a', 'b', 10, 25, 120.0, 'sedan', 'completed', 'paid', '2026-10-17T10:00:00Z'),
                            ('2', 'a', 'b', 5, 15, 60.0, 'sedan', 'prebooked', 'pending', '2026-10-17T11:00:00Z'),
                            ('3', 'a', 'b', 2, 5, 24.0, 'sedan', 'prebooked', 'cash', '2026-10-17T12:00:00Z');",
                )
            })
            .await
            .unwrap();

        let stats = dashboard_stats(&db).await.unwrap();
        assert_eq!(stats.rides, 3);
        assert_eq!(stats.completed_rides, 1);
        assert_eq!(stats.prebooked_rides, 2);
        assert_eq!(stats.revenue, 120.0);
        assert_eq!(stats.pending_payments, 1);
    }

    #[tokio::test]
    async fn revenue_groups_by_local_period() {
        let (db, _dir) = setup_db().await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "INSERT INTO rides (customer_phone, pickup, destination, distance_km,
                        duration_minutes, fare, car_type, status, payment_status, discount, start_time)
                     VALUES ('1', 'a', 'b', 10, 25, 120.0, 'sedan', 'completed', 'paid', 20.0, '2026-10-17T10:00:00Z'),
                            ('2', 'a', 'b', 5, 15, 60.0, 'sedan', 'completed', 'paid', 0, '2026-10-31T20:00:00Z'),
                            ('3', 'a', 'b', 5, 15, 50.0, 'sedan', 'completed', 'paid', 0, '2025-12-02T08:00:00Z'),
                            ('4', 'a', 'b', 5, 15, 99.0, 'sedan', 'prebooked', 'pending', 0, '2026-10-18T08:00:00Z');",
                )
            })
            .await
            .unwrap();
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();

        let monthly = revenue_by_period(&db, RevenuePeriod::Monthly, ist).await.unwrap();
        assert_eq!(
            monthly,
            vec![
                RevenuePoint { period: "2025-12".into(), revenue: 50.0 },
                RevenuePoint { period: "2026-10".into(), revenue: 100.0 },
                RevenuePoint { period: "2026-11".into(), revenue: 60.0 },
            ]
        );

        let yearly = revenue_by_period(&db, RevenuePeriod::Yearly, ist).await.unwrap();
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[1].revenue, 160.0);

        let weekly = revenue_by_period(&db, RevenuePeriod::Weekly, ist).await.unwrap();
        assert_eq!(weekly.len(), 3);
        assert_eq!(weekly[1].period, "2026-41");

        let stats = dashboard_stats(&db).await.unwrap();
        assert_eq!(stats.revenue, 210.0);
    }
}
