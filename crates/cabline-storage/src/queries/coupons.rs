// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discount codes. Codes are stored upper-cased; redemption happens in
//! [`super::rides`] together with the ride insert.

use cabline_core::CablineError;
use cabline_core::model::Coupon;
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::Database;

fn coupon_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Coupon> {
    Ok(Coupon {
        code: row.get(0)?,
        discount: row.get(1)?,
        used: row.get(2)?,
    })
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

pub async fn get_coupon(db: &Database, code: &str) -> Result<Option<Coupon>, CablineError> {
    let code = normalize(code);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT code, discount, used FROM coupons WHERE code = ?1",
                params![code],
                coupon_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_coupons(db: &Database) -> Result<Vec<Coupon>, CablineError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT code, discount, used FROM coupons ORDER BY code")?;
            let coupons = stmt
                .query_map([], coupon_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(coupons)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace a code, resetting it to unused.
pub async fn add_coupon(db: &Database, code: &str, discount: f64) -> Result<Coupon, CablineError> {
    let code = normalize(code);
    if code.is_empty() || code.contains(char::is_whitespace) {
        return Err(CablineError::Validation(format!("invalid coupon code '{code}'")));
    }
    if !discount.is_finite() || discount < 0.0 {
        return Err(CablineError::Validation(
            "discount must be non-negative".to_string(),
        ));
    }
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO coupons (code, discount, used) VALUES (?1, ?2, 0)
                 ON CONFLICT(code) DO UPDATE SET discount = excluded.discount, used = 0",
                params![code, discount],
            )?;
            Ok(Coupon {
                code,
                discount,
                used: false,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub(crate) fn claim(conn: &Connection, code: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE coupons SET used = 1 WHERE code = ?1 AND used = 0",
        params![code],
    )?;
    Ok(changed == 1)
}

/// Flags a code as redeemed. Returns `false` when it was unknown or
/// already used.
pub async fn mark_coupon_used(db: &Database, code: &str) -> Result<bool, CablineError> {
    let code = normalize(code);
    db.connection()
        .call(move |conn| claim(conn, &code))
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn delete_coupon(db: &Database, code: &str) -> Result<bool, CablineError> {
    let code = normalize(code);
    let changed = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM coupons WHERE code = ?1", params![code]))
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn seeded_codes_are_unused() {
        let (db, _dir) = setup_db().await;
        let codes: Vec<(String, f64)> = list_coupons(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.code, c.discount))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("OFF30".to_string(), 30.0),
                ("SAVE20".to_string(), 20.0),
                ("WELCOME10".to_string(), 10.0),
            ]
        );
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let (db, _dir) = setup_db().await;
        let coupon = get_coupon(&db, " welcome10 ").await.unwrap().unwrap();
        assert_eq!(coupon.code, "WELCOME10");
        assert!(!coupon.used);
        assert!(get_coupon(&db, "NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_used_succeeds_once() {
        let (db, _dir) = setup_db().await;
        assert!(mark_coupon_used(&db, "SAVE20").await.unwrap());
        assert!(!mark_coupon_used(&db, "SAVE20").await.unwrap());
        assert!(!mark_coupon_used(&db, "NOPE").await.unwrap());
        assert!(get_coupon(&db, "SAVE20").await.unwrap().unwrap().used);
    }

    #[tokio::test]
    async fn add_replaces_and_resets() {
        let (db, _dir) = setup_db().await;
        mark_coupon_used(&db, "SAVE20").await.unwrap();
        let coupon = add_coupon(&db, "save20", 25.0).await.unwrap();
        assert_eq!(coupon.code, "SAVE20");
        let stored = get_coupon(&db, "SAVE20").await.unwrap().unwrap();
        assert_eq!(stored.discount, 25.0);
        assert!(!stored.used);

        assert!(add_coupon(&db, "two words", 5.0).await.is_err());
        assert!(add_coupon(&db, "NEG", -1.0).await.is_err());
        assert!(delete_coupon(&db, "SAVE20").await.unwrap());
        assert!(!delete_coupon(&db, "SAVE20").await.unwrap());
    }
}
