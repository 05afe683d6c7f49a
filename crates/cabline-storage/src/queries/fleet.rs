// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drivers, vehicles and the per-type pricing table.

use cabline_core::CablineError;
use cabline_core::model::{
    DeleteOutcome, Driver, NewDriver, NewVehicle, PricingRule, ResourceStatus, Vehicle,
};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use super::{get_enum, ts};
use crate::database::Database;

pub(crate) const DRIVER_COLUMNS: &str =
    "id, name, phone, car_id, is_fixed, status, last_latitude, last_longitude";

pub(crate) const VEHICLE_COLUMNS: &str = "id, plate_number, model, car_type, rate_per_km, status";

pub(crate) fn driver_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Driver> {
    Ok(Driver {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        car_id: row.get(3)?,
        is_fixed: row.get(4)?,
        status: get_enum(row, 5)?,
        last_latitude: row.get(6)?,
        last_longitude: row.get(7)?,
    })
}

pub(crate) fn vehicle_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: row.get(0)?,
        plate_number: row.get(1)?,
        model: row.get(2)?,
        car_type: row.get(3)?,
        rate_per_km: row.get(4)?,
        status: get_enum(row, 5)?,
    })
}

pub(crate) fn load_driver(conn: &Connection, id: i64) -> rusqlite::Result<Option<Driver>> {
    conn.query_row(
        &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = ?1"),
        params![id],
        driver_from_row,
    )
    .optional()
}

pub(crate) fn load_vehicle(conn: &Connection, id: i64) -> rusqlite::Result<Option<Vehicle>> {
    conn.query_row(
        &format!("SELECT {VEHICLE_COLUMNS} FROM cars WHERE id = ?1"),
        params![id],
        vehicle_from_row,
    )
    .optional()
}

pub async fn get_driver(db: &Database, id: i64) -> Result<Option<Driver>, CablineError> {
    db.connection()
        .call(move |conn| load_driver(conn, id))
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_driver_by_phone(
    db: &Database,
    phone: &str,
) -> Result<Option<Driver>, CablineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE phone = ?1"),
                params![phone],
                driver_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_drivers(db: &Database) -> Result<Vec<Driver>, CablineError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {DRIVER_COLUMNS} FROM drivers ORDER BY id"))?;
            let drivers = stmt
                .query_map([], driver_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(drivers)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn check_driver(driver: &NewDriver) -> Result<(), CablineError> {
    if driver.is_fixed && driver.car_id.is_none() {
        return Err(CablineError::Validation(
            "a fixed driver needs a car_id".to_string(),
        ));
    }
    Ok(())
}

/// Insert a free driver. A fixed driver must name a home vehicle.
pub async fn create_driver(db: &Database, driver: &NewDriver) -> Result<Driver, CablineError> {
    check_driver(driver)?;
    let driver = driver.clone();
    let created = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO drivers (name, phone, car_id, is_fixed) VALUES (?1, ?2, ?3, ?4)",
                params![driver.name, driver.phone, driver.car_id, driver.is_fixed],
            )?;
            load_driver(conn, conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    created.ok_or_else(|| CablineError::Internal("inserted driver not found".to_string()))
}

pub async fn update_driver_location(
    db: &Database,
    driver_id: i64,
    latitude: f64,
    longitude: f64,
) -> Result<(), CablineError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(CablineError::Validation(format!(
            "coordinates out of range: {latitude}, {longitude}"
        )));
    }
    let now = ts(&Utc::now());
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE drivers SET last_latitude = ?1, last_longitude = ?2,
                 location_updated_at = ?3 WHERE id = ?4",
                params![latitude, longitude, now, driver_id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(CablineError::NotFound {
            entity: "driver",
            id: driver_id.to_string(),
        });
    }
    Ok(())
}

pub async fn get_vehicle(db: &Database, id: i64) -> Result<Option<Vehicle>, CablineError> {
    db.connection()
        .call(move |conn| load_vehicle(conn, id))
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_vehicles(db: &Database) -> Result<Vec<Vehicle>, CablineError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {VEHICLE_COLUMNS} FROM cars ORDER BY id"))?;
            let vehicles = stmt
                .query_map([], vehicle_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(vehicles)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn check_vehicle(vehicle: &NewVehicle) -> Result<(), CablineError> {
    if vehicle.rate_per_km < 0.0 {
        return Err(CablineError::Validation(
            "rate_per_km must be non-negative".to_string(),
        ));
    }
    Ok(())
}

/// Insert a free vehicle. The type is stored lowercased.
pub async fn create_vehicle(db: &Database, vehicle: &NewVehicle) -> Result<Vehicle, CablineError> {
    check_vehicle(vehicle)?;
    let vehicle = vehicle.clone();
    let created = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO cars (plate_number, model, car_type, rate_per_km) VALUES (?1, ?2, ?3, ?4)",
                params![
                    vehicle.plate_number,
                    vehicle.model,
                    vehicle.car_type.trim().to_lowercase(),
                    vehicle.rate_per_km
                ],
            )?;
            load_vehicle(conn, conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    created.ok_or_else(|| CablineError::Internal("inserted vehicle not found".to_string()))
}

/// Replaces a driver's profile. Status and location are kept.
pub async fn update_driver(
    db: &Database,
    driver_id: i64,
    driver: &NewDriver,
) -> Result<Option<Driver>, CablineError> {
    check_driver(driver)?;
    let driver = driver.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE drivers SET name = ?1, phone = ?2, car_id = ?3, is_fixed = ?4
                 WHERE id = ?5",
                params![driver.name, driver.phone, driver.car_id, driver.is_fixed, driver_id],
            )?;
            load_driver(conn, driver_id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Removes a driver who is not on a ride. Past rides keep no reference.
pub async fn delete_driver(db: &Database, driver_id: i64) -> Result<DeleteOutcome, CablineError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(driver) = load_driver(&tx, driver_id)? else {
                return Ok(DeleteOutcome::NotFound);
            };
            if driver.status == ResourceStatus::Busy {
                return Ok(DeleteOutcome::InUse);
            }
            tx.execute("DELETE FROM drivers WHERE id = ?1", params![driver_id])?;
            tx.commit()?;
            Ok(DeleteOutcome::Deleted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replaces a vehicle's details. Status is kept.
pub async fn update_vehicle(
    db: &Database,
    car_id: i64,
    vehicle: &NewVehicle,
) -> Result<Option<Vehicle>, CablineError> {
    check_vehicle(vehicle)?;
    let vehicle = vehicle.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE cars SET plate_number = ?1, model = ?2, car_type = ?3, rate_per_km = ?4
                 WHERE id = ?5",
                params![
                    vehicle.plate_number,
                    vehicle.model,
                    vehicle.car_type.trim().to_lowercase(),
                    vehicle.rate_per_km,
                    car_id
                ],
            )?;
            load_vehicle(conn, car_id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Removes a vehicle that is not on a ride. Drivers fixed to it become
/// free-floating.
pub async fn delete_vehicle(db: &Database, car_id: i64) -> Result<DeleteOutcome, CablineError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(vehicle) = load_vehicle(&tx, car_id)? else {
                return Ok(DeleteOutcome::NotFound);
            };
            if vehicle.status == ResourceStatus::Busy {
                return Ok(DeleteOutcome::InUse);
            }
            tx.execute(
                "UPDATE drivers SET car_id = NULL, is_fixed = 0 WHERE car_id = ?1",
                params![car_id],
            )?;
            tx.execute("DELETE FROM cars WHERE id = ?1", params![car_id])?;
            tx.commit()?;
            Ok(DeleteOutcome::Deleted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Distinct types among free vehicles.
pub async fn available_car_types(db: &Database) -> Result<Vec<String>, CablineError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT car_type FROM cars WHERE status = 'free' ORDER BY car_type",
            )?;
            let types = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(types)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Pricing table rate, falling back to the cheapest vehicle of the type.
pub async fn rate_for_type(db: &Database, car_type: &str) -> Result<Option<f64>, CablineError> {
    let car_type = car_type.trim().to_lowercase();
    db.connection()
        .call(move |conn| {
            let priced: Option<f64> = conn
                .query_row(
                    "SELECT price_per_km FROM pricing WHERE vehicle_type = ?1",
                    params![car_type],
                    |row| row.get(0),
                )
                .optional()?;
            if priced.is_some() {
                return Ok(priced);
            }
            // MIN over zero rows yields a single NULL row.
            conn.query_row(
                "SELECT MIN(rate_per_km) FROM cars WHERE car_type = ?1",
                params![car_type],
                |row| row.get::<_, Option<f64>>(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_pricing(db: &Database) -> Result<Vec<PricingRule>, CablineError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT vehicle_type, price_per_km FROM pricing ORDER BY vehicle_type")?;
            let rules = stmt
                .query_map([], |row| {
                    Ok(PricingRule {
                        vehicle_type: row.get(0)?,
                        price_per_km: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rules)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn upsert_pricing(db: &Database, rule: &PricingRule) -> Result<(), CablineError> {
    if rule.price_per_km < 0.0 {
        return Err(CablineError::Validation(
            "price_per_km must be non-negative".to_string(),
        ));
    }
    let vehicle_type = rule.vehicle_type.trim().to_lowercase();
    let price = rule.price_per_km;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO pricing (vehicle_type, price_per_km) VALUES (?1, ?2)
                 ON CONFLICT(vehicle_type) DO UPDATE SET price_per_km = excluded.price_per_km",
                params![vehicle_type, price],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    fn sedan(plate: &str, rate: f64) -> NewVehicle {
        NewVehicle {
            plate_number: plate.to_string(),
            model: "Dzire".to_string(),
            car_type: "Sedan".to_string(),
            rate_per_km: rate,
        }
    }

    #[tokio::test]
    async fn vehicle_type_is_lowercased_and_listed() {
        let (db, _dir) = setup_db().await;
        let v = create_vehicle(&db, &sedan("KA01AA0001", 11.0)).await.unwrap();
        assert_eq!(v.car_type, "sedan");
        assert_eq!(v.status, ResourceStatus::Free);
        assert_eq!(available_car_types(&db).await.unwrap(), vec!["sedan"]);
    }

    #[tokio::test]
    async fn rate_prefers_pricing_table() {
        let (db, _dir) = setup_db().await;
        create_vehicle(&db, &sedan("KA01AA0001", 11.0)).await.unwrap();
        assert_eq!(rate_for_type(&db, "sedan").await.unwrap(), Some(12.0));

        create_vehicle(
            &db,
            &NewVehicle {
                plate_number: "KA01AA0002".into(),
                model: "Ertiga".into(),
                car_type: "muv".into(),
                rate_per_km: 14.0,
            },
        )
        .await
        .unwrap();
        assert_eq!(rate_for_type(&db, "MUV").await.unwrap(), Some(14.0));
        assert_eq!(rate_for_type(&db, "limo").await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_pricing_overrides_seed() {
        let (db, _dir) = setup_db().await;
        upsert_pricing(
            &db,
            &PricingRule {
                vehicle_type: "sedan".into(),
                price_per_km: 13.5,
            },
        )
        .await
        .unwrap();
        assert_eq!(rate_for_type(&db, "sedan").await.unwrap(), Some(13.5));
        let rules = list_pricing(&db).await.unwrap();
        assert_eq!(rules.len(), 3);
    }

    #[tokio::test]
    async fn fixed_driver_requires_car() {
        let (db, _dir) = setup_db().await;
        let err = create_driver(
            &db,
            &NewDriver {
                name: "Ravi".into(),
                phone: "919800000001".into(),
                car_id: None,
                is_fixed: true,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CablineError::Validation(_)));
    }

    #[tokio::test]
    async fn driver_lookup_and_location() {
        let (db, _dir) = setup_db().await;
        let car = create_vehicle(&db, &sedan("KA01AA0001", 11.0)).await.unwrap();
        let driver = create_driver(
            &db,
            &NewDriver {
                name: "Ravi".into(),
                phone: "919800000001".into(),
                car_id: Some(car.id),
                is_fixed: true,
            },
        )
        .await
        .unwrap();
        assert!(driver.is_fixed);

        update_driver_location(&db, driver.id, 12.9352, 77.6245).await.unwrap();
        let loaded = get_driver_by_phone(&db, "919800000001").await.unwrap().unwrap();
        assert_eq!(loaded.last_latitude, Some(12.9352));
        assert_eq!(list_drivers(&db).await.unwrap().len(), 1);

        assert!(matches!(
            update_driver_location(&db, 999, 12.0, 77.0).await,
            Err(CablineError::NotFound { entity: "driver", .. })
        ));
        assert!(matches!(
            update_driver_location(&db, driver.id, 120.0, 77.0).await,
            Err(CablineError::Validation(_))
        ));
    }

    fn fixed_driver(car_id: i64) -> NewDriver {
        NewDriver {
            name: "Ravi".to_string(),
            phone: "918000000001".to_string(),
            car_id: Some(car_id),
            is_fixed: true,
        }
    }

    #[tokio::test]
    async fn update_driver_and_vehicle_in_place() {
        let (db, _dir) = setup_db().await;
        let car = create_vehicle(&db, &sedan("KA01AA0001", 11.0)).await.unwrap();
        let driver = create_driver(&db, &fixed_driver(car.id)).await.unwrap();

        let mut profile = fixed_driver(car.id);
        profile.name = "Ravi Kumar".into();
        profile.is_fixed = false;
        let updated = update_driver(&db, driver.id, &profile).await.unwrap().unwrap();
        assert_eq!(updated.name, "Ravi Kumar");
        assert!(!updated.is_fixed);
        assert_eq!(updated.status, ResourceStatus::Free);

        let mut details = sedan("KA01AA0001", 13.0);
        details.car_type = "SUV".into();
        let updated = update_vehicle(&db, car.id, &details).await.unwrap().unwrap();
        assert_eq!(updated.car_type, "suv");
        assert_eq!(updated.rate_per_km, 13.0);

        assert!(update_vehicle(&db, 999, &details).await.unwrap().is_none());
        profile.car_id = None;
        profile.is_fixed = true;
        assert!(update_driver(&db, driver.id, &profile).await.is_err());
    }

    #[tokio::test]
    async fn busy_resources_cannot_be_deleted() {
        let (db, _dir) = setup_db().await;
        let car = create_vehicle(&db, &sedan("KA01AA0001", 11.0)).await.unwrap();
        let driver = create_driver(&db, &fixed_driver(car.id)).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "UPDATE drivers SET status = 'busy'; UPDATE cars SET status = 'busy';",
                )
            })
            .await
            .unwrap();

        assert_eq!(delete_driver(&db, driver.id).await.unwrap(), DeleteOutcome::InUse);
        assert_eq!(delete_vehicle(&db, car.id).await.unwrap(), DeleteOutcome::InUse);
        assert_eq!(delete_driver(&db, 999).await.unwrap(), DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn deleting_a_vehicle_unbinds_its_fixed_driver() {
        let (db, _dir) = setup_db().await;
        let car = create_vehicle(&db, &sedan("KA01AA0001", 11.0)).await.unwrap();
        let driver = create_driver(&db, &fixed_driver(car.id)).await.unwrap();

        assert_eq!(delete_vehicle(&db, car.id).await.unwrap(), DeleteOutcome::Deleted);
        assert!(get_vehicle(&db, car.id).await.unwrap().is_none());
        let driver = get_driver(&db, driver.id).await.unwrap().unwrap();
        assert_eq!(driver.car_id, None);
        assert!(!driver.is_fixed);

        assert_eq!(delete_driver(&db, driver.id).await.unwrap(), DeleteOutcome::Deleted);
        assert!(get_driver(&db, driver.id).await.unwrap().is_none());
    }
}
