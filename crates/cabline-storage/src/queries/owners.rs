// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fleet owners. Their phones receive the same alerts as the configured
//! operator numbers.

use cabline_core::CablineError;
use cabline_core::model::{NewOwner, Owner};
use rusqlite::{Connection, OptionalExtension, params};

use super::get_ts;
use crate::database::Database;

const OWNER_COLUMNS: &str = "id, name, email, phone, password_hash, created_at";

fn owner_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Owner> {
    Ok(Owner {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: get_ts(row, 5)?,
    })
}

fn load_owner(conn: &Connection, id: i64) -> rusqlite::Result<Option<Owner>> {
    conn.query_row(
        &format!("SELECT {OWNER_COLUMNS} FROM owners WHERE id = ?1"),
        params![id],
        owner_from_row,
    )
    .optional()
}

/// Insert an owner. The email is stored lowercased.
pub async fn add_owner(db: &Database, owner: &NewOwner) -> Result<Owner, CablineError> {
    let owner = owner.clone();
    let created = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO owners (name, email, phone, password_hash) VALUES (?1, ?2, ?3, ?4)",
                params![
                    owner.name,
                    owner.email.trim().to_lowercase(),
                    owner.phone,
                    owner.password_hash
                ],
            )?;
            load_owner(conn, conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    created.ok_or_else(|| CablineError::Internal("inserted owner not found".to_string()))
}

pub async fn get_owner_by_email(
    db: &Database,
    email: &str,
) -> Result<Option<Owner>, CablineError> {
    let email = email.trim().to_lowercase();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {OWNER_COLUMNS} FROM owners WHERE email = ?1"),
                params![email],
                owner_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_owners(db: &Database) -> Result<Vec<Owner>, CablineError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {OWNER_COLUMNS} FROM owners ORDER BY id"))?;
            let owners = stmt
                .query_map([], owner_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(owners)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Phones of every owner, for operator alerts.
pub async fn owner_phones(db: &Database) -> Result<Vec<String>, CablineError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT phone FROM owners ORDER BY id")?;
            let phones = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(phones)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replaces name, email, phone and password hash.
pub async fn update_owner(
    db: &Database,
    owner_id: i64,
    owner: &NewOwner,
) -> Result<Option<Owner>, CablineError> {
    let owner = owner.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE owners SET name = ?1, email = ?2, phone = ?3, password_hash = ?4
                 WHERE id = ?5",
                params![
                    owner.name,
                    owner.email.trim().to_lowercase(),
                    owner.phone,
                    owner.password_hash,
                    owner_id
                ],
            )?;
            load_owner(conn, owner_id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn delete_owner(db: &Database, owner_id: i64) -> Result<bool, CablineError> {
    let changed = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM owners WHERE id = ?1", params![owner_id]))
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    fn owner(email: &str, phone: &str) -> NewOwner {
        NewOwner {
            name: "Meera".to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    #[tokio::test]
    async fn add_and_find_by_email() {
        let (db, _dir) = setup_db().await;
        let created = add_owner(&db, &owner("Meera@Fleet.in", "917000000001")).await.unwrap();
        assert_eq!(created.email, "meera@fleet.in");

        let found = get_owner_by_email(&db, "MEERA@fleet.in").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(get_owner_by_email(&db, "x@y.z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (db, _dir) = setup_db().await;
        add_owner(&db, &owner("a@fleet.in", "917000000001")).await.unwrap();
        assert!(add_owner(&db, &owner("a@fleet.in", "917000000002")).await.is_err());
    }

    #[tokio::test]
    async fn phones_update_and_delete() {
        let (db, _dir) = setup_db().await;
        let first = add_owner(&db, &owner("a@fleet.in", "917000000001")).await.unwrap();
        add_owner(&db, &owner("b@fleet.in", "917000000002")).await.unwrap();
        assert_eq!(
            owner_phones(&db).await.unwrap(),
            vec!["917000000001", "917000000002"]
        );

        let updated = update_owner(&db, first.id, &owner("a@fleet.in", "917000000009"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.phone, "917000000009");
        let missing = update_owner(&db, 999, &owner("c@fleet.in", "917000000003")).await;
        assert!(missing.unwrap().is_none());

        assert!(delete_owner(&db, first.id).await.unwrap());
        assert!(!delete_owner(&db, first.id).await.unwrap());
        assert_eq!(list_owners(&db).await.unwrap().len(), 1);
    }
}
