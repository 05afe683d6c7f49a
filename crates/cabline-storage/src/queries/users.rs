// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registered customers.

use cabline_core::CablineError;
use cabline_core::model::{NewUser, User};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
    })
}

pub async fn get_user(db: &Database, phone: &str) -> Result<Option<User>, CablineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, phone, name, email, password_hash FROM users WHERE phone = ?1",
                params![phone],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a user. Fails if the phone is already registered.
pub async fn create_user(db: &Database, user: &NewUser) -> Result<User, CablineError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (phone, name, email, password_hash) VALUES (?1, ?2, ?3, ?4)",
                params![user.phone, user.name, user.email, user.password_hash],
            )?;
            Ok(User {
                id: conn.last_insert_rowid(),
                phone: user.phone,
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn update_password(
    db: &Database,
    phone: &str,
    password_hash: &str,
) -> Result<(), CablineError> {
    let key = phone.to_string();
    let hash = password_hash.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET password_hash = ?1 WHERE phone = ?2",
                params![hash, key],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(CablineError::NotFound {
            entity: "user",
            id: phone.to_string(),
        });
    }
    Ok(())
}

pub async fn list_user_phones(db: &Database) -> Result<Vec<String>, CablineError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT phone FROM users ORDER BY id")?;
            let phones = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(phones)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    fn new_user(phone: &str) -> NewUser {
        NewUser {
            phone: phone.to_string(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get_user() {
        let (db, _dir) = setup_db().await;
        let created = create_user(&db, &new_user("919000000001")).await.unwrap();
        assert!(created.id > 0);

        let loaded = get_user(&db, "919000000001").await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert!(get_user(&db, "919000000002").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected() {
        let (db, _dir) = setup_db().await;
        create_user(&db, &new_user("919000000001")).await.unwrap();
        assert!(create_user(&db, &new_user("919000000001")).await.is_err());
    }

    #[tokio::test]
    async fn update_password_replaces_hash() {
        let (db, _dir) = setup_db().await;
        create_user(&db, &new_user("919000000001")).await.unwrap();
        update_password(&db, "919000000001", "$argon2id$new").await.unwrap();
        let loaded = get_user(&db, "919000000001").await.unwrap().unwrap();
        assert_eq!(loaded.password_hash, "$argon2id$new");

        let err = update_password(&db, "919999999999", "x").await.unwrap_err();
        assert!(matches!(err, CablineError::NotFound { entity: "user", .. }));
    }

    #[tokio::test]
    async fn list_user_phones_in_registration_order() {
        let (db, _dir) = setup_db().await;
        create_user(&db, &new_user("919000000002")).await.unwrap();
        create_user(&db, &new_user("919000000001")).await.unwrap();
        assert_eq!(
            list_user_phones(&db).await.unwrap(),
            vec!["919000000002", "919000000001"]
        );
    }
}
