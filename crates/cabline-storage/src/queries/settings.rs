// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value runtime settings.

use cabline_core::CablineError;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

const AUTO_ASSIGNMENT_KEY: &str = "auto_assignment_enabled";

pub async fn get_setting(db: &Database, key: &str) -> Result<Option<String>, CablineError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn set_setting(db: &Database, key: &str, value: &str) -> Result<(), CablineError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Missing or unparsable values read as enabled.
pub async fn auto_assignment_enabled(db: &Database) -> Result<bool, CablineError> {
    let value = get_setting(db, AUTO_ASSIGNMENT_KEY).await?;
    Ok(!matches!(value.as_deref(), Some("false") | Some("0")))
}

pub async fn set_auto_assignment(db: &Database, enabled: bool) -> Result<(), CablineError> {
    set_setting(db, AUTO_ASSIGNMENT_KEY, if enabled { "true" } else { "false" }).await
}
