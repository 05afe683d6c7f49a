// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password logins for customers and fleet owners.
//!
//! Both answer the same 401 for an unknown account and a wrong password.

use axum::{Json, extract::State};
use cabline_booking::credentials;
use cabline_core::model::{Owner, Ride, User};
use cabline_core::{CablineError, normalize_phone};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct CustomerLogin {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CustomerSession {
    pub user: User,
    /// Most recent rides first, as in the chat's "my rides".
    pub rides: Vec<Ride>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerLogin {
    pub email: String,
    pub password: String,
}

async fn verify(password: String, hash: String) -> Result<bool, CablineError> {
    tokio::task::spawn_blocking(move || credentials::verify_password(&password, &hash))
        .await
        .map_err(|e| CablineError::Internal(format!("password check failed: {e}")))
}

/// POST /login
pub async fn customer_login(
    State(state): State<GatewayState>,
    Json(login): Json<CustomerLogin>,
) -> ApiResult<Json<CustomerSession>> {
    let phone = normalize_phone(&login.phone);
    let storage = &state.engine.services().storage;
    let Some(user) = storage.get_user(&phone).await? else {
        return Err(ApiError::Unauthorized);
    };
    if !verify(login.password, user.password_hash.clone()).await? {
        info!(user_id = user.id, "customer login rejected");
        return Err(ApiError::Unauthorized);
    }
    let limit = state.engine.settings().my_rides_limit;
    let rides = storage.rides_for_phone(&phone, limit).await?;
    info!(user_id = user.id, "customer logged in");
    Ok(Json(CustomerSession { user, rides }))
}

/// POST /owner/login
pub async fn owner_login(
    State(state): State<GatewayState>,
    Json(login): Json<OwnerLogin>,
) -> ApiResult<Json<Owner>> {
    let storage = &state.engine.services().storage;
    let Some(owner) = storage.get_owner_by_email(login.email.trim()).await? else {
        return Err(ApiError::Unauthorized);
    };
    if !verify(login.password, owner.password_hash.clone()).await? {
        info!(owner_id = owner.id, "owner login rejected");
        return Err(ApiError::Unauthorized);
    }
    info!(owner_id = owner.id, "owner logged in");
    Ok(Json(owner))
}
