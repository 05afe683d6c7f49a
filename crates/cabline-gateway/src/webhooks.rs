// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Public routes: health, WhatsApp webhook and payment callback.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use cabline_booking::record_online_payment;
use cabline_core::{HealthStatus, normalize_phone};
use cabline_whatsapp::{WebhookPayload, parse_inbound, verify_signature, verify_subscription};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::bearer_matches;
use crate::error::{ApiError, ApiResult};
use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub storage: String,
}

/// GET /health
///
/// Unauthenticated; reports `degraded` when the database check fails.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let storage = match state.engine.services().storage.health_check().await {
        Ok(HealthStatus::Healthy) => "healthy".to_string(),
        Ok(HealthStatus::Degraded(reason)) => format!("degraded: {reason}"),
        Ok(HealthStatus::Unhealthy(reason)) => format!("unhealthy: {reason}"),
        Err(e) => format!("unhealthy: {e}"),
    };
    let status = if storage == "healthy" { "ok" } else { "degraded" };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        storage,
    })
}

/// Query string of the subscription handshake.
#[derive(Debug, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /webhooks/whatsapp
pub async fn verify_whatsapp(
    State(state): State<GatewayState>,
    Query(query): Query<SubscriptionQuery>,
) -> Response {
    let expected = state.secrets.verify_token.as_deref().unwrap_or_default();
    match verify_subscription(
        query.mode.as_deref(),
        query.verify_token.as_deref(),
        query.challenge.as_deref(),
        expected,
    ) {
        Some(challenge) => {
            info!("whatsapp webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        None => {
            warn!("whatsapp webhook verification failed");
            (StatusCode::FORBIDDEN, "Verification token mismatch").into_response()
        }
    }
}

/// POST /webhooks/whatsapp
///
/// Every message in the delivery is processed before the 200 is returned.
/// Undecodable payloads and failed turns are logged and still acknowledged,
/// otherwise the platform keeps redelivering them.
pub async fn receive_whatsapp(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state.secrets.app_secret.as_deref() {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok());
        if !verify_signature(secret, &body, signature) {
            warn!("whatsapp delivery with bad signature rejected");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "malformed whatsapp payload acknowledged");
            return StatusCode::OK;
        }
    };

    let messages = parse_inbound(&payload);
    if messages.is_empty() {
        debug!("whatsapp delivery without customer messages");
    }
    for message in &messages {
        match state.engine.handle_message(message).await {
            Ok(report) => debug!(
                intent = report.intent.label(),
                state = %report.state,
                sent = report.sent,
                "message handled"
            ),
            Err(e) => error!(error = %e, "message handling failed"),
        }
    }
    StatusCode::OK
}

/// Body of the payment provider's callback.
#[derive(Debug, Deserialize)]
pub struct PaymentNotice {
    /// Payer phone in any formatting.
    pub phone: String,
    /// Provider transaction reference, logged only.
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentAck {
    pub ride_id: i64,
    pub payment_status: String,
}

/// POST /webhooks/payment
///
/// Marks the payer's most recent ride paid. Requires
/// `Authorization: Bearer <payment.webhook_secret>`.
pub async fn receive_payment(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(notice): Json<PaymentNotice>,
) -> Result<Json<PaymentAck>, Response> {
    let authorized = state
        .secrets
        .payment_secret
        .as_deref()
        .is_some_and(|secret| bearer_matches(&headers, secret));
    if !authorized {
        warn!("payment callback rejected");
        return Err(StatusCode::UNAUTHORIZED.into_response());
    }
    record_payment(&state, &notice)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

async fn record_payment(state: &GatewayState, notice: &PaymentNotice) -> ApiResult<PaymentAck> {
    let phone = normalize_phone(&notice.phone);
    if phone.is_empty() {
        return Err(ApiError::BadRequest("phone is required".into()));
    }
    let services = state.engine.services();
    let ride = record_online_payment(
        &services.storage,
        &services.notifier,
        &phone,
        state.engine.settings().external_timeout,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("ride for phone", &phone))?;
    info!(
        ride_id = ride.id,
        reference = notice.reference.as_deref().unwrap_or("-"),
        "payment callback processed"
    );
    Ok(PaymentAck {
        ride_id: ride.id,
        payment_status: ride.payment_status.to_string(),
    })
}
