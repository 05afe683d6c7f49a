// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use cabline_booking::ConversationEngine;
use cabline_config::model::{CablineConfig, GatewayConfig};
use cabline_core::CablineError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::account;
use crate::admin;
use crate::auth::{AuthConfig, auth_middleware};
use crate::webhooks;

/// Secrets the public webhook routes check.
#[derive(Clone, Default)]
pub struct WebhookSecrets {
    /// Token expected during the WhatsApp subscription handshake.
    pub verify_token: Option<String>,
    /// App secret for `X-Hub-Signature-256`; unsigned deliveries are accepted when unset.
    pub app_secret: Option<String>,
    /// Bearer token the payment provider sends. The payment webhook is
    /// disabled when unset.
    pub payment_secret: Option<String>,
}

impl std::fmt::Debug for WebhookSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSecrets")
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field("payment_secret", &self.payment_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<ConversationEngine>,
    pub secrets: WebhookSecrets,
    pub auth: AuthConfig,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(engine: Arc<ConversationEngine>, config: &CablineConfig) -> Self {
        Self {
            engine,
            secrets: WebhookSecrets {
                verify_token: config.whatsapp.verify_token.clone(),
                app_secret: config.whatsapp.app_secret.clone(),
                payment_secret: config.payment.webhook_secret.clone(),
            },
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            start_time: Instant::now(),
        }
    }
}

/// Builds the full route table.
///
/// Public: `/health`, `/webhooks/whatsapp` (GET handshake, POST delivery),
/// `/webhooks/payment`, `/login` and `/owner/login`. Everything under
/// `/admin` needs the bearer token.
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(webhooks::get_health))
        .route(
            "/webhooks/whatsapp",
            get(webhooks::verify_whatsapp).post(webhooks::receive_whatsapp),
        )
        .route("/webhooks/payment", post(webhooks::receive_payment))
        .route("/login", post(account::customer_login))
        .route("/owner/login", post(account::owner_login))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/stats", get(admin::get_stats))
        .route("/admin/revenue", get(admin::get_revenue))
        .route("/admin/rides", get(admin::list_rides))
        .route("/admin/rides/unassigned", get(admin::list_unassigned))
        .route(
            "/admin/rides/{id}",
            get(admin::get_ride)
                .put(admin::update_ride)
                .delete(admin::delete_ride),
        )
        .route("/admin/rides/{id}/invoice", get(admin::get_invoice))
        .route("/admin/rides/{id}/assign", post(admin::assign_ride))
        .route("/admin/rides/{id}/complete", post(admin::complete_ride))
        .route("/admin/rides/{id}/cancel", post(admin::cancel_ride))
        .route(
            "/admin/drivers",
            get(admin::list_drivers).post(admin::create_driver),
        )
        .route(
            "/admin/drivers/{id}",
            put(admin::update_driver).delete(admin::delete_driver),
        )
        .route("/admin/drivers/{id}/location", put(admin::update_location))
        .route(
            "/admin/vehicles",
            get(admin::list_vehicles).post(admin::create_vehicle),
        )
        .route(
            "/admin/vehicles/{id}",
            put(admin::update_vehicle).delete(admin::delete_vehicle),
        )
        .route(
            "/admin/coupons",
            get(admin::list_coupons).post(admin::add_coupon),
        )
        .route("/admin/coupons/{code}", delete(admin::delete_coupon))
        .route(
            "/admin/owners",
            get(admin::list_owners).post(admin::add_owner),
        )
        .route(
            "/admin/owners/{id}",
            put(admin::update_owner).delete(admin::delete_owner),
        )
        .route(
            "/admin/pricing",
            get(admin::list_pricing).put(admin::upsert_pricing),
        )
        .route(
            "/admin/settings/auto-assignment",
            get(admin::get_auto_assignment).put(admin::set_auto_assignment),
        )
        .route("/admin/broadcast", post(admin::broadcast))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Binds `host:port` and serves until `cancel` fires.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), CablineError> {
    if state.auth.bearer_token.is_none() {
        tracing::warn!("gateway.bearer_token is not set; admin API will reject every request");
    }
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CablineError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| CablineError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
