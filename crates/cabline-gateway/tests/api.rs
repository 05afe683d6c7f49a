// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router-level tests: webhooks and the admin API over a full test harness.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cabline_core::model::{PaymentStatus, ResourceStatus};
use cabline_gateway::{GatewayState, router};
use cabline_test_utils::{TEST_PASSWORD, TestHarness};
use cabline_whatsapp::sign_body;
use serde_json::{Value, json};
use tower::util::ServiceExt;

const ADMIN_TOKEN: &str = "admin-token";
const APP_SECRET: &str = "app-secret";
const PAY_SECRET: &str = "pay-secret";
const CUSTOMER: &str = "919000000001";

async fn setup() -> (TestHarness, Router) {
    let h = TestHarness::builder()
        .with_config(|c| {
            c.gateway.bearer_token = Some(ADMIN_TOKEN.into());
            c.whatsapp.verify_token = Some("verify-me".into());
            c.whatsapp.app_secret = Some(APP_SECRET.into());
            c.payment.webhook_secret = Some(PAY_SECRET.into());
        })
        .build()
        .await
        .unwrap();
    let app = router(GatewayState::new(h.engine.clone(), &h.config));
    (h, app)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn text_delivery(from: &str, text: &str) -> String {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA_ID",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "messages": [{
                        "from": from,
                        "id": "wamid.test-1",
                        "timestamp": "1760000000",
                        "type": "text",
                        "text": { "body": text }
                    }]
                }
            }]
        }]
    })
    .to_string()
}

fn signed_post(body: String, secret: &str) -> Request<Body> {
    let signature = sign_body(secret, body.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/webhooks/whatsapp")
        .header("content-type", "application/json")
        .header("x-hub-signature-256", signature)
        .body(Body::from(body))
        .unwrap()
}

/// Books an immediate sedan ride for `CUSTOMER` and returns its id.
async fn book_ride(h: &TestHarness) -> i64 {
    h.register(CUSTOMER, "Asha").await;
    h.quote(CUSTOMER, "date_today", "3:00 PM", "sedan").await;
    h.press(CUSTOMER, "confirm_ride")
        .await
        .unwrap()
        .ride_id
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (_h, app) = setup().await;
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn admin_routes_require_bearer_token() {
    let (_h, app) = setup().await;

    let anonymous = Request::get("/admin/stats").body(Body::empty()).unwrap();
    assert_eq!(call(&app, anonymous).await.0, StatusCode::UNAUTHORIZED);

    let wrong = Request::get("/admin/stats")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(call(&app, wrong).await.0, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, admin("GET", "/admin/stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rides"], 0);
}

#[tokio::test]
async fn admin_api_is_closed_without_configured_token() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(GatewayState::new(h.engine.clone(), &h.config));
    let (status, _) = call(&app, admin("GET", "/admin/stats", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subscription_handshake_echoes_challenge() {
    let (_h, app) = setup().await;

    let ok = Request::get(
        "/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=1158201444",
    )
    .body(Body::empty())
    .unwrap();
    let (status, body) = call(&app, ok).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(1158201444));

    let bad = Request::get(
        "/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=1",
    )
    .body(Body::empty())
    .unwrap();
    assert_eq!(call(&app, bad).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signed_delivery_runs_a_turn() {
    let (h, app) = setup().await;
    let (status, _) = call(&app, signed_post(text_delivery(CUSTOMER, "hi"), APP_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.notifier.any_to_contains(CUSTOMER, "What would you like to do?").await);
}

#[tokio::test]
async fn badly_signed_delivery_is_rejected() {
    let (h, app) = setup().await;
    let (status, _) = call(&app, signed_post(text_delivery(CUSTOMER, "hi"), "other")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.notifier.sent_count().await, 0);
}

#[tokio::test]
async fn malformed_delivery_is_acknowledged() {
    let (h, app) = setup().await;
    let (status, _) = call(&app, signed_post("{\"entry\": 42}".into(), APP_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.notifier.sent_count().await, 0);
}

#[tokio::test]
async fn invoice_matches_chat_total() {
    let (h, app) = setup().await;
    h.add_fleet("sedan", 1).await;
    let ride_id = book_ride(&h).await;
    assert!(h.notifier.any_to_contains(CUSTOMER, "Total: ₹126.00").await);

    let (status, body) = call(
        &app,
        admin("GET", &format!("/admin/rides/{ride_id}/invoice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subtotal"], 120.0);
    assert_eq!(body["tax"], 6.0);
    assert_eq!(body["total"], 126.0);
}

#[tokio::test]
async fn manual_assignment_is_idempotent_over_http() {
    let (h, app) = setup().await;
    let fleet = h.add_fleet("sedan", 1).await;
    h.storage.set_auto_assignment(false).await.unwrap();
    let ride_id = book_ride(&h).await;

    let (status, body) = call(&app, admin("GET", "/admin/rides/unassigned", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (driver, vehicle) = &fleet[0];
    let request = json!({ "driver_id": driver.id, "car_id": vehicle.id });
    let uri = format!("/admin/rides/{ride_id}/assign");

    let (status, body) = call(&app, admin("POST", &uri, Some(request.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ride"]["status"], "assigned");

    let (status, body) = call(&app, admin("POST", &uri, Some(request))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    assert_eq!(h.notifier.sent_to(&driver.phone).await.len(), 1);
}

#[tokio::test]
async fn assigning_unknown_driver_is_not_found() {
    let (h, app) = setup().await;
    let fleet = h.add_fleet("sedan", 1).await;
    h.storage.set_auto_assignment(false).await.unwrap();
    let ride_id = book_ride(&h).await;

    let request = json!({ "driver_id": 9999, "car_id": fleet[0].1.id });
    let (status, body) = call(
        &app,
        admin("POST", &format!("/admin/rides/{ride_id}/assign"), Some(request)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "driver 9999 not found");
}

#[tokio::test]
async fn completing_a_ride_frees_the_driver() {
    let (h, app) = setup().await;
    let fleet = h.add_fleet("sedan", 1).await;
    let ride_id = book_ride(&h).await;

    let uri = format!("/admin/rides/{ride_id}/complete");
    let (status, body) = call(&app, admin("POST", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let driver = h.storage.get_driver(fleet[0].0.id).await.unwrap().unwrap();
    assert_eq!(driver.status.to_string(), "free");

    let (status, _) = call(&app, admin("POST", &uri, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn payment_callback_marks_latest_ride_paid() {
    let (h, app) = setup().await;
    h.add_fleet("sedan", 1).await;
    let ride_id = book_ride(&h).await;
    h.press(CUSTOMER, "pay_online").await.unwrap();

    let notice = json!({ "phone": "+91 90000 00001", "reference": "pay_123" }).to_string();
    let unauthorized = Request::post("/webhooks/payment")
        .header("content-type", "application/json")
        .body(Body::from(notice.clone()))
        .unwrap();
    assert_eq!(call(&app, unauthorized).await.0, StatusCode::UNAUTHORIZED);

    let request = Request::post("/webhooks/payment")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {PAY_SECRET}"))
        .body(Body::from(notice))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ride_id"], ride_id);
    assert_eq!(body["payment_status"], "paid");

    let ride = h.storage.get_ride(ride_id).await.unwrap().unwrap();
    assert_eq!(ride.payment_status, PaymentStatus::Paid);
    assert!(h.notifier.any_to_contains(CUSTOMER, "Payment received").await);
}

#[tokio::test]
async fn payment_callback_for_unknown_phone_is_not_found() {
    let (_h, app) = setup().await;
    let request = Request::post("/webhooks/payment")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {PAY_SECRET}"))
        .body(Body::from(json!({ "phone": "918888888888" }).to_string()))
        .unwrap();
    assert_eq!(call(&app, request).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auto_assignment_can_be_toggled() {
    let (h, app) = setup().await;
    let uri = "/admin/settings/auto-assignment";

    let (_, body) = call(&app, admin("GET", uri, None)).await;
    assert_eq!(body["enabled"], true);

    let (status, _) = call(&app, admin("PUT", uri, Some(json!({ "enabled": false })))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!h.storage.auto_assignment_enabled().await.unwrap());
}

#[tokio::test]
async fn rides_can_be_filtered_by_status() {
    let (h, app) = setup().await;
    h.add_fleet("sedan", 1).await;
    book_ride(&h).await;

    let (status, body) = call(&app, admin("GET", "/admin/rides?status=assigned", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = call(&app, admin("GET", "/admin/rides?status=prebooked", None)).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = call(&app, admin("GET", "/admin/rides?status=flying", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fleet_and_pricing_can_be_managed() {
    let (h, app) = setup().await;

    let (status, vehicle) = call(
        &app,
        admin(
            "POST",
            "/admin/vehicles",
            Some(json!({
                "plate_number": "KA05MN4321",
                "model": "Innova",
                "car_type": "suv",
                "rate_per_km": 15.0
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let car_id = vehicle["id"].as_i64().unwrap();

    let (status, driver) = call(
        &app,
        admin(
            "POST",
            "/admin/drivers",
            Some(json!({ "name": "Manju", "phone": "+91 98450 00000", "car_id": car_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(driver["phone"], "919845000000");
    let driver_id = driver["id"].as_i64().unwrap();

    let (status, _) = call(
        &app,
        admin(
            "PUT",
            &format!("/admin/drivers/{driver_id}/location"),
            Some(json!({ "latitude": 12.9352, "longitude": 77.6245 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let stored = h.storage.get_driver(driver_id).await.unwrap().unwrap();
    assert_eq!(stored.last_latitude, Some(12.9352));

    let (status, _) = call(
        &app,
        admin(
            "PUT",
            &format!("/admin/drivers/{driver_id}/location"),
            Some(json!({ "latitude": 120.0, "longitude": 77.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        admin(
            "PUT",
            "/admin/pricing",
            Some(json!({ "vehicle_type": "suv", "price_per_km": 18.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.storage.rate_for_type("suv").await.unwrap(), Some(18.0));

    let (_, drivers) = call(&app, admin("GET", "/admin/drivers", None)).await;
    assert_eq!(drivers.as_array().unwrap().len(), 1);
    let (_, vehicles) = call(&app, admin("GET", "/admin/vehicles", None)).await;
    assert_eq!(vehicles.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn broadcast_reaches_registered_customers() {
    let (h, app) = setup().await;
    h.register(CUSTOMER, "Asha").await;
    h.register("919000000002", "Ravi").await;
    h.notifier.clear_sent().await;

    let (status, body) = call(
        &app,
        admin(
            "POST",
            "/admin/broadcast",
            Some(json!({ "message": "Diwali offer: 10% off tonight" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipients"], 2);
    assert_eq!(body["sent"], 2);
    assert!(h.notifier.any_to_contains(CUSTOMER, "Diwali offer").await);

    let (status, _) = call(
        &app,
        admin("POST", "/admin/broadcast", Some(json!({ "message": "  " }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ride_is_not_found() {
    let (_h, app) = setup().await;
    let (status, body) = call(&app, admin("GET", "/admin/rides/404", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

fn public_post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn customer_login_checks_the_password() {
    let (h, app) = setup().await;
    h.add_fleet("sedan", 1).await;
    book_ride(&h).await;

    let login = json!({ "phone": "+91 90000 00001", "password": TEST_PASSWORD });
    let (status, body) = call(&app, public_post("/login", login)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Asha");
    assert!(body["user"].get("password_hash").is_none());
    assert_eq!(body["rides"].as_array().unwrap().len(), 1);

    let wrong = json!({ "phone": CUSTOMER, "password": "not-the-password" });
    let (status, body) = call(&app, public_post("/login", wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let stranger = json!({ "phone": "918888888888", "password": TEST_PASSWORD });
    assert_eq!(call(&app, public_post("/login", stranger)).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn owners_can_be_managed_and_log_in() {
    let (_h, app) = setup().await;
    let owner = json!({
        "name": "Kavya",
        "email": "Kavya@Fleet.in",
        "phone": "+91 90000 00077",
        "password": "owner-pass"
    });
    let (status, created) = call(&app, admin("POST", "/admin/owners", Some(owner))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["email"], "kavya@fleet.in");
    assert_eq!(created["phone"], "919000000077");
    assert!(created.get("password_hash").is_none());
    let id = created["id"].as_i64().unwrap();

    let login = json!({ "email": "kavya@fleet.in", "password": "owner-pass" });
    let (status, body) = call(&app, public_post("/owner/login", login)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    let bad = json!({ "email": "kavya@fleet.in", "password": "guess" });
    assert_eq!(call(&app, public_post("/owner/login", bad)).await.0, StatusCode::UNAUTHORIZED);

    let short = json!({ "name": "K", "email": "k@fleet.in", "phone": "1", "password": "x" });
    let (status, _) = call(&app, admin("POST", "/admin/owners", Some(short))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let edit = json!({
        "name": "Kavya R",
        "email": "kavya@fleet.in",
        "phone": "919000000078",
        "password": "owner-pass-2"
    });
    let uri = format!("/admin/owners/{id}");
    let (status, body) = call(&app, admin("PUT", &uri, Some(edit))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Kavya R");

    let (_, owners) = call(&app, admin("GET", "/admin/owners", None)).await;
    assert_eq!(owners.as_array().unwrap().len(), 1);

    assert_eq!(call(&app, admin("DELETE", &uri, None)).await.0, StatusCode::NO_CONTENT);
    assert_eq!(call(&app, admin("DELETE", &uri, None)).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancelling_a_ride_frees_the_driver_and_tells_both_sides() {
    let (h, app) = setup().await;
    let fleet = h.add_fleet("sedan", 1).await;
    let ride_id = book_ride(&h).await;
    let (driver, vehicle) = &fleet[0];

    let uri = format!("/admin/rides/{ride_id}/cancel");
    let (status, body) = call(&app, admin("POST", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let driver_now = h.storage.get_driver(driver.id).await.unwrap().unwrap();
    assert_eq!(driver_now.status, ResourceStatus::Free);
    let vehicle_now = h.storage.get_vehicle(vehicle.id).await.unwrap().unwrap();
    assert_eq!(vehicle_now.status, ResourceStatus::Free);
    assert!(h.notifier.any_to_contains(CUSTOMER, "has been cancelled").await);
    assert!(h.notifier.any_to_contains(&driver.phone, "has been cancelled").await);

    let (status, _) = call(&app, admin("POST", &uri, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = call(&app, admin("POST", "/admin/rides/404/cancel", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rides_can_be_edited_and_deleted() {
    let (h, app) = setup().await;
    h.add_fleet("sedan", 1).await;
    let ride_id = book_ride(&h).await;
    let uri = format!("/admin/rides/{ride_id}");

    let edit = json!({ "pickup": "MG Road", "fare": 150.0 });
    let (status, body) = call(&app, admin("PUT", &uri, Some(edit))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pickup"], "MG Road");
    assert_eq!(body["fare"], 150.0);

    let negative = json!({ "fare": -5.0 });
    let (status, _) = call(&app, admin("PUT", &uri, Some(negative))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let complete = format!("/admin/rides/{ride_id}/complete");
    assert_eq!(call(&app, admin("POST", &complete, None)).await.0, StatusCode::OK);

    let late = json!({ "destination": "Airport" });
    let (status, _) = call(&app, admin("PUT", &uri, Some(late))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let paid = json!({ "payment_status": "paid" });
    let (status, body) = call(&app, admin("PUT", &uri, Some(paid))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "paid");

    assert_eq!(call(&app, admin("DELETE", &uri, None)).await.0, StatusCode::NO_CONTENT);
    assert_eq!(call(&app, admin("GET", &uri, None)).await.0, StatusCode::NOT_FOUND);
    assert_eq!(call(&app, admin("DELETE", &uri, None)).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn busy_drivers_and_vehicles_cannot_be_deleted() {
    let (h, app) = setup().await;
    let fleet = h.add_fleet("sedan", 1).await;
    let ride_id = book_ride(&h).await;
    let (driver, vehicle) = &fleet[0];
    let driver_uri = format!("/admin/drivers/{}", driver.id);
    let vehicle_uri = format!("/admin/vehicles/{}", vehicle.id);

    let (status, _) = call(&app, admin("DELETE", &driver_uri, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = call(&app, admin("DELETE", &vehicle_uri, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let rename = json!({ "name": "Manju K", "phone": driver.phone, "car_id": vehicle.id });
    let (status, body) = call(&app, admin("PUT", &driver_uri, Some(rename))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Manju K");

    let retype = json!({
        "plate_number": vehicle.plate_number,
        "model": "Ciaz",
        "car_type": "Sedan",
        "rate_per_km": 13.0
    });
    let (status, body) = call(&app, admin("PUT", &vehicle_uri, Some(retype))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "Ciaz");
    assert_eq!(body["car_type"], "sedan");

    let complete = format!("/admin/rides/{ride_id}/complete");
    assert_eq!(call(&app, admin("POST", &complete, None)).await.0, StatusCode::OK);

    let (status, _) = call(&app, admin("DELETE", &vehicle_uri, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let unbound = h.storage.get_driver(driver.id).await.unwrap().unwrap();
    assert_eq!(unbound.car_id, None);

    let (status, _) = call(&app, admin("DELETE", &driver_uri, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, admin("DELETE", &driver_uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The finished ride outlives its driver and car.
    let (status, _) = call(&app, admin("GET", &format!("/admin/rides/{ride_id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn revenue_is_reported_per_period() {
    let (h, app) = setup().await;
    h.add_fleet("sedan", 1).await;
    let ride_id = book_ride(&h).await;
    h.storage
        .set_payment_status(ride_id, PaymentStatus::Paid)
        .await
        .unwrap();

    let (status, body) = call(&app, admin("GET", "/admin/revenue?period=monthly", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "period": "2026-10", "revenue": 120.0 }]));

    let (_, body) = call(&app, admin("GET", "/admin/revenue?period=yearly", None)).await;
    assert_eq!(body[0]["period"], "2026");

    let (_, body) = call(&app, admin("GET", "/admin/revenue", None)).await;
    assert_eq!(body[0]["period"], "2026-10");

    let (status, _) = call(&app, admin("GET", "/admin/revenue?period=daily", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn coupons_can_be_managed() {
    let (_h, app) = setup().await;

    let (status, body) = call(&app, admin("GET", "/admin/coupons", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let coupon = json!({ "code": "diwali50", "discount": 50.0 });
    let (status, body) = call(&app, admin("POST", "/admin/coupons", Some(coupon))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"], "DIWALI50");
    assert_eq!(body["used"], false);

    let negative = json!({ "code": "OOPS", "discount": -1.0 });
    let (status, _) = call(&app, admin("POST", "/admin/coupons", Some(negative))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = "/admin/coupons/DIWALI50";
    assert_eq!(call(&app, admin("DELETE", uri, None)).await.0, StatusCode::NO_CONTENT);
    assert_eq!(call(&app, admin("DELETE", uri, None)).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invoice_shows_the_coupon_discount() {
    let (h, app) = setup().await;
    h.add_fleet("sedan", 1).await;
    h.register(CUSTOMER, "Asha").await;
    h.quote(CUSTOMER, "date_today", "3:00 PM", "sedan").await;
    h.send(CUSTOMER, "coupon save20").await.unwrap();
    let ride_id = h
        .press(CUSTOMER, "confirm_ride")
        .await
        .unwrap()
        .ride_id
        .unwrap();
    assert!(h.notifier.any_to_contains(CUSTOMER, "Total: ₹105.00").await);

    let uri = format!("/admin/rides/{ride_id}/invoice");
    let (status, body) = call(&app, admin("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subtotal"], 120.0);
    assert_eq!(body["discount"], 20.0);
    assert_eq!(body["coupon_code"], "SAVE20");
    assert_eq!(body["tax"], 5.0);
    assert_eq!(body["total"], 105.0);
}
