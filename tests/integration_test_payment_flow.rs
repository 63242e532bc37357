mod common;

use axum::http::StatusCode;
use chrono::Utc;
use async_trait::async_trait;
use common::{
    body_text, checkout_event, order_id_from_link, parse_body, session_id_for, sign_webhook, TestApp,
    CUSTOMER, OTHER_OWNER, OWNER, SALON, WEBHOOK_SECRET,
};
use salon_booking::domain::models::outbox::OutboxMessage;
use salon_booking::domain::models::payment::{PaymentOrder, PaymentOrderStatus};
use salon_booking::domain::ports::PaymentOrderRepository;
use salon_booking::error::AppError;
use salon_booking::infra::factory::sqlite_repositories;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Simulates a competing writer by bumping the order's version right before
/// the next `interleavings` compare-and-set attempts.
struct InterleavingOrders {
    inner: Arc<dyn PaymentOrderRepository>,
    pool: SqlitePool,
    interleavings: AtomicUsize,
}

#[async_trait]
impl PaymentOrderRepository for InterleavingOrders {
    async fn create(&self, order: &PaymentOrder) -> Result<PaymentOrder, AppError> {
        self.inner.create(order).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentOrder>, AppError> {
        self.inner.find_by_id(id).await
    }

    async fn set_session_id(&self, id: &str, session_id: &str) -> Result<(), AppError> {
        self.inner.set_session_id(id, session_id).await
    }

    async fn apply_status(
        &self,
        id: &str,
        expected_version: i64,
        status: PaymentOrderStatus,
        message: Option<OutboxMessage>,
    ) -> Result<bool, AppError> {
        let interleave = self.interleavings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if interleave {
            sqlx::query("UPDATE payment_orders SET version = version + 1 WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .unwrap();
        }
        self.inner.apply_status(id, expected_version, status, message).await
    }
}

async fn app_with_interleavings(interleavings: usize) -> TestApp {
    TestApp::with_payment_orders(move |inner, pool| {
        Arc::new(InterleavingOrders { inner, pool, interleavings: AtomicUsize::new(interleavings) })
            as Arc<dyn PaymentOrderRepository>
    }).await
}

fn order_request(booking_id: &str, amount: &str) -> Value {
    json!({
        "bookingId": booking_id,
        "customerUserId": CUSTOMER,
        "salonId": SALON,
        "totalAmount": amount,
        "paymentMethod": "STRIPE",
        "customerUserEmail": "customer@example.com"
    })
}

async fn booked(app: &TestApp) -> (String, String) {
    let response = app.create_booking("2030-01-07T10:00:00", &["svc-cut", "svc-color"]).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let booking_id = app.only_booking_id().await;
    let (order_id, _) = app.order_for_booking(&booking_id).await;
    (booking_id, order_id)
}

async fn deliver_event(app: &TestApp, kind: &str, session_id: &str, order_id: &str, payment_status: &str) -> (StatusCode, String) {
    let payload = checkout_event(kind, session_id, order_id, payment_status);
    let signature = sign_webhook(&payload, WEBHOOK_SECRET, Utc::now().timestamp());
    let response = app.post_webhook(&payload, &signature).await;
    let status = response.status();
    (status, body_text(response).await)
}

async fn booking_status(app: &TestApp, booking_id: &str) -> String {
    let response = app.send("GET", &format!("/api/v1/bookings/{}", booking_id), Some(CUSTOMER), None).await;
    parse_body(response).await["status"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_completed_checkout_confirms_booking_and_notifies_both_parties() {
    let app = TestApp::new().await;
    let (booking_id, order_id) = booked(&app).await;

    let (status, body) = deliver_event(&app, "checkout.session.completed", &session_id_for(&order_id), &order_id, "paid").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success");

    let (_, order_status) = app.order_for_booking(&booking_id).await;
    assert_eq!(order_status, "SUCCESS");

    // Payment completed, then the two notification requests.
    assert_eq!(app.drain_outbox().await, 3);

    assert_eq!(booking_status(&app, &booking_id).await, "CONFIRMED");
    assert_eq!(app.count("SELECT COUNT(*) FROM notifications").await, 2);
    assert_eq!(app.count("SELECT COUNT(*) FROM notifications WHERE user_id = 'cust-1'").await, 1);
    assert_eq!(app.count("SELECT COUNT(*) FROM notifications WHERE salon_id = 'salon-1'").await, 1);
    assert_eq!(app.count("SELECT COUNT(*) FROM outbox_messages WHERE status <> 'DELIVERED'").await, 0);
}

#[tokio::test]
async fn test_replayed_completion_does_not_duplicate_notifications() {
    let app = TestApp::new().await;
    let (booking_id, order_id) = booked(&app).await;
    let session_id = session_id_for(&order_id);

    deliver_event(&app, "checkout.session.completed", &session_id, &order_id, "paid").await;
    app.drain_outbox().await;

    let (status, _) = deliver_event(&app, "checkout.session.completed", &session_id, &order_id, "paid").await;
    assert_eq!(status, StatusCode::OK);
    app.drain_outbox().await;

    assert_eq!(booking_status(&app, &booking_id).await, "CONFIRMED");
    assert_eq!(app.count("SELECT COUNT(*) FROM notifications").await, 2);
}

#[tokio::test]
async fn test_session_mismatch_is_acknowledged_and_ignored() {
    let app = TestApp::new().await;
    let (booking_id, order_id) = booked(&app).await;

    let (status, body) = deliver_event(&app, "checkout.session.completed", "cs_test_forged", &order_id, "paid").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success");

    let (_, order_status) = app.order_for_booking(&booking_id).await;
    assert_eq!(order_status, "PENDING");
    assert_eq!(app.drain_outbox().await, 0);
    assert_eq!(booking_status(&app, &booking_id).await, "PENDING");
}

#[tokio::test]
async fn test_unknown_order_is_acknowledged() {
    let app = TestApp::new().await;

    let (status, body) = deliver_event(&app, "checkout.session.completed", "cs_test_x", "missing-order", "paid").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success");
}

#[tokio::test]
async fn test_async_success_updates_order_but_leaves_booking_pending() {
    let app = TestApp::new().await;
    let (booking_id, order_id) = booked(&app).await;

    let (status, _) = deliver_event(
        &app,
        "checkout.session.async_payment_succeeded",
        &session_id_for(&order_id),
        &order_id,
        "paid",
    ).await;
    assert_eq!(status, StatusCode::OK);

    let (_, order_status) = app.order_for_booking(&booking_id).await;
    assert_eq!(order_status, "SUCCESS");
    assert_eq!(app.drain_outbox().await, 0);
    assert_eq!(booking_status(&app, &booking_id).await, "PENDING");
}

#[tokio::test]
async fn test_unpaid_completion_fails_the_order() {
    let app = TestApp::new().await;
    let (booking_id, order_id) = booked(&app).await;

    deliver_event(&app, "checkout.session.completed", &session_id_for(&order_id), &order_id, "unpaid").await;

    let (_, order_status) = app.order_for_booking(&booking_id).await;
    assert_eq!(order_status, "FAILED");
    assert_eq!(app.drain_outbox().await, 0);
    assert_eq!(booking_status(&app, &booking_id).await, "PENDING");
}

#[tokio::test]
async fn test_expired_session_marks_order_expired() {
    let app = TestApp::new().await;
    let (booking_id, order_id) = booked(&app).await;

    deliver_event(&app, "checkout.session.expired", &session_id_for(&order_id), &order_id, "unpaid").await;

    let (_, order_status) = app.order_for_booking(&booking_id).await;
    assert_eq!(order_status, "EXPIRED");
}

#[tokio::test]
async fn test_unrecognized_event_type_is_acknowledged() {
    let app = TestApp::new().await;
    let (booking_id, order_id) = booked(&app).await;

    let (status, body) = deliver_event(&app, "customer.created", "cus_1", &order_id, "paid").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success");

    let (_, order_status) = app.order_for_booking(&booking_id).await;
    assert_eq!(order_status, "PENDING");
}

#[tokio::test]
async fn test_invalid_signature_is_rejected_before_parsing() {
    let app = TestApp::new().await;
    let (booking_id, order_id) = booked(&app).await;

    let payload = checkout_event("checkout.session.completed", &session_id_for(&order_id), &order_id, "paid");
    let signature = sign_webhook(&payload, "whsec_wrong", Utc::now().timestamp());

    let response = app.post_webhook(&payload, &signature).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid signature");

    let stale = sign_webhook(&payload, WEBHOOK_SECRET, Utc::now().timestamp() - 3600);
    let response = app.post_webhook(&payload, &stale).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, order_status) = app.order_for_booking(&booking_id).await;
    assert_eq!(order_status, "PENDING");
}

#[tokio::test]
async fn test_malformed_signed_payload_is_a_server_error() {
    let app = TestApp::new().await;

    let payload = "{not json";
    let signature = sign_webhook(payload, WEBHOOK_SECRET, Utc::now().timestamp());

    let response = app.post_webhook(payload, &signature).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Error processing webhook");
}

#[tokio::test]
async fn test_direct_order_creation_and_lookup() {
    let app = TestApp::new().await;
    app.create_booking("2030-01-07T10:00:00", &["svc-cut"]).await;
    let booking_id = app.only_booking_id().await;

    let response = app.send("POST", "/api/v1/payments/create", Some(CUSTOMER), Some(order_request(&booking_id, "25.00"))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order_id = order_id_from_link(&parse_body(response).await);

    let response = app.send("GET", &format!("/api/v1/payments/{}", order_id), Some(OWNER), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let order = parse_body(response).await;
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["bookingId"], booking_id.as_str());
    assert_eq!(order["amount"], "25.00");
    assert_eq!(order["sessionId"], session_id_for(&order_id));

    let response = app.send("GET", &format!("/api/v1/payments/{}", order_id), Some(CUSTOMER), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send("GET", &format!("/api/v1/payments/{}", order_id), Some(OTHER_OWNER), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_order_must_match_its_booking() {
    let app = TestApp::new().await;
    let (booking_id, _) = booked(&app).await;

    let cheap = order_request(&booking_id, "0.01");
    let response = app.send("POST", "/api/v1/payments/create", Some(OTHER_OWNER), Some(cheap)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parse_body(response).await["detail"], "Payment amount does not match the booking total");

    let mut other_salon = order_request(&booking_id, "65.50");
    other_salon["salonId"] = json!("salon-2");
    let response = app.send("POST", "/api/v1/payments/create", Some(CUSTOMER), Some(other_salon)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut other_customer = order_request(&booking_id, "65.50");
    other_customer["customerUserId"] = json!(OTHER_OWNER);
    let response = app.send("POST", "/api/v1/payments/create", Some(OTHER_OWNER), Some(other_customer)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send("POST", "/api/v1/payments/create", Some(CUSTOMER), Some(order_request("no-such-booking", "65.50"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Only the order created with the booking exists.
    assert_eq!(app.count("SELECT COUNT(*) FROM payment_orders").await, 1);
    assert_eq!(booking_status(&app, &booking_id).await, "PENDING");
}

#[tokio::test]
async fn test_no_new_order_for_a_confirmed_booking() {
    let app = TestApp::new().await;
    let (booking_id, order_id) = booked(&app).await;

    deliver_event(&app, "checkout.session.completed", &session_id_for(&order_id), &order_id, "paid").await;
    app.drain_outbox().await;
    assert_eq!(booking_status(&app, &booking_id).await, "CONFIRMED");

    let response = app.send("POST", "/api/v1/payments/create", Some(CUSTOMER), Some(order_request(&booking_id, "65.50"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.count("SELECT COUNT(*) FROM payment_orders").await, 1);
}

#[tokio::test]
async fn test_stale_version_loses_the_compare_and_set() {
    let app = TestApp::new().await;
    let (_, order_id) = booked(&app).await;
    let orders = sqlite_repositories(app.pool.clone()).payment_orders;

    let read = orders.find_by_id(&order_id).await.unwrap().unwrap();
    assert!(orders.apply_status(&order_id, read.version, PaymentOrderStatus::Expired, None).await.unwrap());
    assert!(!orders.apply_status(&order_id, read.version, PaymentOrderStatus::Success, None).await.unwrap());

    let stored = orders.find_by_id(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentOrderStatus::Expired);
    assert_eq!(stored.version, read.version + 1);
}

#[tokio::test]
async fn test_webhook_rereads_order_changed_concurrently() {
    let app = app_with_interleavings(2).await;
    let (booking_id, order_id) = booked(&app).await;
    let version_before: i64 = sqlx::query_scalar("SELECT version FROM payment_orders WHERE id = ?")
        .bind(&order_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let (status, body) = deliver_event(&app, "checkout.session.completed", &session_id_for(&order_id), &order_id, "paid").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Success");

    let version_after: i64 = sqlx::query_scalar("SELECT version FROM payment_orders WHERE id = ?")
        .bind(&order_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    // Two competing writes plus the winning one.
    assert_eq!(version_after, version_before + 3);

    assert_eq!(app.order_for_booking(&booking_id).await.1, "SUCCESS");
    assert_eq!(app.drain_outbox().await, 3);
    assert_eq!(booking_status(&app, &booking_id).await, "CONFIRMED");
}

#[tokio::test]
async fn test_webhook_fails_when_order_keeps_changing() {
    let app = app_with_interleavings(usize::MAX).await;
    let (booking_id, order_id) = booked(&app).await;

    let (status, body) = deliver_event(&app, "checkout.session.completed", &session_id_for(&order_id), &order_id, "paid").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error processing webhook");

    assert_eq!(app.order_for_booking(&booking_id).await.1, "PENDING");
    assert_eq!(app.count("SELECT COUNT(*) FROM outbox_messages").await, 0);
    assert_eq!(booking_status(&app, &booking_id).await, "PENDING");
}

#[tokio::test]
async fn test_non_positive_amount_is_rejected() {
    let app = TestApp::new().await;

    let response = app.send("POST", "/api/v1/payments/create", Some(CUSTOMER), Some(order_request("booking-9", "0"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.count("SELECT COUNT(*) FROM payment_orders").await, 0);
}
