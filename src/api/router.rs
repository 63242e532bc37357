use axum::{
    body::Body,
    extract::Request,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{health, booking, payment, notification};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Bookings
        .route("/api/v1/bookings", post(booking::create_booking))
        .route("/api/v1/bookings/customer", get(booking::list_customer_bookings))
        .route("/api/v1/bookings/salon", get(booking::list_salon_bookings))
        .route("/api/v1/bookings/report", get(booking::get_salon_report))
        .route("/api/v1/bookings/booked-slots/{date}", get(booking::get_booked_slots))
        .route("/api/v1/bookings/{booking_id}", get(booking::get_booking))
        .route("/api/v1/bookings/{booking_id}/status", put(booking::update_booking_status))

        // Payments
        .route("/api/v1/payments/create", post(payment::create_payment_link))
        .route("/api/v1/payments/webhook", post(payment::handle_webhook))
        .route("/api/v1/payments/{order_id}", get(payment::get_payment_order))

        // Notifications
        .route("/api/v1/notifications/user", get(notification::list_user_notifications))
        .route("/api/v1/notifications/salon", get(notification::list_salon_notifications))
        .route("/api/v1/notifications/{notification_id}", delete(notification::delete_notification))
        .route("/api/v1/notifications/{notification_id}/read", put(notification::mark_notification_read))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
