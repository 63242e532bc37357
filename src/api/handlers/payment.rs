use axum::{
    body::Bytes,
    extract::{State, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::domain::models::payment::PaymentOrderRequest;
use crate::error::AppError;
use crate::infra::checkout::webhook::{decode_event, verify_signature, SIGNATURE_TOLERANCE_SECS};
use std::sync::Arc;
use chrono::Utc;
use tracing::{error, info, warn};

const SIGNATURE_HEADERS: [&str; 2] = ["Stripe-Signature", "Signature"];

pub async fn create_payment_link(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<PaymentOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let link = state.payment_service.create_order(&user.user_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn get_payment_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.payment_service.get_order(&order_id, &user.user_id).await?;
    Ok(Json(order))
}

/// Provider callback. Answers in plain text; only a bad signature is a
/// client error, everything else that goes wrong is reported as 500.
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = SIGNATURE_HEADERS.iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok());

    let Some(signature) = signature else {
        warn!("Webhook without signature header");
        return (StatusCode::BAD_REQUEST, "Invalid signature");
    };

    if verify_signature(
        signature,
        &body,
        &state.config.stripe_webhook_secret,
        Utc::now().timestamp(),
        SIGNATURE_TOLERANCE_SECS,
    ).is_err() {
        warn!("Webhook signature rejected");
        return (StatusCode::BAD_REQUEST, "Invalid signature");
    }

    let outcome = match decode_event(&body) {
        Ok(event) => {
            info!(event_type = event.kind(), "Webhook received");
            state.payment_service.handle_event(event).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => (StatusCode::OK, "Success"),
        Err(e) => {
            error!("Webhook processing failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook")
        }
    }
}
