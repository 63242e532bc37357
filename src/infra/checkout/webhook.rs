use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use crate::domain::models::payment::{CheckoutEvent, CheckoutSessionObject};
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age, in seconds, of a signed webhook timestamp.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verifies a `t=<unix>,v1=<hex>[,v1=<hex>...]` signature header against the
/// raw request body.
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<(), AppError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;
    if signatures.is_empty() || (now_unix - timestamp).abs() > tolerance_secs {
        return Err(AppError::InvalidSignature);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter()
        .filter_map(|sig| hex::decode(sig).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());

    if matched { Ok(()) } else { Err(AppError::InvalidSignature) }
}

#[derive(Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    data: Option<EventData>,
}

#[derive(Deserialize)]
struct EventData {
    object: serde_json::Value,
}

pub fn decode_event(payload: &[u8]) -> Result<CheckoutEvent, AppError> {
    let envelope: EventEnvelope = serde_json::from_slice(payload)
        .map_err(|e| AppError::InternalWithMsg(format!("Malformed webhook payload: {}", e)))?;

    let wrap: Option<fn(CheckoutSessionObject) -> CheckoutEvent> = match envelope.kind.as_str() {
        "checkout.session.completed" => Some(CheckoutEvent::Completed),
        "checkout.session.async_payment_succeeded" => Some(CheckoutEvent::AsyncPaymentSucceeded),
        "checkout.session.async_payment_failed" => Some(CheckoutEvent::AsyncPaymentFailed),
        "checkout.session.expired" => Some(CheckoutEvent::Expired),
        _ => None,
    };
    let Some(wrap) = wrap else {
        return Ok(CheckoutEvent::Unrecognized(envelope.kind));
    };

    let object = envelope.data
        .ok_or_else(|| AppError::InternalWithMsg(format!("{} event without data", envelope.kind)))?
        .object;
    let session: CheckoutSessionObject = serde_json::from_value(object)
        .map_err(|e| AppError::InternalWithMsg(format!("Malformed checkout session: {}", e)))?;

    Ok(wrap(session))
}

#[cfg(test)]
pub(crate) fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
