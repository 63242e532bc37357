use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use crate::config::messaging;
use crate::error::AppError;

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_PROCESSING: &str = "PROCESSING";
pub const STATUS_DELIVERED: &str = "DELIVERED";
pub const STATUS_DEAD: &str = "DEAD";

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct OutboxMessage {
    pub id: String,
    pub queue: String,
    pub payload: Json<serde_json::Value>,
    pub status: String,
    pub attempts: i32,
    pub available_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OutboxMessage {
    /// Builds a message routed through the direct binding of `routing_key`.
    pub fn new<T: Serialize>(routing_key: &str, payload: &T) -> Result<Self, AppError> {
        let queue = messaging::queue_for(routing_key)
            .ok_or_else(|| AppError::InternalWithMsg(format!("No queue bound to routing key {}", routing_key)))?;
        let payload = serde_json::to_value(payload)
            .map_err(|e| AppError::InternalWithMsg(format!("Failed to encode message payload: {}", e)))?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            queue: queue.to_string(),
            payload: Json(payload),
            status: STATUS_PENDING.to_string(),
            attempts: 0,
            available_at: now,
            claimed_at: None,
            last_error: None,
            created_at: now,
        })
    }

    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, AppError> {
        serde_json::from_value(self.payload.0.clone())
            .map_err(|e| AppError::Validation(format!("Malformed payload on message {}: {}", self.id, e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompletedEvent {
    pub booking_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: String,
    pub description: String,
    pub user_id: Option<String>,
    pub salon_id: Option<String>,
    pub booking_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_binding() {
        let msg = OutboxMessage::new(
            messaging::PAYMENT_COMPLETED_ROUTING_KEY,
            &PaymentCompletedEvent { booking_id: "b-1".into() },
        ).unwrap();

        assert_eq!(msg.queue, messaging::BOOKING_QUEUE);
        assert_eq!(msg.status, STATUS_PENDING);
        assert_eq!(msg.payload.0["bookingId"], "b-1");
        assert_eq!(msg.decode::<PaymentCompletedEvent>().unwrap().booking_id, "b-1");
    }

    #[test]
    fn unknown_routing_key_is_rejected() {
        let result = OutboxMessage::new("nowhere", &serde_json::json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn notification_request_uses_type_field() {
        let req = NotificationRequest {
            notification_type: "BOOKING".into(),
            description: "New booking confirmed".into(),
            user_id: None,
            salon_id: Some("s-1".into()),
            booking_id: "b-1".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["type"], "BOOKING");
        assert!(value["userId"].is_null());
    }
}
