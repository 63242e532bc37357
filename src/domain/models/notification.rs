use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use crate::domain::models::outbox::NotificationRequest;

pub const NOTIFICATION_TYPE_BOOKING: &str = "BOOKING";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(skip)]
    pub source_message_id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub description: String,
    pub user_id: Option<String>,
    pub salon_id: Option<String>,
    pub booking_id: String,
    #[serde(rename = "read")]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// `source_message_id` is the relay message that carried the request;
    /// it is what makes redelivery of the same message a no-op.
    pub fn from_request(source_message_id: &str, request: NotificationRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_message_id: source_message_id.to_string(),
            notification_type: request.notification_type,
            description: request.description,
            user_id: request.user_id,
            salon_id: request.salon_id,
            booking_id: request.booking_id,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}
