use crate::domain::models::{
    booking::{Booking, BookingStatus},
    collaborators::{Salon, ServiceOffering, UserProfile},
    notification::Notification,
    outbox::OutboxMessage,
    payment::{CheckoutSession, PaymentLink, PaymentOrder, PaymentOrderRequest, PaymentOrderStatus},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn list_by_customer(&self, customer_user_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn list_by_salon(&self, salon_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn update_status(&self, id: &str, status: BookingStatus) -> Result<Option<Booking>, AppError>;
    /// Moves a PENDING booking to CONFIRMED and enqueues `messages` in the same
    /// transaction. Returns `false` when the booking was not PENDING.
    async fn confirm_pending(&self, id: &str, messages: Vec<OutboxMessage>) -> Result<bool, AppError>;
}

#[async_trait]
pub trait PaymentOrderRepository: Send + Sync {
    async fn create(&self, order: &PaymentOrder) -> Result<PaymentOrder, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentOrder>, AppError>;
    /// Only succeeds while no session is stored yet.
    async fn set_session_id(&self, id: &str, session_id: &str) -> Result<(), AppError>;
    /// Compare-and-set on `version`. `message` is enqueued in the same
    /// transaction when the update wins.
    async fn apply_status(
        &self,
        id: &str,
        expected_version: i64,
        status: PaymentOrderStatus,
        message: Option<OutboxMessage>,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    async fn publish(&self, message: &OutboxMessage) -> Result<(), AppError>;
    /// Claims due messages, including PROCESSING ones whose claim is older
    /// than `visibility`.
    async fn claim_batch(&self, limit: i32, visibility: Duration) -> Result<Vec<OutboxMessage>, AppError>;
    async fn mark_delivered(&self, id: &str) -> Result<(), AppError>;
    async fn mark_retry(&self, id: &str, attempts: i32, available_at: DateTime<Utc>, error: &str) -> Result<(), AppError>;
    async fn mark_dead(&self, id: &str, attempts: i32, error: &str) -> Result<(), AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<OutboxMessage>, AppError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Returns `false` when a notification for the same source message exists.
    async fn create_if_absent(&self, notification: &Notification) -> Result<bool, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Notification>, AppError>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Notification>, AppError>;
    async fn list_by_salon(&self, salon_id: &str) -> Result<Vec<Notification>, AppError>;
    async fn mark_read(&self, id: &str) -> Result<Option<Notification>, AppError>;
    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<UserProfile, AppError>;
}

#[async_trait]
pub trait SalonDirectory: Send + Sync {
    async fn get_salon_by_id(&self, salon_id: &str) -> Result<Salon, AppError>;
    async fn get_salon_by_owner(&self, owner_user_id: &str) -> Result<Salon, AppError>;
}

#[async_trait]
pub trait ServiceOfferingCatalog: Send + Sync {
    async fn get_offerings_by_ids(&self, ids: &[String]) -> Result<Vec<ServiceOffering>, AppError>;
}

#[async_trait]
pub trait PaymentLinkClient: Send + Sync {
    async fn create_payment_link(&self, request: &PaymentOrderRequest) -> Result<PaymentLink, AppError>;
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_session(&self, order: &PaymentOrder, customer_email: &str) -> Result<CheckoutSession, AppError>;
}

/// A relay destination. Implementations must tolerate redelivery.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    async fn consume(&self, message: &OutboxMessage) -> Result<(), AppError>;
}
