use std::sync::Arc;
use async_trait::async_trait;
use tracing::info;
use crate::domain::models::outbox::{OutboxMessage, PaymentCompletedEvent};
use crate::domain::ports::MessageConsumer;
use crate::domain::services::booking_service::BookingService;
use crate::error::AppError;

/// Consumes "payment completed" messages. Duplicates are absorbed by
/// `confirm_booking`'s PENDING guard; no dedup table is kept.
pub struct BookingConfirmationHandler {
    bookings: Arc<BookingService>,
}

impl BookingConfirmationHandler {
    pub fn new(bookings: Arc<BookingService>) -> Self {
        Self { bookings }
    }
}

#[async_trait]
impl MessageConsumer for BookingConfirmationHandler {
    async fn consume(&self, message: &OutboxMessage) -> Result<(), AppError> {
        let event: PaymentCompletedEvent = message.decode()?;
        let transitioned = self.bookings.confirm_booking(&event.booking_id).await?;
        info!(booking_id = %event.booking_id, transitioned, "Payment completion handled");
        Ok(())
    }
}
