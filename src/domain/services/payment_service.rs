use std::sync::Arc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use crate::config::messaging;
use crate::domain::models::{
    booking::BookingStatus,
    outbox::{OutboxMessage, PaymentCompletedEvent},
    payment::{CheckoutEvent, CheckoutSessionObject, PaymentLink, PaymentOrder, PaymentOrderRequest, PaymentOrderStatus},
};
use crate::domain::ports::{BookingRepository, CheckoutProvider, PaymentOrderRepository, SalonDirectory};
use crate::error::AppError;

/// Attempts at the read-compare-write cycle before a concurrent webhook is
/// reported as a conflict.
const MAX_VERSION_RETRIES: usize = 3;

pub struct PaymentService {
    orders: Arc<dyn PaymentOrderRepository>,
    checkout: Arc<dyn CheckoutProvider>,
    bookings: Arc<dyn BookingRepository>,
    salons: Arc<dyn SalonDirectory>,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn PaymentOrderRepository>,
        checkout: Arc<dyn CheckoutProvider>,
        bookings: Arc<dyn BookingRepository>,
        salons: Arc<dyn SalonDirectory>,
    ) -> Self {
        Self { orders, checkout, bookings, salons }
    }

    /// The request must describe a PENDING booking exactly: same salon, same
    /// customer and the booking's total as amount.
    pub async fn create_order(
        &self,
        acting_user_id: &str,
        request: &PaymentOrderRequest,
    ) -> Result<PaymentLink, AppError> {
        if request.total_amount <= Decimal::ZERO {
            return Err(AppError::Validation("Payment amount must be positive".into()));
        }

        let booking = self.bookings.find_by_id(&request.booking_id).await?
            .ok_or_else(|| AppError::Validation(format!("Unknown booking {}", request.booking_id)))?;

        if booking.status != BookingStatus::Pending {
            return Err(AppError::Validation(format!("Booking {} is not awaiting payment", booking.id)));
        }
        if booking.total_price != request.total_amount {
            warn!(booking_id = %booking.id, acting_user_id, requested = %request.total_amount, "Payment amount does not match booking total");
            return Err(AppError::Validation("Payment amount does not match the booking total".into()));
        }
        if booking.salon_id != request.salon_id {
            return Err(AppError::Validation("Salon does not match the booking".into()));
        }
        if booking.customer_user_id != request.customer_user_id {
            return Err(AppError::Validation("Customer does not match the booking".into()));
        }

        let order = self.orders.create(&PaymentOrder::new(request)).await?;
        info!(
            order_id = %order.id,
            booking_id = %order.booking_id,
            acting_user_id,
            "Payment order created"
        );

        // A failure here leaves the PENDING order without a session.
        let session = self.checkout.create_session(&order, &request.customer_user_email).await?;
        self.orders.set_session_id(&order.id, &session.id).await?;

        Ok(PaymentLink { payment_link_url: session.url })
    }

    /// Readable by the paying customer and by the salon's owner.
    pub async fn get_order(&self, order_id: &str, acting_user_id: &str) -> Result<PaymentOrder, AppError> {
        let order = self.orders.find_by_id(order_id).await?
            .ok_or(AppError::NotFound(format!("Payment order {} not found", order_id)))?;

        if order.customer_user_id != acting_user_id
            && self.salons.get_salon_by_id(&order.salon_id).await?.owner_user_id != acting_user_id
        {
            return Err(AppError::Forbidden("You are not allowed to view this payment order".into()));
        }
        Ok(order)
    }

    pub async fn handle_event(&self, event: CheckoutEvent) -> Result<(), AppError> {
        match event {
            CheckoutEvent::Completed(session) => {
                let status = if session.payment_status.as_deref() == Some("paid") {
                    PaymentOrderStatus::Success
                } else {
                    PaymentOrderStatus::Failed
                };
                self.apply(&session, status, status == PaymentOrderStatus::Success).await
            }
            CheckoutEvent::AsyncPaymentSucceeded(session) => {
                self.apply(&session, PaymentOrderStatus::Success, false).await
            }
            CheckoutEvent::AsyncPaymentFailed(session) => {
                self.apply(&session, PaymentOrderStatus::Failed, false).await
            }
            CheckoutEvent::Expired(session) => {
                self.apply(&session, PaymentOrderStatus::Expired, false).await
            }
            CheckoutEvent::Unrecognized(kind) => {
                info!(event_type = %kind, "Ignoring unhandled checkout event");
                Ok(())
            }
        }
    }

    /// Events that cannot be tied to a stored order by both metadata and
    /// session id are dropped.
    async fn apply(
        &self,
        session: &CheckoutSessionObject,
        status: PaymentOrderStatus,
        announce_completion: bool,
    ) -> Result<(), AppError> {
        let Some(order_id) = session.order_id() else {
            warn!(session_id = %session.id, "Checkout event without orderId metadata, dropping");
            return Ok(());
        };

        for attempt in 1..=MAX_VERSION_RETRIES {
            let Some(order) = self.orders.find_by_id(order_id).await? else {
                warn!(order_id, "Checkout event for unknown payment order, dropping");
                return Ok(());
            };

            if !order.matches_session(&session.id) {
                warn!(order_id, session_id = %session.id, "Session mismatch on checkout event, dropping");
                return Ok(());
            }

            let message = if announce_completion {
                Some(OutboxMessage::new(
                    messaging::PAYMENT_COMPLETED_ROUTING_KEY,
                    &PaymentCompletedEvent { booking_id: order.booking_id.clone() },
                )?)
            } else {
                None
            };

            if self.orders.apply_status(&order.id, order.version, status, message).await? {
                info!(order_id, status = %status, "Payment order updated");
                return Ok(());
            }

            debug!(order_id, attempt, "Payment order changed concurrently, re-reading");
        }

        Err(AppError::Conflict(format!("Payment order {} kept changing while applying {}", order_id, status)))
    }
}
