use std::sync::Arc;
use async_trait::async_trait;
use crate::domain::models::payment::{PaymentLink, PaymentOrderRequest};
use crate::domain::ports::PaymentLinkClient;
use crate::domain::services::payment_service::PaymentService;
use crate::error::AppError;

/// In-process link to the payment component when both run in one binary.
pub struct LocalPaymentClient {
    payments: Arc<PaymentService>,
}

impl LocalPaymentClient {
    pub fn new(payments: Arc<PaymentService>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl PaymentLinkClient for LocalPaymentClient {
    async fn create_payment_link(&self, request: &PaymentOrderRequest) -> Result<PaymentLink, AppError> {
        self.payments.create_order(&request.customer_user_id, request).await
    }
}
