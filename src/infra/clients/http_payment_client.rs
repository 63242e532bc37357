use async_trait::async_trait;
use crate::domain::models::payment::{PaymentLink, PaymentOrderRequest};
use crate::domain::ports::PaymentLinkClient;
use crate::error::AppError;
use super::collaborator_http::CollaboratorHttp;

/// Used when the payment component runs as a separate deployment.
pub struct HttpPaymentClient {
    http: CollaboratorHttp,
}

impl HttpPaymentClient {
    pub fn new(http: CollaboratorHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PaymentLinkClient for HttpPaymentClient {
    async fn create_payment_link(&self, request: &PaymentOrderRequest) -> Result<PaymentLink, AppError> {
        self.http.post_json(&["api", "v1", "payments", "create"], request, "Payment endpoint not found").await
    }
}
