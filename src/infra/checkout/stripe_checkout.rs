use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};
use crate::domain::models::payment::{CheckoutSession, PaymentOrder};
use crate::domain::ports::CheckoutProvider;
use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct StripeSettings {
    pub api_base: String,
    pub api_key: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

pub struct StripeCheckoutProvider {
    client: Client,
    settings: StripeSettings,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeCheckoutProvider {
    pub fn new(settings: StripeSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, settings })
    }

    fn form_for(&self, order: &PaymentOrder, customer_email: &str) -> Result<Vec<(String, String)>, AppError> {
        let unit_amount = (order.amount * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| AppError::PaymentGateway(format!("Amount {} cannot be charged", order.amount)))?;

        let success = self.settings.success_url.trim_end_matches('/');
        let cancel = self.settings.cancel_url.trim_end_matches('/');

        Ok(vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("line_items[0][quantity]".into(), "1".into()),
            ("line_items[0][price_data][currency]".into(), self.settings.currency.clone()),
            ("line_items[0][price_data][unit_amount]".into(), unit_amount.to_string()),
            ("line_items[0][price_data][product_data][name]".into(), format!("Salon Booking #{}", order.id)),
            ("customer_email".into(), customer_email.to_string()),
            ("metadata[orderId]".into(), order.id.clone()),
            ("success_url".into(), format!("{}/{}", success, order.id)),
            ("cancel_url".into(), format!("{}/{}", cancel, order.id)),
        ])
    }
}

#[async_trait]
impl CheckoutProvider for StripeCheckoutProvider {
    async fn create_session(&self, order: &PaymentOrder, customer_email: &str) -> Result<CheckoutSession, AppError> {
        let form = self.form_for(order, customer_email)?;
        let url = format!("{}/v1/checkout/sessions", self.settings.api_base.trim_end_matches('/'));

        let res = self.client.post(&url)
            .bearer_auth(&self.settings.api_key)
            .header("Idempotency-Key", &order.id)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Checkout provider connection error: {}", e);
                error!("{}", msg);
                AppError::PaymentGateway(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::PaymentGateway(format!("Checkout session rejected. Status: {}, Body: {}", status, text)));
        }

        let session: SessionResponse = res.json().await
            .map_err(|e| AppError::PaymentGateway(format!("Unreadable checkout session: {}", e)))?;
        let url = session.url
            .ok_or_else(|| AppError::PaymentGateway(format!("Checkout session {} has no url", session.id)))?;

        info!(order_id = %order.id, session_id = %session.id, "Checkout session created");
        Ok(CheckoutSession { id: session.id, url })
    }
}
