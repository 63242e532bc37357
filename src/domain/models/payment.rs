use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Stripe,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "STRIPE",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STRIPE" => Ok(PaymentMethod::Stripe),
            other => Err(AppError::Validation(format!("Unsupported payment method: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOrderStatus {
    Pending,
    Success,
    Failed,
    Expired,
}

impl PaymentOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOrderStatus::Pending => "PENDING",
            PaymentOrderStatus::Success => "SUCCESS",
            PaymentOrderStatus::Failed => "FAILED",
            PaymentOrderStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for PaymentOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentOrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentOrderStatus::Pending),
            "SUCCESS" => Ok(PaymentOrderStatus::Success),
            "FAILED" => Ok(PaymentOrderStatus::Failed),
            "EXPIRED" => Ok(PaymentOrderStatus::Expired),
            other => Err(AppError::InternalWithMsg(format!("Unknown payment status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub id: String,
    pub booking_id: String,
    pub customer_user_id: String,
    pub salon_id: String,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub session_id: Option<String>,
    pub status: PaymentOrderStatus,
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl PaymentOrder {
    pub fn new(request: &PaymentOrderRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id: request.booking_id.clone(),
            customer_user_id: request.customer_user_id.clone(),
            salon_id: request.salon_id.clone(),
            amount: request.total_amount,
            payment_method: request.payment_method,
            session_id: None,
            status: PaymentOrderStatus::Pending,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// A provider event only applies to this order when it carries the
    /// session id stored at checkout creation.
    pub fn matches_session(&self, session_id: &str) -> bool {
        self.session_id.as_deref() == Some(session_id)
    }
}

#[derive(Debug, FromRow)]
pub struct PaymentOrderRecord {
    pub id: String,
    pub booking_id: String,
    pub customer_user_id: String,
    pub salon_id: String,
    pub amount: String,
    pub payment_method: String,
    pub session_id: Option<String>,
    pub status: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PaymentOrderRecord> for PaymentOrder {
    type Error = AppError;

    fn try_from(record: PaymentOrderRecord) -> Result<Self, Self::Error> {
        let amount = Decimal::from_str(&record.amount)
            .map_err(|e| AppError::InternalWithMsg(format!("Corrupt amount on payment order {}: {}", record.id, e)))?;

        Ok(PaymentOrder {
            payment_method: record.payment_method.parse()?,
            status: record.status.parse()?,
            id: record.id,
            booking_id: record.booking_id,
            customer_user_id: record.customer_user_id,
            salon_id: record.salon_id,
            amount,
            session_id: record.session_id,
            version: record.version,
            created_at: record.created_at,
        })
    }
}

/// What the booking component hands to the payment component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrderRequest {
    pub booking_id: String,
    pub customer_user_id: String,
    pub salon_id: String,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub customer_user_email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub payment_link_url: String,
}

/// Handle returned by the hosted-checkout provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// The session object carried by every checkout event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl CheckoutSessionObject {
    pub fn order_id(&self) -> Option<&str> {
        self.metadata.get("orderId").map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEvent {
    Completed(CheckoutSessionObject),
    AsyncPaymentSucceeded(CheckoutSessionObject),
    AsyncPaymentFailed(CheckoutSessionObject),
    Expired(CheckoutSessionObject),
    Unrecognized(String),
}

impl CheckoutEvent {
    pub fn kind(&self) -> &str {
        match self {
            CheckoutEvent::Completed(_) => "checkout.session.completed",
            CheckoutEvent::AsyncPaymentSucceeded(_) => "checkout.session.async_payment_succeeded",
            CheckoutEvent::AsyncPaymentFailed(_) => "checkout.session.async_payment_failed",
            CheckoutEvent::Expired(_) => "checkout.session.expired",
            CheckoutEvent::Unrecognized(kind) => kind,
        }
    }
}
