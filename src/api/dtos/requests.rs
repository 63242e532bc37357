use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::BTreeMap;
use crate::domain::models::booking::BookingStatus;
use crate::domain::models::payment::PaymentMethod;
use crate::domain::services::booking_service::CreateBookingCommand;
use crate::error::AppError;

/// Every field is optional on the wire so that all problems can be reported
/// at once instead of failing on the first missing key.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub start_time: Option<String>,
    pub service_ids: Option<Vec<String>>,
    pub payment_method: Option<String>,
}

/// Ids travel into collaborator URLs, so only a conservative alphabet is
/// accepted.
fn is_plain_id(id: &str) -> bool {
    id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn parse_local_start(raw: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
}

impl TryFrom<CreateBookingRequest> for CreateBookingCommand {
    type Error = AppError;

    fn try_from(req: CreateBookingRequest) -> Result<Self, Self::Error> {
        let mut errors = BTreeMap::new();

        let start_time = match req.start_time.as_deref() {
            None => {
                errors.insert("startTime".to_string(), "Start time is required".to_string());
                None
            }
            Some(raw) => {
                let parsed = parse_local_start(raw);
                if parsed.is_none() {
                    errors.insert("startTime".to_string(), "Expected local date-time like 2030-01-07T10:00:00".to_string());
                }
                parsed
            }
        };

        let service_ids: Vec<String> = req.service_ids.unwrap_or_default()
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if service_ids.is_empty() {
            errors.insert("serviceIds".to_string(), "At least one service is required".to_string());
        } else if let Some(bad) = service_ids.iter().find(|id| !is_plain_id(id)) {
            errors.insert("serviceIds".to_string(), format!("Invalid service id: {}", bad));
        }

        let payment_method = match req.payment_method.as_deref() {
            None => Some(PaymentMethod::Stripe),
            Some(raw) => {
                let parsed = raw.parse::<PaymentMethod>().ok();
                if parsed.is_none() {
                    errors.insert("paymentMethod".to_string(), format!("Unsupported payment method: {}", raw));
                }
                parsed
            }
        };

        match (start_time, payment_method) {
            (Some(start_time), Some(payment_method)) if errors.is_empty() => {
                Ok(CreateBookingCommand { start_time, service_ids, payment_method })
            }
            _ => Err(AppError::InvalidFields(errors)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

impl StatusQuery {
    pub fn parse(&self) -> Result<BookingStatus, AppError> {
        self.status.parse()
    }
}
