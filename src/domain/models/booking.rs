use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use crate::domain::models::collaborators::{Salon, ServiceOffering, UserProfile};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(AppError::Validation(format!("Unknown booking status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub salon_id: String,
    pub customer_user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub service_ids: Vec<String>,
    pub status: BookingStatus,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

pub struct NewBookingParams {
    pub salon_id: String,
    pub customer_user_id: String,
    pub start: DateTime<Utc>,
    pub duration_min: i64,
    pub service_ids: Vec<String>,
    pub total_price: Decimal,
}

impl Booking {
    /// New bookings always start out `PENDING`; the end time is derived from
    /// the combined service duration, which must be positive.
    pub fn new(params: NewBookingParams) -> Result<Self, AppError> {
        let end_time = Duration::try_minutes(params.duration_min)
            .filter(|d| *d > Duration::zero())
            .and_then(|d| params.start.checked_add_signed(d))
            .ok_or_else(|| AppError::Validation(format!("Invalid booking duration: {} minutes", params.duration_min)))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            salon_id: params.salon_id,
            customer_user_id: params.customer_user_id,
            start_time: params.start,
            end_time,
            service_ids: params.service_ids,
            status: BookingStatus::Pending,
            total_price: params.total_price,
            created_at: Utc::now(),
        })
    }
}

/// A booking together with the collaborator records it refers to.
#[derive(Debug, Clone)]
pub struct BookingDetails {
    pub booking: Booking,
    pub salon: Salon,
    pub customer: UserProfile,
    pub services: Vec<ServiceOffering>,
}

/// Row shape shared by the SQLite and Postgres booking repositories.
#[derive(Debug, FromRow)]
pub struct BookingRecord {
    pub id: String,
    pub salon_id: String,
    pub customer_user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub service_ids: Json<Vec<String>>,
    pub status: String,
    pub total_price: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BookingRecord> for Booking {
    type Error = AppError;

    fn try_from(record: BookingRecord) -> Result<Self, Self::Error> {
        let status = record.status.parse::<BookingStatus>()
            .map_err(|_| AppError::InternalWithMsg(format!("Corrupt status '{}' on booking {}", record.status, record.id)))?;
        let total_price = Decimal::from_str(&record.total_price)
            .map_err(|e| AppError::InternalWithMsg(format!("Corrupt price on booking {}: {}", record.id, e)))?;

        Ok(Booking {
            id: record.id,
            salon_id: record.salon_id,
            customer_user_id: record.customer_user_id,
            start_time: record.start_time,
            end_time: record.end_time,
            service_ids: record.service_ids.0,
            status,
            total_price,
            created_at: record.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalonBookingReport {
    pub total_earnings: Decimal,
    pub total_bookings: usize,
    pub cancelled_bookings: usize,
    pub total_refund: Decimal,
}

impl SalonBookingReport {
    /// Earnings are summed over every booking regardless of status, so
    /// cancelled amounts appear both in `total_earnings` and `total_refund`.
    pub fn from_bookings(bookings: &[Booking]) -> Self {
        let cancelled: Vec<&Booking> = bookings.iter()
            .filter(|b| b.status == BookingStatus::Cancelled)
            .collect();

        Self {
            total_earnings: bookings.iter().map(|b| b.total_price).sum(),
            total_bookings: bookings.len(),
            cancelled_bookings: cancelled.len(),
            total_refund: cancelled.iter().map(|b| b.total_price).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking(price: &str, status: BookingStatus) -> Booking {
        let mut b = Booking::new(NewBookingParams {
            salon_id: "salon-1".into(),
            customer_user_id: "cust-1".into(),
            start: Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap(),
            duration_min: 30,
            service_ids: vec!["svc-1".into()],
            total_price: Decimal::from_str(price).unwrap(),
        }).unwrap();
        b.status = status;
        b
    }

    #[test]
    fn new_booking_is_pending_with_derived_end() {
        let b = booking("10.00", BookingStatus::Pending);
        assert_eq!(b.status, BookingStatus::Pending);
        assert_eq!(b.end_time, Utc.with_ymd_and_hms(2030, 1, 7, 10, 30, 0).unwrap());
    }

    #[test]
    fn non_positive_or_overflowing_durations_are_rejected() {
        for minutes in [0, -30, i64::MAX] {
            let result = Booking::new(NewBookingParams {
                salon_id: "salon-1".into(),
                customer_user_id: "cust-1".into(),
                start: Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap(),
                duration_min: minutes,
                service_ids: vec!["svc-1".into()],
                total_price: Decimal::ONE,
            });
            assert!(matches!(result, Err(AppError::Validation(_))), "{} minutes accepted", minutes);
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("cancelled".parse::<BookingStatus>().unwrap(), BookingStatus::Cancelled);
        assert!("ARCHIVED".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn report_counts_cancelled_amounts_in_earnings_and_refund() {
        let bookings = vec![
            booking("25.50", BookingStatus::Confirmed),
            booking("10.00", BookingStatus::Cancelled),
            booking("4.50", BookingStatus::Pending),
        ];

        let report = SalonBookingReport::from_bookings(&bookings);
        assert_eq!(report.total_earnings, Decimal::from_str("40.00").unwrap());
        assert_eq!(report.total_bookings, 3);
        assert_eq!(report.cancelled_bookings, 1);
        assert_eq!(report.total_refund, Decimal::from_str("10.00").unwrap());
    }
}
