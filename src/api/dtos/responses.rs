use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use crate::domain::models::booking::{Booking, BookingDetails};
use crate::domain::models::collaborators::{Salon, ServiceOffering, UserProfile};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedSlot {
    pub booking_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<Booking> for BookedSlot {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            start_time: booking.start_time,
            end_time: booking.end_time,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalonSummary {
    pub salon_id: String,
    pub salon_name: String,
    pub owner_user_id: String,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub timezone: String,
}

impl From<Salon> for SalonSummary {
    fn from(salon: Salon) -> Self {
        Self {
            salon_id: salon.salon_id,
            salon_name: salon.name,
            owner_user_id: salon.owner_user_id,
            open_time: salon.open_time,
            close_time: salon.close_time,
            timezone: salon.timezone.name().to_string(),
        }
    }
}

/// Booking fields at the top level, with the salon, customer and services
/// it refers to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub salon: SalonSummary,
    pub customer: UserProfile,
    pub services: Vec<ServiceOffering>,
}

impl From<BookingDetails> for BookingResponse {
    fn from(details: BookingDetails) -> Self {
        Self {
            booking: details.booking,
            salon: details.salon.into(),
            customer: details.customer,
            services: details.services,
        }
    }
}
