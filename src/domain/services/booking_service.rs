use std::collections::HashMap;
use std::sync::Arc;
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use crate::config::messaging;
use crate::domain::models::{
    booking::{Booking, BookingDetails, BookingStatus, NewBookingParams, SalonBookingReport},
    collaborators::{Salon, UserProfile},
    notification::NOTIFICATION_TYPE_BOOKING,
    outbox::{NotificationRequest, OutboxMessage},
    payment::{PaymentLink, PaymentMethod, PaymentOrderRequest},
};
use crate::domain::ports::{
    BookingRepository, PaymentLinkClient, SalonDirectory, ServiceOfferingCatalog, UserDirectory,
};
use crate::domain::services::slot_validator::{validate_slot, OpeningHours};
use crate::error::AppError;

/// Upper bound for a single service; anything longer is treated as a corrupt
/// catalog entry.
const MAX_SERVICE_MINUTES: i64 = 24 * 60;

#[derive(Debug)]
pub struct CreateBookingCommand {
    /// Wall-clock time in the salon's timezone.
    pub start_time: NaiveDateTime,
    pub service_ids: Vec<String>,
    pub payment_method: PaymentMethod,
}

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserDirectory>,
    salons: Arc<dyn SalonDirectory>,
    catalog: Arc<dyn ServiceOfferingCatalog>,
    payments: Arc<dyn PaymentLinkClient>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserDirectory>,
        salons: Arc<dyn SalonDirectory>,
        catalog: Arc<dyn ServiceOfferingCatalog>,
        payments: Arc<dyn PaymentLinkClient>,
    ) -> Self {
        Self { bookings, users, salons, catalog, payments }
    }

    pub async fn create_booking(
        &self,
        customer_user_id: &str,
        command: CreateBookingCommand,
    ) -> Result<PaymentLink, AppError> {
        let customer = self.users.get_user(customer_user_id).await?;

        let mut service_ids: Vec<String> = Vec::with_capacity(command.service_ids.len());
        for id in command.service_ids {
            if !service_ids.contains(&id) {
                service_ids.push(id);
            }
        }

        let offerings = self.catalog.get_offerings_by_ids(&service_ids).await?;
        if offerings.len() != service_ids.len() {
            return Err(AppError::Validation("One or more service IDs are invalid".into()));
        }

        let salon_id = offerings.first()
            .map(|o| o.salon_id.clone())
            .ok_or(AppError::Validation("No services provided".into()))?;
        if offerings.iter().any(|o| o.salon_id != salon_id) {
            return Err(AppError::Validation("All services must belong to the same salon".into()));
        }

        if let Some(bad) = offerings.iter().find(|o| !(1..=MAX_SERVICE_MINUTES).contains(&o.duration_minutes)) {
            warn!(service_id = %bad.id, minutes = bad.duration_minutes, "Service offering has an unusable duration");
            return Err(AppError::Validation(format!("Service {} has an invalid duration", bad.id)));
        }

        let salon = self.salons.get_salon_by_id(&salon_id).await?;

        let duration_min = offerings.iter()
            .try_fold(0i64, |total, o| total.checked_add(o.duration_minutes))
            .ok_or(AppError::Validation("Combined service duration is too long".into()))?;
        let total_price: Decimal = offerings.iter().map(|o| o.price).sum();

        let start = salon.timezone.from_local_datetime(&command.start_time)
            .single()
            .ok_or(AppError::Validation("Invalid local time (ambiguous or skipped due to DST)".into()))?
            .with_timezone(&Utc);

        let booking = Booking::new(NewBookingParams {
            salon_id: salon.salon_id.clone(),
            customer_user_id: customer_user_id.to_string(),
            start,
            duration_min,
            service_ids,
            total_price,
        })?;

        let existing = self.bookings.list_by_salon(&salon.salon_id).await?;
        validate_slot(booking.start_time, booking.end_time, &opening_hours(&salon), &existing)?;

        let saved = self.bookings.create(&booking).await?;
        info!(booking_id = %saved.id, salon_id = %saved.salon_id, "Booking created as PENDING");

        let request = PaymentOrderRequest {
            booking_id: saved.id.clone(),
            customer_user_id: saved.customer_user_id.clone(),
            salon_id: saved.salon_id.clone(),
            total_amount: saved.total_price,
            payment_method: command.payment_method,
            customer_user_email: customer.email,
        };

        self.payments.create_payment_link(&request).await.inspect_err(|e| {
            warn!(booking_id = %saved.id, "Payment link creation failed, booking left PENDING: {}", e);
        })
    }

    /// Idempotent: only a PENDING booking is confirmed, and the two
    /// notification requests are enqueued with that transition.
    pub async fn confirm_booking(&self, booking_id: &str) -> Result<bool, AppError> {
        let booking = self.bookings.find_by_id(booking_id).await?
            .ok_or(AppError::NotFound(format!("Booking {} not found", booking_id)))?;

        if booking.status != BookingStatus::Pending {
            debug!(booking_id, status = %booking.status, "Booking not pending, skipping confirmation");
            return Ok(false);
        }

        let messages = vec![
            OutboxMessage::new(messaging::NOTIFICATION_USER_ROUTING_KEY, &NotificationRequest {
                notification_type: NOTIFICATION_TYPE_BOOKING.to_string(),
                description: "Your booking is confirmed".to_string(),
                user_id: Some(booking.customer_user_id.clone()),
                salon_id: None,
                booking_id: booking.id.clone(),
            })?,
            OutboxMessage::new(messaging::NOTIFICATION_SALON_ROUTING_KEY, &NotificationRequest {
                notification_type: NOTIFICATION_TYPE_BOOKING.to_string(),
                description: "New booking confirmed".to_string(),
                user_id: None,
                salon_id: Some(booking.salon_id.clone()),
                booking_id: booking.id.clone(),
            })?,
        ];

        let confirmed = self.bookings.confirm_pending(&booking.id, messages).await?;
        if confirmed {
            info!(booking_id, "Booking confirmed");
        }
        Ok(confirmed)
    }

    /// Owner escape hatch: any status may be written once ownership is proven.
    pub async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
        acting_owner_user_id: &str,
    ) -> Result<BookingDetails, AppError> {
        let booking = self.find_booking(booking_id).await?;
        let salon = self.salons.get_salon_by_id(&booking.salon_id).await?;

        if salon.owner_user_id != acting_owner_user_id {
            return Err(AppError::Forbidden("You are not authorized to update this booking".into()));
        }

        let updated = self.bookings.update_status(booking_id, status).await?
            .ok_or(AppError::NotFound(format!("Booking {} not found", booking_id)))?;
        info!(booking_id, from = %booking.status, to = %status, "Booking status overwritten by owner");

        let customer = self.users.get_user(&updated.customer_user_id).await?;
        self.describe(updated, salon, customer).await
    }

    pub async fn find_booking(&self, booking_id: &str) -> Result<Booking, AppError> {
        self.bookings.find_by_id(booking_id).await?
            .ok_or(AppError::NotFound(format!("Booking {} not found", booking_id)))
    }

    /// Readable by the customer who booked and by the salon's owner.
    pub async fn get_booking(&self, booking_id: &str, acting_user_id: &str) -> Result<BookingDetails, AppError> {
        let booking = self.find_booking(booking_id).await?;
        let salon = self.salons.get_salon_by_id(&booking.salon_id).await?;

        if booking.customer_user_id != acting_user_id && salon.owner_user_id != acting_user_id {
            return Err(AppError::Forbidden("You are not allowed to view this booking".into()));
        }

        let customer = self.users.get_user(&booking.customer_user_id).await?;
        self.describe(booking, salon, customer).await
    }

    pub async fn list_customer_bookings(&self, customer_user_id: &str) -> Result<Vec<BookingDetails>, AppError> {
        let bookings = self.bookings.list_by_customer(customer_user_id).await?;
        self.describe_all(bookings).await
    }

    pub async fn list_salon_bookings(&self, owner_user_id: &str) -> Result<Vec<BookingDetails>, AppError> {
        let salon = self.salons.get_salon_by_owner(owner_user_id).await?;
        let bookings = self.bookings.list_by_salon(&salon.salon_id).await?;
        self.describe_all(bookings).await
    }

    /// Bookings of the owner's salon that start or end on `date`, read in the
    /// salon's timezone.
    pub async fn booked_slots(&self, owner_user_id: &str, date: NaiveDate) -> Result<Vec<Booking>, AppError> {
        let salon = self.salons.get_salon_by_owner(owner_user_id).await?;
        let tz = salon.timezone;

        Ok(self.bookings.list_by_salon(&salon.salon_id).await?
            .into_iter()
            .filter(|b| {
                b.start_time.with_timezone(&tz).date_naive() == date
                    || b.end_time.with_timezone(&tz).date_naive() == date
            })
            .collect())
    }

    pub async fn get_salon_booking_report(&self, owner_user_id: &str) -> Result<SalonBookingReport, AppError> {
        let salon = self.salons.get_salon_by_owner(owner_user_id).await?;
        let bookings = self.bookings.list_by_salon(&salon.salon_id).await?;
        Ok(SalonBookingReport::from_bookings(&bookings))
    }

    async fn describe(&self, booking: Booking, salon: Salon, customer: UserProfile) -> Result<BookingDetails, AppError> {
        let services = self.catalog.get_offerings_by_ids(&booking.service_ids).await?;
        Ok(BookingDetails { booking, salon, customer, services })
    }

    /// Salons and customers repeat across a listing, so each is fetched once.
    async fn describe_all(&self, bookings: Vec<Booking>) -> Result<Vec<BookingDetails>, AppError> {
        let mut salons: HashMap<String, Salon> = HashMap::new();
        let mut customers: HashMap<String, UserProfile> = HashMap::new();
        let mut described = Vec::with_capacity(bookings.len());

        for booking in bookings {
            let salon = match salons.get(&booking.salon_id) {
                Some(salon) => salon.clone(),
                None => {
                    let salon = self.salons.get_salon_by_id(&booking.salon_id).await?;
                    salons.insert(booking.salon_id.clone(), salon.clone());
                    salon
                }
            };
            let customer = match customers.get(&booking.customer_user_id) {
                Some(customer) => customer.clone(),
                None => {
                    let customer = self.users.get_user(&booking.customer_user_id).await?;
                    customers.insert(booking.customer_user_id.clone(), customer.clone());
                    customer
                }
            };
            described.push(self.describe(booking, salon, customer).await?);
        }

        Ok(described)
    }
}

fn opening_hours(salon: &Salon) -> OpeningHours {
    OpeningHours {
        open: salon.open_time,
        close: salon.close_time,
        timezone: salon.timezone,
    }
}
