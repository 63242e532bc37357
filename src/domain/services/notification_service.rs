use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, info};
use crate::domain::models::{
    booking::Booking,
    notification::{Notification, NOTIFICATION_TYPE_BOOKING},
    outbox::{NotificationRequest, OutboxMessage},
};
use crate::domain::ports::{
    BookingRepository, MessageConsumer, NotificationRepository, SalonDirectory, UserDirectory,
};
use crate::error::AppError;

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    bookings: Arc<dyn BookingRepository>,
    salons: Arc<dyn SalonDirectory>,
    users: Arc<dyn UserDirectory>,
}

impl NotificationService {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        bookings: Arc<dyn BookingRepository>,
        salons: Arc<dyn SalonDirectory>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self { repo, bookings, salons, users }
    }

    /// Booking notifications are described by the salon they were made with.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        let mut notifications = self.repo.list_by_user(user_id).await?;
        let mut salon_names: HashMap<String, String> = HashMap::new();

        for notification in notifications.iter_mut().filter(|n| is_booking(n)) {
            let Some(booking) = self.booking_of(notification).await? else { continue };

            let name = match salon_names.get(&booking.salon_id) {
                Some(name) => name.clone(),
                None => {
                    let salon = self.salons.get_salon_by_id(&booking.salon_id).await?;
                    let name = salon.display_name().to_string();
                    salon_names.insert(booking.salon_id.clone(), name.clone());
                    name
                }
            };
            notification.description = format!("New Booking with {} confirmed.", name);
        }

        Ok(notifications)
    }

    /// Booking notifications are described by the customer who booked.
    pub async fn list_for_salon_owner(&self, owner_user_id: &str) -> Result<Vec<Notification>, AppError> {
        let salon = self.salons.get_salon_by_owner(owner_user_id).await?;
        let mut notifications = self.repo.list_by_salon(&salon.salon_id).await?;
        let mut customer_names: HashMap<String, String> = HashMap::new();

        for notification in notifications.iter_mut().filter(|n| is_booking(n)) {
            let Some(booking) = self.booking_of(notification).await? else { continue };

            let name = match customer_names.get(&booking.customer_user_id) {
                Some(name) => name.clone(),
                None => {
                    let customer = self.users.get_user(&booking.customer_user_id).await?;
                    let name = customer.display_name();
                    customer_names.insert(booking.customer_user_id.clone(), name.clone());
                    name
                }
            };
            notification.description = format!("New Booking confirmed by {}", name);
        }

        Ok(notifications)
    }

    pub async fn mark_read(&self, id: &str, acting_user_id: &str) -> Result<Notification, AppError> {
        let notification = self.find_addressed_to(id, acting_user_id).await?;

        self.repo.mark_read(&notification.id).await?
            .ok_or(AppError::NotFound(format!("Notification {} not found", id)))
    }

    pub async fn delete(&self, id: &str, acting_user_id: &str) -> Result<(), AppError> {
        let notification = self.find_addressed_to(id, acting_user_id).await?;

        if !self.repo.delete(&notification.id).await? {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }
        info!(notification_id = id, "Notification deleted");
        Ok(())
    }

    /// The recipient, or the owner of the addressed salon, may act on it.
    async fn find_addressed_to(&self, id: &str, acting_user_id: &str) -> Result<Notification, AppError> {
        let notification = self.repo.find_by_id(id).await?
            .ok_or(AppError::NotFound(format!("Notification {} not found", id)))?;

        let allowed = if notification.user_id.as_deref() == Some(acting_user_id) {
            true
        } else if let Some(salon_id) = &notification.salon_id {
            self.salons.get_salon_by_id(salon_id).await?.owner_user_id == acting_user_id
        } else {
            false
        };

        if !allowed {
            return Err(AppError::Forbidden("You are not the recipient of this notification".into()));
        }
        Ok(notification)
    }

    /// A notification whose booking is gone keeps its stored description.
    async fn booking_of(&self, notification: &Notification) -> Result<Option<Booking>, AppError> {
        let booking = self.bookings.find_by_id(&notification.booking_id).await?;
        if booking.is_none() {
            debug!(notification_id = %notification.id, booking_id = %notification.booking_id, "Booking of notification not found");
        }
        Ok(booking)
    }
}

fn is_booking(notification: &Notification) -> bool {
    notification.notification_type.eq_ignore_ascii_case(NOTIFICATION_TYPE_BOOKING)
}

#[async_trait]
impl MessageConsumer for NotificationService {
    async fn consume(&self, message: &OutboxMessage) -> Result<(), AppError> {
        let request: NotificationRequest = message.decode()?;
        let notification = Notification::from_request(&message.id, request);

        if self.repo.create_if_absent(&notification).await? {
            info!(notification_id = %notification.id, booking_id = %notification.booking_id, "Notification stored");
        } else {
            debug!(message_id = %message.id, "Notification already stored for message");
        }
        Ok(())
    }
}
