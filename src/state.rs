use std::sync::Arc;
use crate::config::{messaging, Config};
use crate::domain::ports::{
    BookingRepository, CheckoutProvider, MessageConsumer, NotificationRepository, OutboxRepository,
    PaymentLinkClient, PaymentOrderRepository, SalonDirectory, ServiceOfferingCatalog, UserDirectory,
};
use crate::domain::services::{
    booking_service::BookingService, confirmation_handler::BookingConfirmationHandler,
    notification_service::NotificationService, payment_service::PaymentService,
};
use crate::infra::clients::local_payment_client::LocalPaymentClient;

pub struct Repositories {
    pub bookings: Arc<dyn BookingRepository>,
    pub payment_orders: Arc<dyn PaymentOrderRepository>,
    pub outbox: Arc<dyn OutboxRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

pub struct Collaborators {
    pub users: Arc<dyn UserDirectory>,
    pub salons: Arc<dyn SalonDirectory>,
    pub catalog: Arc<dyn ServiceOfferingCatalog>,
    pub checkout: Arc<dyn CheckoutProvider>,
    /// Remote payment component; `None` wires the in-process one.
    pub payment_links: Option<Arc<dyn PaymentLinkClient>>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub outbox_repo: Arc<dyn OutboxRepository>,
    pub booking_service: Arc<BookingService>,
    pub payment_service: Arc<PaymentService>,
    pub notification_service: Arc<NotificationService>,
    pub confirmation_handler: Arc<BookingConfirmationHandler>,
}

impl AppState {
    pub fn assemble(config: Config, repos: Repositories, collaborators: Collaborators) -> Self {
        let payment_service = Arc::new(PaymentService::new(
            repos.payment_orders,
            collaborators.checkout,
            repos.bookings.clone(),
            collaborators.salons.clone(),
        ));

        let payment_links = collaborators.payment_links
            .unwrap_or_else(|| Arc::new(LocalPaymentClient::new(payment_service.clone())));

        let booking_service = Arc::new(BookingService::new(
            repos.bookings.clone(),
            collaborators.users.clone(),
            collaborators.salons.clone(),
            collaborators.catalog,
            payment_links,
        ));

        Self {
            config,
            outbox_repo: repos.outbox,
            confirmation_handler: Arc::new(BookingConfirmationHandler::new(booking_service.clone())),
            notification_service: Arc::new(NotificationService::new(
                repos.notifications,
                repos.bookings,
                collaborators.salons,
                collaborators.users,
            )),
            booking_service,
            payment_service,
        }
    }

    /// Queue bindings of the relay.
    pub fn consumer_for(&self, queue: &str) -> Option<Arc<dyn MessageConsumer>> {
        match queue {
            messaging::BOOKING_QUEUE => Some(self.confirmation_handler.clone() as Arc<dyn MessageConsumer>),
            messaging::USER_QUEUE | messaging::SALON_QUEUE => Some(self.notification_service.clone() as Arc<dyn MessageConsumer>),
            _ => None,
        }
    }
}
