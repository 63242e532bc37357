pub mod sqlite_booking_repo;
pub mod sqlite_payment_repo;
pub mod sqlite_outbox_repo;
pub mod sqlite_notification_repo;

pub mod postgres_booking_repo;
pub mod postgres_payment_repo;
pub mod postgres_outbox_repo;
pub mod postgres_notification_repo;
