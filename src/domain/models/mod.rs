pub mod booking;
pub mod collaborators;
pub mod notification;
pub mod outbox;
pub mod payment;
