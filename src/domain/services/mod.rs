pub mod booking_service;
pub mod confirmation_handler;
pub mod notification_service;
pub mod payment_service;
pub mod slot_validator;
