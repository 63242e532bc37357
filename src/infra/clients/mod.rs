pub mod collaborator_http;
pub mod http_payment_client;
pub mod http_salon_client;
pub mod http_service_offering_client;
pub mod http_user_client;
pub mod local_payment_client;
pub mod resilience;
