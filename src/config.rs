use std::env;
use std::time::Duration;
use thiserror::Error;

/// Queue names and routing keys shared by every component that publishes or
/// consumes relay messages.
pub mod messaging {
    pub const BOOKING_QUEUE: &str = "booking-queue";
    pub const USER_QUEUE: &str = "user-queue";
    pub const SALON_QUEUE: &str = "salon-queue";

    pub const PAYMENT_COMPLETED_ROUTING_KEY: &str = "payment.completed";
    pub const NOTIFICATION_USER_ROUTING_KEY: &str = "notification.user";
    pub const NOTIFICATION_SALON_ROUTING_KEY: &str = "notification.salon";

    /// Direct-exchange binding: each routing key is bound to exactly one queue.
    pub fn queue_for(routing_key: &str) -> Option<&'static str> {
        match routing_key {
            PAYMENT_COMPLETED_ROUTING_KEY => Some(BOOKING_QUEUE),
            NOTIFICATION_USER_ROUTING_KEY => Some(USER_QUEUE),
            NOTIFICATION_SALON_ROUTING_KEY => Some(SALON_QUEUE),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is invalid: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub enum JwtKey {
    /// HS256 shared secret.
    Secret(String),
    /// RS256 public key in PEM form.
    RsaPublicPem(String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub user_service_url: String,
    pub salon_service_url: String,
    pub service_offering_service_url: String,
    pub payment_service_url: Option<String>,
    pub internal_service_token: Option<String>,
    pub jwt_key: JwtKey,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub stripe_api_key: String,
    pub stripe_api_base: String,
    pub stripe_webhook_secret: String,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    pub checkout_currency: String,
    pub http_timeout: Duration,
    pub retry_max_attempts: usize,
    pub circuit_failure_threshold: usize,
    pub circuit_open_duration: Duration,
    pub relay_poll_interval: Duration,
    pub relay_max_attempts: i32,
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_key = match (optional("JWT_PUBLIC_KEY"), optional("JWT_SECRET")) {
            (Some(pem), _) => JwtKey::RsaPublicPem(pem),
            (None, Some(secret)) => JwtKey::Secret(secret),
            (None, None) => return Err(ConfigError::Missing("JWT_PUBLIC_KEY or JWT_SECRET")),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            port: parsed("PORT", 3000)?,
            user_service_url: env::var("USER_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8081".to_string()),
            salon_service_url: env::var("SALON_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8082".to_string()),
            service_offering_service_url: env::var("SERVICE_OFFERING_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8083".to_string()),
            payment_service_url: optional("PAYMENT_SERVICE_URL"),
            internal_service_token: optional("INTERNAL_SERVICE_TOKEN"),
            jwt_key,
            jwt_issuer: optional("JWT_ISSUER"),
            jwt_audience: optional("JWT_AUDIENCE"),
            stripe_api_key: required("STRIPE_API_KEY")?,
            stripe_api_base: env::var("STRIPE_API_BASE").unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            checkout_success_url: env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| "http://localhost:5173/payment-success".to_string()),
            checkout_cancel_url: env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| "http://localhost:5173/payment-cancel".to_string()),
            checkout_currency: env::var("CHECKOUT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            http_timeout: Duration::from_millis(parsed("HTTP_TIMEOUT_MS", 3000)?),
            retry_max_attempts: parsed("RETRY_MAX_ATTEMPTS", 3)?,
            circuit_failure_threshold: parsed("CIRCUIT_FAILURE_THRESHOLD", 5)?,
            circuit_open_duration: Duration::from_secs(parsed("CIRCUIT_OPEN_SECS", 30)?),
            relay_poll_interval: Duration::from_millis(parsed("RELAY_POLL_INTERVAL_MS", 1000)?),
            relay_max_attempts: parsed("RELAY_MAX_ATTEMPTS", 10)?,
        })
    }
}
