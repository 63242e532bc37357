pub mod stripe_checkout;
pub mod webhook;
