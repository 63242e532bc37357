pub mod checkout;
pub mod clients;
pub mod factory;
pub mod repositories;
