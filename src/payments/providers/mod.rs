//! Payment provider implementations
//!
//! Concrete implementations of the PaymentGateway trait.

pub mod halk;

pub use halk::{HalkConfig, HalkGateway};
