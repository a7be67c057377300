//! Halk Bank 3-D Secure hosted payment gateway
//!
//! Sends shoppers to the bank's hosted payment page with a signed form, and
//! verifies and settles the bank's callback against the shop's orders.

pub mod api;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod payments;
pub mod store;

pub use error::{GatewayError, GatewayResult};
