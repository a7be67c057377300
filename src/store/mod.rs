//! In-process implementations of the shop collaborators
//!
//! Used when no database or Redis is configured, and throughout the tests.

pub mod memory;

pub use memory::{InMemoryOrderRepository, InMemoryPendingStore};
