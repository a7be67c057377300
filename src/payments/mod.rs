//! Halk Bank payment integration
//!
//! Hash signing, the redirect form, callback verification and the post-payment
//! status query, tied together by the provider in [`providers::halk`].

pub mod callback;
pub mod form;
pub mod hash;
pub mod providers;
pub mod status;
pub mod traits;
pub mod types;
