//! HTTP surface of the gateway

pub mod checkout;
pub mod error;
pub mod health;
pub mod visitor;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::payments::hash::HashScheme;
use crate::payments::traits::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn PaymentGateway>,
    /// Fallback destination when a callback cannot be processed at all
    pub checkout_url: String,
    pub environment: String,
    pub testing_mode: bool,
    pub hash_scheme: HashScheme,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/checkout/:order_id", post(checkout::start_checkout))
        .route("/payment/form", get(checkout::payment_form))
        .route("/payment/callback", post(checkout::payment_callback))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
