use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::payments::hash::HashScheme;
use crate::payments::providers::halk::GATEWAY_ID;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub gateway: String,
    pub testing_mode: bool,
    pub hash_scheme: HashScheme,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.environment.clone(),
        gateway: GATEWAY_ID.to_string(),
        testing_mode: state.testing_mode,
        hash_scheme: state.hash_scheme,
    };

    Json(response)
}
