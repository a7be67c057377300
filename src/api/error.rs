use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use tracing::error;

use crate::error::GatewayError;

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::OrderNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::OrderNotPayable { .. } => StatusCode::CONFLICT,
            GatewayError::InvalidAmount { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Network { .. } | GatewayError::Timeout { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Configuration { .. }
            | GatewayError::Serialization { .. }
            | GatewayError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details stay in the logs
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
