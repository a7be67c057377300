use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    #[error("Order {order_id} cannot be paid in status {status}")]
    OrderNotPayable { order_id: String, status: String },

    #[error("Invalid transaction amount: {amount}")]
    InvalidAmount { amount: i64 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Timeout error: operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl GatewayError {
    pub fn order_not_found(order_id: impl Into<String>) -> Self {
        Self::OrderNotFound {
            order_id: order_id.into(),
        }
    }

    pub fn order_not_payable(order_id: impl Into<String>, status: impl ToString) -> Self {
        Self::OrderNotPayable {
            order_id: order_id.into(),
            status: status.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Whether the failure came from one of the shop's own backing stores.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout { seconds: 0 }
        } else {
            GatewayError::network(format!("Request error: {}", err))
        }
    }
}

impl From<quick_xml::DeError> for GatewayError {
    fn from(err: quick_xml::DeError) -> Self {
        GatewayError::serialization(format!("XML error: {}", err))
    }
}

impl From<serde_urlencoded::ser::Error> for GatewayError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        GatewayError::serialization(format!("Form encoding error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GatewayError::order_not_found("1001").to_string(),
            "Order not found: 1001"
        );
        assert_eq!(
            GatewayError::InvalidAmount { amount: -5 }.to_string(),
            "Invalid transaction amount: -5"
        );
    }

    #[test]
    fn test_is_storage() {
        assert!(GatewayError::storage("down").is_storage());
        assert!(!GatewayError::order_not_found("1001").is_storage());
    }
}
