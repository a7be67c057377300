//! Payment gateway types and data structures
//!
//! Orders belong to the shop; the gateway only reads their totals, moves them
//! between statuses and appends notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status as seen by the gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created by the shop, waiting for payment
    Pending,
    /// Payment confirmed by the bank
    Paid,
    /// Bank reported a decline or 3-D authentication failure
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable note attached to an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderNote {
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl OrderNote {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Shop order record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Order total in minor currency units (e.g. 10000 for 100.00)
    pub total_minor: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub notes: Vec<OrderNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(id: impl Into<String>, total_minor: i64, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            total_minor,
            currency: currency.into(),
            status: OrderStatus::Pending,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }
}

/// Transaction mode sent to the bank as `islemtipi`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionType {
    /// Authorize and capture
    #[default]
    Auth,
    /// Authorize only
    PreAuth,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Auth => "Auth",
            TransactionType::PreAuth => "PreAuth",
        }
    }
}

/// Error shown to the shopper when the bank redirects back without a payment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of `process_payment`, returned to the checkout page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub result: String,
    pub refresh: bool,
    pub messages: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trip() {
        for status in [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Failed] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("refunded"), None);
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = Order::new("1001", 10000, "MKD");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.notes.is_empty());
        assert!(!order.is_paid());
    }

    #[test]
    fn test_transaction_type_wire_value() {
        assert_eq!(TransactionType::default().as_str(), "Auth");
        assert_eq!(TransactionType::PreAuth.as_str(), "PreAuth");
    }
}
