//! Gateway and collaborator trait definitions
//!
//! The shop owns orders and visitor state. The gateway reaches both through
//! these traits so the same flow runs against Postgres, Redis or memory.

use crate::error::GatewayResult;
use crate::payments::callback::{CallbackFields, CallbackOutcome};
use crate::payments::form::RedirectForm;
use crate::payments::types::{CheckoutResponse, Notice, Order, OrderNote};
use async_trait::async_trait;
use serde::Serialize;

/// Where the shopper goes after the bank posts back
#[derive(Debug, Clone, Serialize)]
pub struct CallbackResolution {
    pub outcome: CallbackOutcome,
    pub redirect_to: String,
    pub notice: Option<Notice>,
}

/// Trait for hosted-payment-page gateways
///
/// Covers the whole redirect flow: remember the order, hand the browser a
/// signed form, and settle the order when the bank posts back.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a payment for `order_id` on behalf of `visitor_id`
    ///
    /// Stores the pending-redirect marker; the form itself is produced by
    /// [`PaymentGateway::redirect_form`] on the next page load.
    async fn process_payment(&self, visitor_id: &str, order_id: &str) -> GatewayResult<CheckoutResponse>;

    /// Build the signed redirect form for the visitor's pending order
    ///
    /// Consumes the marker. Returns `None` when nothing is pending.
    async fn redirect_form(&self, visitor_id: &str) -> GatewayResult<Option<RedirectForm>>;

    /// Verify a bank callback and update the order
    ///
    /// # Arguments
    /// * `visitor_id` - Visitor whose pending marker is used when `query_order` is absent
    /// * `query_order` - `order` query parameter from the callback URL
    /// * `fields` - Form fields posted by the bank
    async fn handle_callback(
        &self,
        visitor_id: Option<&str>,
        query_order: Option<&str>,
        fields: CallbackFields,
    ) -> GatewayResult<CallbackResolution>;

    /// Ask the bank for the current status of an order, returning the raw reply
    async fn query_status(&self, order_id: &str) -> GatewayResult<String>;
}

/// Access to the shop's order records
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an order by its ID
    async fn find_by_id(&self, order_id: &str) -> GatewayResult<Option<Order>>;

    /// Mark an order as paid
    ///
    /// Calling this for an order that is already paid must be a no-op.
    async fn mark_paid(&self, order_id: &str) -> GatewayResult<()>;

    /// Mark an order as failed
    async fn mark_failed(&self, order_id: &str) -> GatewayResult<()>;

    /// Append a human-readable note to the order
    async fn add_note(&self, order_id: &str, note: OrderNote) -> GatewayResult<()>;
}

/// Per-visitor pending-redirect marker
///
/// Holds at most one order ID per visitor between "payment initiated" and
/// "bank callback received".
#[async_trait]
pub trait PendingOrderStore: Send + Sync {
    /// Remember `order_id` as the visitor's pending order, replacing any previous one
    async fn put(&self, visitor_id: &str, order_id: &str) -> GatewayResult<()>;

    /// Read and clear the pending order
    async fn take(&self, visitor_id: &str) -> GatewayResult<Option<String>>;
}
