//! Halk Bank hosted 3-D Secure payment provider
//!
//! The shopper is sent to the bank's `3D_PAY_HOSTING` page with a signed
//! form; the bank posts the result back to `/payment/callback`.

use crate::error::{GatewayError, GatewayResult};
use crate::payments::callback::{CallbackFields, CallbackOutcome, CallbackVerifier};
use crate::payments::form::{generate_nonce, RedirectForm};
use crate::payments::hash::HashScheme;
use crate::payments::status::StatusClient;
use crate::payments::traits::{CallbackResolution, OrderRepository, PaymentGateway, PendingOrderStore};
use crate::payments::types::{CheckoutResponse, Notice, OrderNote, OrderStatus, TransactionType};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const GATEWAY_ID: &str = "halk_gateway";

pub const TEST_PAYMENT_URL: &str = "https://entegrasyon.asseco-see.com.tr/fim/est3Dgate";
pub const LIVE_PAYMENT_URL: &str = "https://epay.halkbank.mk/fim/est3Dgate";
pub const TEST_API_URL: &str = "https://entegrasyon.asseco-see.com.tr/fim/api";
pub const LIVE_API_URL: &str = "https://epay.halkbank.mk/fim/api";

pub const REDIRECTING_MESSAGE: &str = "Redirecting to payment page.";
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please contact us for more details.";
pub const ORDER_ID_MISMATCH_MESSAGE: &str =
    "Order-ID mismatch. Please check parameters posted to 3D secure page.";
pub const HASH_MISMATCH_NOTE: &str = "Security warning. Hash values mismatch.";

/// Halk Bank gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HalkConfig {
    /// Merchant ID assigned by the bank
    pub client_id: String,
    /// Shared secret used to sign and verify hashes
    pub store_key: String,
    /// API user for status queries
    pub username: String,
    /// API password for status queries
    pub password: String,
    /// ISO 4217 numeric currency code
    pub currency_code: String,
    pub transaction_type: TransactionType,
    /// Use the bank's integration environment
    pub testing_mode: bool,
    pub hash_scheme: HashScheme,
    pub store_type: String,
    /// Seconds the bank shows its result page before redirecting back
    pub refresh_time: u32,
    pub lang: Option<String>,
    /// Query order status after every approved payment
    pub status_query: bool,
    pub status_timeout_secs: u64,
    /// Public base URL of the shop, used to build `okUrl`/`failUrl`
    pub site_url: String,
    pub checkout_path: String,
    /// Path of the order confirmation page; `{order_id}` is substituted
    pub order_received_path: String,
    /// Overrides the test/live payment page URL
    pub payment_url: Option<String>,
    /// Overrides the test/live status API URL
    pub api_url: Option<String>,
}

impl Default for HalkConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            store_key: String::new(),
            username: String::new(),
            password: String::new(),
            currency_code: "807".to_string(),
            transaction_type: TransactionType::Auth,
            testing_mode: false,
            hash_scheme: HashScheme::Ver3,
            store_type: "3D_PAY_HOSTING".to_string(),
            refresh_time: 10,
            lang: None,
            status_query: true,
            status_timeout_secs: 90,
            site_url: "http://localhost:8080".to_string(),
            checkout_path: "/checkout".to_string(),
            order_received_path: "/checkout/order-received/{order_id}".to_string(),
            payment_url: None,
            api_url: None,
        }
    }
}

impl HalkConfig {
    pub fn payment_endpoint(&self) -> &str {
        match &self.payment_url {
            Some(url) => url,
            None if self.testing_mode => TEST_PAYMENT_URL,
            None => LIVE_PAYMENT_URL,
        }
    }

    pub fn api_endpoint(&self) -> &str {
        match &self.api_url {
            Some(url) => url,
            None if self.testing_mode => TEST_API_URL,
            None => LIVE_API_URL,
        }
    }

    pub fn checkout_url(&self) -> String {
        format!("{}{}", self.site_url.trim_end_matches('/'), self.checkout_path)
    }

    pub fn order_received_url(&self, order_id: &str) -> String {
        format!(
            "{}{}",
            self.site_url.trim_end_matches('/'),
            self.order_received_path.replace("{order_id}", order_id)
        )
    }
}

/// Halk Bank gateway
pub struct HalkGateway {
    config: HalkConfig,
    orders: Arc<dyn OrderRepository>,
    pending: Arc<dyn PendingOrderStore>,
    status_client: Option<StatusClient>,
}

impl HalkGateway {
    /// Create a new gateway instance
    pub fn new(
        config: HalkConfig,
        orders: Arc<dyn OrderRepository>,
        pending: Arc<dyn PendingOrderStore>,
    ) -> GatewayResult<Self> {
        let status_client = if config.status_query {
            Some(StatusClient::new(
                config.api_endpoint(),
                config.username.clone(),
                config.password.clone(),
                config.client_id.clone(),
                Duration::from_secs(config.status_timeout_secs),
            )?)
        } else {
            None
        };

        info!(
            "Halk gateway initialized: client_id={}, scheme={:?}, testing_mode={}, status_query={}",
            config.client_id, config.hash_scheme, config.testing_mode, config.status_query
        );

        Ok(Self {
            config,
            orders,
            pending,
            status_client,
        })
    }

    pub fn config(&self) -> &HalkConfig {
        &self.config
    }

    fn failure(&self, outcome: CallbackOutcome, message: &str) -> CallbackResolution {
        CallbackResolution {
            outcome,
            redirect_to: self.config.checkout_url(),
            notice: Some(Notice::error(message)),
        }
    }

    async fn note(&self, order_id: &str, message: impl Into<String>) -> GatewayResult<()> {
        self.orders.add_note(order_id, OrderNote::new(message)).await
    }

    async fn settle_success(&self, order_id: &str, fields: &CallbackFields) -> GatewayResult<()> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| GatewayError::order_not_found(order_id))?;

        if order.is_paid() {
            info!("Order {} already paid, ignoring repeated approval", order_id);
            return Ok(());
        }

        self.orders.mark_paid(order_id).await?;
        info!("Order {} marked as paid", order_id);

        // The order is paid from here on; notes are best effort
        let approval = format!(
            "Payment approved by the bank. AuthCode: {}, TransId: {}",
            fields.get("AuthCode").unwrap_or("-"),
            fields.get("TransId").unwrap_or("-")
        );
        if let Err(e) = self.note(order_id, approval).await {
            error!("Failed to record approval note for order {}: {}", order_id, e);
        }

        if let Some(client) = &self.status_client {
            match client.query(order_id).await {
                Ok(raw) => {
                    if let Err(e) = self.note(order_id, raw).await {
                        error!("Failed to record status reply for order {}: {}", order_id, e);
                    }
                }
                Err(e) => error!("Status query failed for order {}: {}", order_id, e),
            }
        }

        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for HalkGateway {
    async fn process_payment(&self, visitor_id: &str, order_id: &str) -> GatewayResult<CheckoutResponse> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| GatewayError::order_not_found(order_id))?;

        if order.status == OrderStatus::Paid {
            return Err(GatewayError::order_not_payable(order_id, order.status));
        }

        self.pending.put(visitor_id, order_id).await?;
        info!("Payment initiated for order {}, redirecting to bank", order_id);

        Ok(CheckoutResponse {
            result: "success".to_string(),
            refresh: true,
            messages: REDIRECTING_MESSAGE.to_string(),
        })
    }

    async fn redirect_form(&self, visitor_id: &str) -> GatewayResult<Option<RedirectForm>> {
        let Some(order_id) = self.pending.take(visitor_id).await? else {
            return Ok(None);
        };

        let order = self
            .orders
            .find_by_id(&order_id)
            .await?
            .ok_or_else(|| GatewayError::order_not_found(&order_id))?;

        let form = RedirectForm::build(&order, &self.config, generate_nonce())?;
        info!(
            "Redirect form built for order {} ({} {})",
            order.id,
            form.field("amount").unwrap_or("-"),
            self.config.currency_code
        );
        Ok(Some(form))
    }

    async fn handle_callback(
        &self,
        visitor_id: Option<&str>,
        query_order: Option<&str>,
        fields: CallbackFields,
    ) -> GatewayResult<CallbackResolution> {
        let stored = match visitor_id {
            Some(visitor_id) => self.pending.take(visitor_id).await?,
            None => None,
        };
        let expected = query_order
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .or(stored);

        let verifier = CallbackVerifier::new(self.config.hash_scheme, &self.config.store_key);
        let outcome = verifier.verify(expected.as_deref(), &fields);
        info!("Bank callback resolved to {}", outcome.state_name());

        match &outcome {
            CallbackOutcome::OrderIdMismatch { expected, received } => {
                warn!(
                    "Order ID mismatch on callback: expected={:?}, received={:?}",
                    expected, received
                );
                Ok(self.failure(outcome.clone(), ORDER_ID_MISMATCH_MESSAGE))
            }
            CallbackOutcome::HashMismatch { order_id } => {
                warn!("Hash mismatch on callback for order {}", order_id);
                if self.orders.find_by_id(order_id).await?.is_some() {
                    self.note(order_id, HASH_MISMATCH_NOTE).await?;
                }
                Ok(self.failure(outcome.clone(), GENERIC_ERROR_MESSAGE))
            }
            CallbackOutcome::VerifiedFailure { order_id, reason } => {
                warn!("Payment for order {} failed: {}", order_id, reason.note());
                match self.orders.find_by_id(order_id).await? {
                    Some(order) => {
                        self.note(order_id, reason.note()).await?;
                        if !order.is_paid() {
                            self.orders.mark_failed(order_id).await?;
                        }
                    }
                    None => warn!("Failed callback for unknown order {}", order_id),
                }
                Ok(self.failure(outcome.clone(), GENERIC_ERROR_MESSAGE))
            }
            CallbackOutcome::VerifiedSuccess { order_id } => {
                self.settle_success(order_id, &fields).await?;
                Ok(CallbackResolution {
                    redirect_to: self.config.order_received_url(order_id),
                    outcome: outcome.clone(),
                    notice: None,
                })
            }
        }
    }

    async fn query_status(&self, order_id: &str) -> GatewayResult<String> {
        match &self.status_client {
            Some(client) => client.query(order_id).await,
            None => {
                let client = StatusClient::new(
                    self.config.api_endpoint(),
                    self.config.username.clone(),
                    self.config.password.clone(),
                    self.config.client_id.clone(),
                    Duration::from_secs(self.config.status_timeout_secs),
                )?;
                client.query(order_id).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::hash::HASH_FIELD;
    use crate::payments::types::Order;
    use crate::store::{InMemoryOrderRepository, InMemoryPendingStore};

    #[test]
    fn test_halk_config_default() {
        let config = HalkConfig::default();
        assert_eq!(config.currency_code, "807");
        assert_eq!(config.store_type, "3D_PAY_HOSTING");
        assert_eq!(config.refresh_time, 10);
        assert_eq!(config.hash_scheme, HashScheme::Ver3);
        assert_eq!(config.transaction_type, TransactionType::Auth);
        assert!(config.status_query);
        assert_eq!(config.payment_endpoint(), LIVE_PAYMENT_URL);
        assert_eq!(config.api_endpoint(), LIVE_API_URL);
    }

    #[test]
    fn test_endpoints_follow_testing_mode_and_overrides() {
        let mut config = HalkConfig {
            testing_mode: true,
            ..HalkConfig::default()
        };
        assert_eq!(config.payment_endpoint(), TEST_PAYMENT_URL);
        assert_eq!(config.api_endpoint(), TEST_API_URL);

        config.api_url = Some("http://127.0.0.1:9999/fim/api".to_string());
        assert_eq!(config.api_endpoint(), "http://127.0.0.1:9999/fim/api");
    }

    #[test]
    fn test_return_pages() {
        let config = HalkConfig {
            site_url: "https://shop.example/".to_string(),
            ..HalkConfig::default()
        };
        assert_eq!(config.checkout_url(), "https://shop.example/checkout");
        assert_eq!(
            config.order_received_url("1001"),
            "https://shop.example/checkout/order-received/1001"
        );
    }

    /// Orders that can be read and moved between statuses, but never annotated
    struct NoteFailingRepository {
        inner: InMemoryOrderRepository,
    }

    #[async_trait]
    impl OrderRepository for NoteFailingRepository {
        async fn find_by_id(&self, order_id: &str) -> GatewayResult<Option<Order>> {
            self.inner.find_by_id(order_id).await
        }

        async fn mark_paid(&self, order_id: &str) -> GatewayResult<()> {
            self.inner.mark_paid(order_id).await
        }

        async fn mark_failed(&self, order_id: &str) -> GatewayResult<()> {
            self.inner.mark_failed(order_id).await
        }

        async fn add_note(&self, _order_id: &str, _note: OrderNote) -> GatewayResult<()> {
            Err(GatewayError::storage("order_notes is read-only"))
        }
    }

    #[tokio::test]
    async fn test_note_failure_after_payment_still_confirms_order() {
        let inner = InMemoryOrderRepository::new();
        inner.insert(Order::new("1001", 10000, "MKD")).await;
        let orders = Arc::new(NoteFailingRepository { inner });

        let config = HalkConfig {
            client_id: "12345".to_string(),
            store_key: "SKEY0000".to_string(),
            status_query: false,
            site_url: "https://shop.example".to_string(),
            ..HalkConfig::default()
        };
        let gateway =
            HalkGateway::new(config, orders.clone(), Arc::new(InMemoryPendingStore::new())).unwrap();

        let mut fields: Vec<(String, String)> = [
            ("oid", "1001"),
            ("mdStatus", "1"),
            ("Response", "Approved"),
            ("AuthCode", "P1"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let hash = HashScheme::Ver3.request_hash(&fields, "SKEY0000");
        fields.push((HASH_FIELD.to_string(), hash));

        let resolution = gateway
            .handle_callback(None, Some("1001"), CallbackFields::new(fields))
            .await
            .unwrap();

        assert!(resolution.outcome.is_success());
        assert!(resolution.notice.is_none());
        assert_eq!(
            resolution.redirect_to,
            "https://shop.example/checkout/order-received/1001"
        );
        let order = orders.find_by_id("1001").await.unwrap().unwrap();
        assert!(order.is_paid());
    }
}
