#![allow(dead_code)]

use halk_gateway::payments::callback::CallbackFields;
use halk_gateway::payments::hash::{HashScheme, HASH_FIELD, LEGACY_CALLBACK_FIELDS};
use halk_gateway::payments::providers::{HalkConfig, HalkGateway};
use halk_gateway::payments::types::Order;
use halk_gateway::store::{InMemoryOrderRepository, InMemoryPendingStore};
use std::sync::Arc;

pub const STORE_KEY: &str = "SKEY0000";
pub const SITE_URL: &str = "https://shop.example";

pub fn gateway_config() -> HalkConfig {
    HalkConfig {
        client_id: "12345".to_string(),
        store_key: STORE_KEY.to_string(),
        username: "api_user".to_string(),
        password: "api_pass".to_string(),
        testing_mode: true,
        status_query: false,
        site_url: SITE_URL.to_string(),
        ..HalkConfig::default()
    }
}

pub struct Harness {
    pub orders: Arc<InMemoryOrderRepository>,
    pub pending: Arc<InMemoryPendingStore>,
    pub gateway: Arc<HalkGateway>,
}

impl Harness {
    pub async fn new(config: HalkConfig) -> Self {
        let orders = Arc::new(InMemoryOrderRepository::new());
        orders.insert(Order::new("1001", 10000, "MKD")).await;

        let pending = Arc::new(InMemoryPendingStore::new());
        let gateway = HalkGateway::new(config, orders.clone(), pending.clone())
            .expect("Failed to build gateway");
        let gateway = Arc::new(gateway);

        Self {
            orders,
            pending,
            gateway,
        }
    }

    pub async fn order(&self, order_id: &str) -> Order {
        use halk_gateway::payments::traits::OrderRepository;

        self.orders
            .find_by_id(order_id)
            .await
            .unwrap()
            .expect("order should exist")
    }
}

/// Callback fields as the bank would post them, signed with `scheme`
pub fn signed_callback(scheme: HashScheme, pairs: &[(&str, &str)]) -> CallbackFields {
    let mut fields: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    if scheme == HashScheme::Sha1 {
        let values: String = LEGACY_CALLBACK_FIELDS
            .iter()
            .filter_map(|name| pairs.iter().find(|(k, _)| k == name).map(|(_, v)| *v))
            .collect();
        fields.push((
            "HASHPARAMS".to_string(),
            format!("{}:", LEGACY_CALLBACK_FIELDS.join(":")),
        ));
        fields.push(("HASHPARAMSVAL".to_string(), values));
    }

    let hash = scheme
        .callback_hash(&fields, STORE_KEY)
        .expect("callback fields should be hashable");
    fields.push((HASH_FIELD.to_string(), hash));
    CallbackFields::new(fields)
}

pub fn approved_callback(order_id: &str) -> CallbackFields {
    signed_callback(
        HashScheme::Ver3,
        &[
            ("clientid", "12345"),
            ("oid", order_id),
            ("amount", "100.00"),
            ("mdStatus", "1"),
            ("Response", "Approved"),
            ("ProcReturnCode", "00"),
            ("AuthCode", "P12345"),
            ("TransId", "24001AbC"),
        ],
    )
}
