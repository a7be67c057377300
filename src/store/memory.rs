use crate::error::{GatewayError, GatewayResult};
use crate::payments::traits::{OrderRepository, PendingOrderStore};
use crate::payments::types::{Order, OrderNote, OrderStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Order repository backed by a `HashMap`
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an order
    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id.clone(), order);
    }

    async fn update<F>(&self, order_id: &str, apply: F) -> GatewayResult<()>
    where
        F: FnOnce(&mut Order) + Send,
    {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| GatewayError::order_not_found(order_id))?;
        apply(order);
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, order_id: &str) -> GatewayResult<Option<Order>> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn mark_paid(&self, order_id: &str) -> GatewayResult<()> {
        self.update(order_id, |order| order.status = OrderStatus::Paid)
            .await
    }

    async fn mark_failed(&self, order_id: &str) -> GatewayResult<()> {
        self.update(order_id, |order| {
            if order.status != OrderStatus::Paid {
                order.status = OrderStatus::Failed;
            }
        })
        .await
    }

    async fn add_note(&self, order_id: &str, note: OrderNote) -> GatewayResult<()> {
        self.update(order_id, |order| order.notes.push(note)).await
    }
}

/// Pending-redirect markers keyed by visitor ID
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    markers: RwLock<HashMap<String, String>>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingOrderStore for InMemoryPendingStore {
    async fn put(&self, visitor_id: &str, order_id: &str) -> GatewayResult<()> {
        self.markers
            .write()
            .await
            .insert(visitor_id.to_string(), order_id.to_string());
        Ok(())
    }

    async fn take(&self, visitor_id: &str) -> GatewayResult<Option<String>> {
        Ok(self.markers.write().await.remove(visitor_id))
    }
}
