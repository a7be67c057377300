use super::{error::CacheResult, RedisPool};
use crate::error::GatewayResult;
use crate::payments::providers::halk::GATEWAY_ID;
use crate::payments::traits::PendingOrderStore;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub fn pending_key(visitor_id: &str) -> String {
    format!("{}:pending:{}", GATEWAY_ID, visitor_id)
}

/// Pending-redirect markers stored in Redis with an expiry
pub struct RedisPendingStore {
    pool: RedisPool,
    ttl: Duration,
}

impl RedisPendingStore {
    pub fn new(pool: RedisPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    async fn run<T: redis::FromRedisValue>(&self, cmd: redis::Cmd) -> CacheResult<T> {
        let mut conn = self.pool.get().await?;
        let value = cmd.query_async(&mut *conn).await?;
        Ok(value)
    }
}

#[async_trait]
impl PendingOrderStore for RedisPendingStore {
    async fn put(&self, visitor_id: &str, order_id: &str) -> GatewayResult<()> {
        let key = pending_key(visitor_id);
        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(order_id).arg("EX").arg(self.ttl.as_secs().max(1));
        let _: () = self.run(cmd).await?;
        debug!("Stored pending order {} under {}", order_id, key);
        Ok(())
    }

    async fn take(&self, visitor_id: &str) -> GatewayResult<Option<String>> {
        let mut cmd = redis::cmd("GETDEL");
        cmd.arg(pending_key(visitor_id));
        Ok(self.run(cmd).await?)
    }
}
