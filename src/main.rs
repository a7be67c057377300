use halk_gateway::api::{self, AppState};
use halk_gateway::config::AppConfig;
use halk_gateway::logging;
use halk_gateway::payments::providers::HalkGateway;
use halk_gateway::payments::traits::{OrderRepository, PendingOrderStore};
use halk_gateway::store::{InMemoryOrderRepository, InMemoryPendingStore};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    logging::init(&config.log)?;

    // Log startup info
    tracing::info!("Starting Halk Bank payment gateway");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Payment page: {}", config.gateway.payment_endpoint());
    tracing::info!("Hash scheme: {:?}", config.gateway.hash_scheme);

    let orders = order_repository(&config).await?;
    let pending = pending_store(&config).await?;

    let gateway = HalkGateway::new(config.gateway.clone(), orders, pending)?;

    let state = AppState {
        gateway: Arc::new(gateway),
        checkout_url: config.gateway.checkout_url(),
        environment: config.server.environment.clone(),
        testing_mode: config.gateway.testing_mode,
        hash_scheme: config.gateway.hash_scheme,
    };

    // Build router
    let app = api::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "database")]
async fn order_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn OrderRepository>> {
    use halk_gateway::database::{self, PgOrderRepository, PoolConfig};

    let Some(db) = &config.database else {
        tracing::warn!("No database configured, orders are kept in memory");
        return Ok(Arc::new(InMemoryOrderRepository::new()));
    };

    let pool = database::init_pool(
        &db.url,
        Some(PoolConfig {
            max_connections: db.max_connections,
            ..PoolConfig::default()
        }),
    )
    .await?;
    database::health_check(&pool).await?;

    Ok(Arc::new(PgOrderRepository::new(pool)))
}

#[cfg(not(feature = "database"))]
async fn order_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn OrderRepository>> {
    if config.database.is_some() {
        tracing::warn!("Database configured but the `database` feature is disabled");
    }
    Ok(Arc::new(InMemoryOrderRepository::new()))
}

#[cfg(feature = "cache")]
async fn pending_store(config: &AppConfig) -> anyhow::Result<Arc<dyn PendingOrderStore>> {
    use halk_gateway::cache::{self, CacheConfig, RedisPendingStore};
    use std::time::Duration;

    let Some(redis) = &config.redis else {
        tracing::warn!("No Redis configured, pending redirects are kept in memory");
        return Ok(Arc::new(InMemoryPendingStore::new()));
    };

    let pool = cache::init_cache_pool(CacheConfig {
        redis_url: redis.url.clone(),
        ..CacheConfig::default()
    })
    .await?;

    Ok(Arc::new(RedisPendingStore::new(
        pool,
        Duration::from_secs(redis.pending_ttl_secs),
    )))
}

#[cfg(not(feature = "cache"))]
async fn pending_store(config: &AppConfig) -> anyhow::Result<Arc<dyn PendingOrderStore>> {
    if config.redis.is_some() {
        tracing::warn!("Redis configured but the `cache` feature is disabled");
    }
    Ok(Arc::new(InMemoryPendingStore::new()))
}
