use crate::error::GatewayError;
use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    #[error("Redis command error: {0}")]
    CommandError(String),

    #[error("Redis pool timed out")]
    PoolTimeout,
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() {
            CacheError::ConnectionError(err.to_string())
        } else {
            CacheError::CommandError(err.to_string())
        }
    }
}

impl From<bb8::RunError<redis::RedisError>> for CacheError {
    fn from(err: bb8::RunError<redis::RedisError>) -> Self {
        match err {
            bb8::RunError::User(e) => CacheError::ConnectionError(e.to_string()),
            bb8::RunError::TimedOut => CacheError::PoolTimeout,
        }
    }
}

impl From<CacheError> for GatewayError {
    fn from(err: CacheError) -> Self {
        GatewayError::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_maps_to_storage() {
        let err: CacheError = bb8::RunError::<redis::RedisError>::TimedOut.into();
        assert!(matches!(err, CacheError::PoolTimeout));
        assert!(GatewayError::from(err).is_storage());
    }
}
