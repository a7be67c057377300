use crate::error::GatewayError;
use std::fmt;

/// Database error kinds surfaced by the order repository
#[derive(Debug, Clone)]
pub enum DatabaseErrorKind {
    /// Connection pool is exhausted
    PoolExhausted,
    /// Record not found
    NotFound {
        entity: String,
        id: String,
    },
    /// Query execution error
    QueryError {
        message: String,
    },
    /// Database connection error
    ConnectionError {
        message: String,
    },
    /// Stored value cannot be mapped onto a domain type
    InvalidData {
        message: String,
    },
    /// Configuration error
    ConfigError {
        message: String,
    },
    /// Unknown error
    Unknown {
        message: String,
    },
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DatabaseError>;

#[derive(Debug, Clone)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub context: Option<String>,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map SQLx error to our custom error type
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::new(DatabaseErrorKind::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            }),
            sqlx::Error::PoolTimedOut => Self::new(DatabaseErrorKind::PoolExhausted),
            sqlx::Error::PoolClosed => Self::new(DatabaseErrorKind::ConnectionError {
                message: "Connection pool is closed".to_string(),
            }),
            sqlx::Error::Configuration(msg) => Self::new(DatabaseErrorKind::ConfigError {
                message: msg.to_string(),
            }),
            sqlx::Error::Database(db_err) => Self::new(DatabaseErrorKind::QueryError {
                message: db_err.message().to_string(),
            }),
            sqlx::Error::Io(io_err) => Self::new(DatabaseErrorKind::ConnectionError {
                message: io_err.to_string(),
            }),
            _ => Self::new(DatabaseErrorKind::Unknown {
                message: error.to_string(),
            }),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match &self.kind {
            DatabaseErrorKind::PoolExhausted => {
                "Database connection pool exhausted. Please try again.".to_string()
            }
            DatabaseErrorKind::NotFound { entity, id } => {
                format!("{} with ID '{}' not found", entity, id)
            }
            DatabaseErrorKind::QueryError { message } => {
                format!("Database query failed: {}", message)
            }
            DatabaseErrorKind::ConnectionError { message } => {
                format!("Database connection error: {}", message)
            }
            DatabaseErrorKind::InvalidData { message } => {
                format!("Invalid stored data: {}", message)
            }
            DatabaseErrorKind::ConfigError { message } => {
                format!("Database configuration error: {}", message)
            }
            DatabaseErrorKind::Unknown { message } => {
                format!("Unknown database error: {}", message)
            }
        };

        if let Some(context) = &self.context {
            write!(f, "{} ({})", message, context)
        } else {
            write!(f, "{}", message)
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<DatabaseError> for GatewayError {
    fn from(err: DatabaseError) -> Self {
        match &err.kind {
            DatabaseErrorKind::NotFound { entity, id } if entity == "Order" => {
                GatewayError::order_not_found(id.clone())
            }
            _ => GatewayError::storage(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_context() {
        let err = DatabaseError::new(DatabaseErrorKind::PoolExhausted).with_context("mark_paid");
        assert_eq!(
            err.to_string(),
            "Database connection pool exhausted. Please try again. (mark_paid)"
        );
    }

    #[test]
    fn test_other_kinds_map_to_storage_error() {
        let err = DatabaseError::new(DatabaseErrorKind::NotFound {
            entity: "Record".to_string(),
            id: "unknown".to_string(),
        });
        assert!(GatewayError::from(err).is_storage());
    }

    #[test]
    fn test_order_not_found_maps_to_gateway_error() {
        let err = DatabaseError::new(DatabaseErrorKind::NotFound {
            entity: "Order".to_string(),
            id: "1001".to_string(),
        });
        assert!(matches!(
            GatewayError::from(err),
            GatewayError::OrderNotFound { ref order_id } if order_id == "1001"
        ));
    }

    #[test]
    fn test_from_sqlx_pool_timeout() {
        let err = DatabaseError::from_sqlx(sqlx::Error::PoolTimedOut);
        assert!(matches!(err.kind, DatabaseErrorKind::PoolExhausted));
        assert!(GatewayError::from(err).is_storage());
    }
}
