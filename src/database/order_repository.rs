use crate::database::error::{DatabaseError, DatabaseErrorKind, DbResult};
use crate::error::{GatewayError, GatewayResult};
use crate::payments::traits::OrderRepository;
use crate::payments::types::{Order, OrderNote, OrderStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: String,
    total_minor: i64,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct OrderNoteRow {
    message: String,
    created_at: DateTime<Utc>,
}

/// Order repository over the shop's `orders` and `order_notes` tables
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, order_id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, total_minor, currency, status, created_at, updated_at
             FROM orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let notes = sqlx::query_as::<_, OrderNoteRow>(
            "SELECT message, created_at FROM order_notes
             WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::InvalidData {
                message: format!("unknown order status '{}'", row.status),
            })
        })?;

        Ok(Some(Order {
            id: row.id,
            total_minor: row.total_minor,
            currency: row.currency,
            status,
            notes: notes
                .into_iter()
                .map(|n| OrderNote {
                    message: n.message,
                    created_at: n.created_at,
                })
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Update the status unless the order is already paid
    async fn set_status(&self, order_id: &str, status: OrderStatus) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = NOW()
             WHERE id = $1 AND status <> 'paid'",
        )
        .bind(order_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 && self.fetch(order_id).await?.is_none() {
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            }));
        }

        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_id(&self, order_id: &str) -> GatewayResult<Option<Order>> {
        Ok(self.fetch(order_id).await?)
    }

    async fn mark_paid(&self, order_id: &str) -> GatewayResult<()> {
        self.set_status(order_id, OrderStatus::Paid)
            .await
            .map_err(|e| GatewayError::from(e.with_context("mark_paid")))
    }

    async fn mark_failed(&self, order_id: &str) -> GatewayResult<()> {
        self.set_status(order_id, OrderStatus::Failed)
            .await
            .map_err(|e| GatewayError::from(e.with_context("mark_failed")))
    }

    async fn add_note(&self, order_id: &str, note: OrderNote) -> GatewayResult<()> {
        sqlx::query(
            "INSERT INTO order_notes (id, order_id, message, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(&note.message)
        .bind(note.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx(e).with_context("add_note"))?;

        Ok(())
    }
}
