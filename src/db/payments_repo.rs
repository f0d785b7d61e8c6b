// src/db/payments_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::payments::Payment};

/// Sub-razão de pagamentos: só inserção e remoção.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Ordenado por `paid_at` crescente.
    async fn list_for_order(&self, unit_id: Uuid, order_id: Uuid) -> Result<Vec<Payment>, AppError>;

    async fn count_for_order(&self, unit_id: Uuid, order_id: Uuid) -> Result<i64, AppError>;

    /// Só grava se a OS ainda existir. `false` = OS não encontrada.
    async fn insert(&self, payment: &Payment) -> Result<bool, AppError>;

    async fn delete(&self, unit_id: Uuid, order_id: Uuid, payment_id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn list_for_order(&self, unit_id: Uuid, order_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, unit_id, order_id, amount, method, paid_at, created_at
            FROM payments
            WHERE unit_id = $1 AND order_id = $2
            ORDER BY paid_at ASC, created_at ASC
            "#,
        )
        .bind(unit_id)
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    async fn count_for_order(&self, unit_id: Uuid, order_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payments WHERE unit_id = $1 AND order_id = $2",
        )
        .bind(unit_id)
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert(&self, payment: &Payment) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE espera uma exclusão em andamento da OS terminar.
        let order: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM orders WHERE unit_id = $1 AND id = $2 FOR SHARE")
                .bind(payment.unit_id)
                .bind(payment.order_id)
                .fetch_optional(&mut *tx)
                .await?;
        if order.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO payments (id, unit_id, order_id, amount, method, paid_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(payment.id)
        .bind(payment.unit_id)
        .bind(payment.order_id)
        .bind(payment.amount)
        .bind(payment.method)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, unit_id: Uuid, order_id: Uuid, payment_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM payments WHERE unit_id = $1 AND order_id = $2 AND id = $3",
        )
        .bind(unit_id)
        .bind(order_id)
        .bind(payment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
