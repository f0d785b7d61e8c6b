// src/db/orders_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgArguments, query::Query, types::Json, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::orders::{point_epsilon, OrderFilter, ScheduleWindow, ScheduledSlot, ServiceOrder},
};

/// Acesso às ordens de serviço.
///
/// `update` e `update_batch` usam o campo `version` como trava otimista:
/// recebem a versão lida pelo chamador e só gravam se ela ainda for a atual.
/// O retorno `false` significa que outra escrita chegou antes.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<ServiceOrder>, AppError>;

    /// Ordenado por status, posição no kanban e data de criação.
    async fn list(&self, unit_id: Uuid, filter: &OrderFilter) -> Result<Vec<ServiceOrder>, AppError>;

    /// OS agendadas cuja janela cruza `window` (mesma regra do detector),
    /// ordenadas pelo início.
    async fn list_overlapping(&self, unit_id: Uuid, window: ScheduleWindow) -> Result<Vec<ServiceOrder>, AppError>;

    /// Candidatas a conflito: OS não canceladas com início antes de `before`,
    /// filtradas pelo cliente e/ou veículo informados.
    async fn schedule_candidates(
        &self,
        unit_id: Uuid,
        customer_id: Option<Uuid>,
        vehicle_id: Option<Uuid>,
        before: DateTime<Utc>,
    ) -> Result<Vec<ScheduledSlot>, AppError>;

    async fn insert(&self, order: &ServiceOrder) -> Result<(), AppError>;

    async fn update(&self, order: &ServiceOrder, expected_version: i32) -> Result<bool, AppError>;

    /// Tudo ou nada: se qualquer versão estiver desatualizada, nada é gravado.
    async fn update_batch(&self, writes: &[(ServiceOrder, i32)]) -> Result<bool, AppError>;

    /// Só remove se a OS não tiver pagamentos; a checagem e a remoção são
    /// uma escrita só. `false` = OS inexistente ou com pagamentos.
    async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// Varredura entre unidades usada pelo job de lembretes.
    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ServiceOrder>, AppError>;

    /// Marca `notified_24h` somente se ainda estiver falso e o início não
    /// tiver mudado. `true` = este chamador ganhou o lembrete.
    async fn claim_reminder(&self, id: Uuid, scheduled_start: DateTime<Utc>) -> Result<bool, AppError>;
}

const ORDER_COLUMNS: &str = r#"
    id, unit_id, customer_id, vehicle_id, items, discount, total, status,
    assigned_to, scheduled_start, scheduled_end, notes, kanban_order,
    notified_24h, version, created_at, updated_at, closed_at
"#;

const UPDATE_ORDER_SQL: &str = r#"
    UPDATE orders SET
        customer_id = $3, vehicle_id = $4, items = $5, discount = $6, total = $7,
        status = $8, assigned_to = $9, scheduled_start = $10, scheduled_end = $11,
        notes = $12, kanban_order = $13, notified_24h = $14, version = $15,
        updated_at = $16, closed_at = $17
    WHERE id = $1 AND unit_id = $2 AND version = $18
"#;

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn update_query(order: &ServiceOrder, expected_version: i32) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(UPDATE_ORDER_SQL)
        .bind(order.id)
        .bind(order.unit_id)
        .bind(order.customer_id)
        .bind(order.vehicle_id)
        .bind(Json(&order.items))
        .bind(order.discount)
        .bind(order.total)
        .bind(order.status)
        .bind(order.assigned_to.as_deref())
        .bind(order.scheduled_start)
        .bind(order.scheduled_end)
        .bind(order.notes.as_str())
        .bind(order.kanban_order)
        .bind(order.notified_24h)
        .bind(order.version)
        .bind(order.updated_at)
        .bind(order.closed_at)
        .bind(expected_version)
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<ServiceOrder>, AppError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE unit_id = $1 AND id = $2");
        let order = sqlx::query_as::<_, ServiceOrder>(&sql)
            .bind(unit_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn list(&self, unit_id: Uuid, filter: &OrderFilter) -> Result<Vec<ServiceOrder>, AppError> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE unit_id = $1
              AND ($2::order_status IS NULL OR status = $2)
              AND ($3::timestamptz IS NULL OR scheduled_start >= $3)
              AND ($4::timestamptz IS NULL OR scheduled_start <= $4)
              AND ($5::text IS NULL OR assigned_to = $5)
            ORDER BY status, kanban_order, created_at
            "#
        );
        let orders = sqlx::query_as::<_, ServiceOrder>(&sql)
            .bind(unit_id)
            .bind(filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.assigned_to.as_deref())
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    async fn list_overlapping(&self, unit_id: Uuid, window: ScheduleWindow) -> Result<Vec<ServiceOrder>, AppError> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE unit_id = $1
              AND scheduled_start IS NOT NULL
              AND scheduled_start < $3
              AND COALESCE(scheduled_end, scheduled_start + $4::interval) > $2
            ORDER BY scheduled_start, created_at
            "#
        );
        let orders = sqlx::query_as::<_, ServiceOrder>(&sql)
            .bind(unit_id)
            .bind(window.start)
            .bind(window.effective_end())
            .bind(point_epsilon())
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    async fn schedule_candidates(
        &self,
        unit_id: Uuid,
        customer_id: Option<Uuid>,
        vehicle_id: Option<Uuid>,
        before: DateTime<Utc>,
    ) -> Result<Vec<ScheduledSlot>, AppError> {
        let slots = sqlx::query_as::<_, ScheduledSlot>(
            r#"
            SELECT id, scheduled_start, scheduled_end FROM orders
            WHERE unit_id = $1
              AND scheduled_start IS NOT NULL
              AND scheduled_start < $4
              AND status <> 'cancelado'
              AND ($2::uuid IS NULL OR customer_id = $2)
              AND ($3::uuid IS NULL OR vehicle_id = $3)
            "#,
        )
        .bind(unit_id)
        .bind(customer_id)
        .bind(vehicle_id)
        .bind(before)
        .fetch_all(&self.pool)
        .await?;
        Ok(slots)
    }

    async fn insert(&self, order: &ServiceOrder) -> Result<(), AppError> {
        let sql = format!(
            r#"
            INSERT INTO orders ({ORDER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#
        );
        sqlx::query(&sql)
            .bind(order.id)
            .bind(order.unit_id)
            .bind(order.customer_id)
            .bind(order.vehicle_id)
            .bind(Json(&order.items))
            .bind(order.discount)
            .bind(order.total)
            .bind(order.status)
            .bind(order.assigned_to.as_deref())
            .bind(order.scheduled_start)
            .bind(order.scheduled_end)
            .bind(order.notes.as_str())
            .bind(order.kanban_order)
            .bind(order.notified_24h)
            .bind(order.version)
            .bind(order.created_at)
            .bind(order.updated_at)
            .bind(order.closed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, order: &ServiceOrder, expected_version: i32) -> Result<bool, AppError> {
        let result = update_query(order, expected_version).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_batch(&self, writes: &[(ServiceOrder, i32)]) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        for (order, expected_version) in writes {
            let result = update_query(order, *expected_version).execute(&mut *tx).await?;
            if result.rows_affected() != 1 {
                tx.rollback().await?;
                return Ok(false);
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        // A trava na linha segura inserções de pagamento até o commit.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM orders WHERE unit_id = $1 AND id = $2 FOR UPDATE")
                .bind(unit_id)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM orders
            WHERE unit_id = $1 AND id = $2
              AND NOT EXISTS (SELECT 1 FROM payments WHERE unit_id = $1 AND order_id = $2)
            "#,
        )
        .bind(unit_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ServiceOrder>, AppError> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE notified_24h = FALSE
              AND status IN ('novo', 'em_andamento')
              AND scheduled_start >= $1
              AND scheduled_start <= $2
            ORDER BY scheduled_start
            "#
        );
        let orders = sqlx::query_as::<_, ServiceOrder>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    async fn claim_reminder(&self, id: Uuid, scheduled_start: DateTime<Utc>) -> Result<bool, AppError> {
        // A versão sobe para que uma edição concorrente não desfaça a marcação.
        let result = sqlx::query(
            r#"
            UPDATE orders SET notified_24h = TRUE, version = version + 1
            WHERE id = $1 AND notified_24h = FALSE AND scheduled_start = $2
            "#,
        )
        .bind(id)
        .bind(scheduled_start)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
