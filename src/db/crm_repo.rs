// src/db/crm_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::crm::{Customer, Vehicle},
};

#[async_trait]
pub trait CrmRepository: Send + Sync {
    // =========================================================================
    //  CLIENTES
    // =========================================================================

    async fn list_customers(&self, unit_id: Uuid) -> Result<Vec<Customer>, AppError>;
    async fn get_customer(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError>;
    async fn insert_customer(&self, customer: &Customer) -> Result<(), AppError>;
    async fn update_customer(&self, customer: &Customer) -> Result<bool, AppError>;
    async fn delete_customer(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    // =========================================================================
    //  VEÍCULOS
    // =========================================================================

    async fn list_vehicles(&self, unit_id: Uuid, customer_id: Uuid) -> Result<Vec<Vehicle>, AppError>;
    async fn count_vehicles(&self, unit_id: Uuid, customer_id: Uuid) -> Result<i64, AppError>;
    async fn get_vehicle(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Vehicle>, AppError>;
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), AppError>;
    async fn delete_vehicle(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgCrmRepository {
    pool: PgPool,
}

impl PgCrmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrmRepository for PgCrmRepository {
    async fn list_customers(&self, unit_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, unit_id, name, phone, email, document, created_at, updated_at
            FROM customers
            WHERE unit_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    async fn get_customer(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, unit_id, name, phone, email, document, created_at, updated_at
            FROM customers
            WHERE unit_id = $1 AND id = $2
            "#,
        )
        .bind(unit_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, unit_id, name, phone, email, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(customer.id)
        .bind(customer.unit_id)
        .bind(customer.name.as_str())
        .bind(customer.phone.as_deref())
        .bind(customer.email.as_deref())
        .bind(customer.document.as_deref())
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET name = $3, phone = $4, email = $5, document = $6, updated_at = $7
            WHERE unit_id = $1 AND id = $2
            "#,
        )
        .bind(customer.unit_id)
        .bind(customer.id)
        .bind(customer.name.as_str())
        .bind(customer.phone.as_deref())
        .bind(customer.email.as_deref())
        .bind(customer.document.as_deref())
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_customer(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM customers WHERE unit_id = $1 AND id = $2")
            .bind(unit_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_vehicles(&self, unit_id: Uuid, customer_id: Uuid) -> Result<Vec<Vehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, unit_id, customer_id, plate, make, model, year, created_at
            FROM vehicles
            WHERE unit_id = $1 AND customer_id = $2
            ORDER BY plate ASC
            "#,
        )
        .bind(unit_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(vehicles)
    }

    async fn count_vehicles(&self, unit_id: Uuid, customer_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM vehicles WHERE unit_id = $1 AND customer_id = $2",
        )
        .bind(unit_id)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn get_vehicle(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, unit_id, customer_id, plate, make, model, year, created_at
            FROM vehicles
            WHERE unit_id = $1 AND id = $2
            "#,
        )
        .bind(unit_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vehicle)
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, unit_id, customer_id, plate, make, model, year, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(vehicle.id)
        .bind(vehicle.unit_id)
        .bind(vehicle.customer_id)
        .bind(vehicle.plate.as_str())
        .bind(vehicle.make.as_deref())
        .bind(vehicle.model.as_deref())
        .bind(vehicle.year)
        .bind(vehicle.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_vehicle(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM vehicles WHERE unit_id = $1 AND id = $2")
            .bind(unit_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
