// src/db/catalog_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::catalog::CatalogService};

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list(&self, unit_id: Uuid) -> Result<Vec<CatalogService>, AppError>;
    async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<CatalogService>, AppError>;
    async fn insert(&self, service: &CatalogService) -> Result<(), AppError>;
    async fn update(&self, service: &CatalogService) -> Result<bool, AppError>;
    async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list(&self, unit_id: Uuid) -> Result<Vec<CatalogService>, AppError> {
        let services = sqlx::query_as::<_, CatalogService>(
            r#"
            SELECT id, unit_id, name, price, is_active, created_at, updated_at
            FROM services
            WHERE unit_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<CatalogService>, AppError> {
        let service = sqlx::query_as::<_, CatalogService>(
            r#"
            SELECT id, unit_id, name, price, is_active, created_at, updated_at
            FROM services
            WHERE unit_id = $1 AND id = $2
            "#,
        )
        .bind(unit_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(service)
    }

    async fn insert(&self, service: &CatalogService) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO services (id, unit_id, name, price, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(service.id)
        .bind(service.unit_id)
        .bind(service.name.as_str())
        .bind(service.price)
        .bind(service.is_active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, service: &CatalogService) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE services SET name = $3, price = $4, is_active = $5, updated_at = $6
            WHERE unit_id = $1 AND id = $2
            "#,
        )
        .bind(service.unit_id)
        .bind(service.id)
        .bind(service.name.as_str())
        .bind(service.price)
        .bind(service.is_active)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM services WHERE unit_id = $1 AND id = $2")
            .bind(unit_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
