// src/db/quotes_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::quotes::{PublicQuote, Quote},
};

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn list(&self, unit_id: Uuid) -> Result<Vec<Quote>, AppError>;
    async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Quote>, AppError>;
    async fn insert(&self, quote: &Quote) -> Result<(), AppError>;
    async fn update(&self, quote: &Quote) -> Result<bool, AppError>;
    async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    // Cópias públicas: endereçadas só pelo token, sem unidade.
    async fn insert_public(&self, public: &PublicQuote) -> Result<(), AppError>;
    async fn find_public(&self, token: &str) -> Result<Option<PublicQuote>, AppError>;
}

const QUOTE_COLUMNS: &str = r#"
    id, unit_id, customer_id, vehicle_id, items, discount, total, status,
    public_token, decision_at, decision_source, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PgQuoteRepository {
    pool: PgPool,
}

impl PgQuoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuoteRepository for PgQuoteRepository {
    async fn list(&self, unit_id: Uuid) -> Result<Vec<Quote>, AppError> {
        let sql = format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE unit_id = $1 ORDER BY created_at DESC");
        let quotes = sqlx::query_as::<_, Quote>(&sql)
            .bind(unit_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(quotes)
    }

    async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Quote>, AppError> {
        let sql = format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE unit_id = $1 AND id = $2");
        let quote = sqlx::query_as::<_, Quote>(&sql)
            .bind(unit_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quote)
    }

    async fn insert(&self, quote: &Quote) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO quotes ({QUOTE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        );
        sqlx::query(&sql)
            .bind(quote.id)
            .bind(quote.unit_id)
            .bind(quote.customer_id)
            .bind(quote.vehicle_id)
            .bind(Json(&quote.items))
            .bind(quote.discount)
            .bind(quote.total)
            .bind(quote.status)
            .bind(quote.public_token.as_deref())
            .bind(quote.decision_at)
            .bind(quote.decision_source.as_deref())
            .bind(quote.created_at)
            .bind(quote.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, quote: &Quote) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE quotes SET
                customer_id = $3, vehicle_id = $4, items = $5, discount = $6, total = $7,
                status = $8, public_token = $9, decision_at = $10, decision_source = $11,
                updated_at = $12
            WHERE unit_id = $1 AND id = $2
            "#,
        )
        .bind(quote.unit_id)
        .bind(quote.id)
        .bind(quote.customer_id)
        .bind(quote.vehicle_id)
        .bind(Json(&quote.items))
        .bind(quote.discount)
        .bind(quote.total)
        .bind(quote.status)
        .bind(quote.public_token.as_deref())
        .bind(quote.decision_at)
        .bind(quote.decision_source.as_deref())
        .bind(quote.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM quotes WHERE unit_id = $1 AND id = $2")
            .bind(unit_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_public(&self, public: &PublicQuote) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO quotes_public (token, quote_id, unit_id, snapshot, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(public.token.as_str())
        .bind(public.quote_id)
        .bind(public.unit_id)
        .bind(Json(&public.snapshot))
        .bind(public.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_public(&self, token: &str) -> Result<Option<PublicQuote>, AppError> {
        let public = sqlx::query_as::<_, PublicQuote>(
            "SELECT token, quote_id, unit_id, snapshot, created_at FROM quotes_public WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(public)
    }
}
