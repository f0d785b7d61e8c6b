// src/db/audit_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{common::error::AppError, models::audit::AuditLog};

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert(&self, entry: &AuditLog) -> Result<(), AppError>;

    /// Histórico de um documento, do mais antigo para o mais novo.
    async fn list_for_doc(
        &self,
        unit_id: Uuid,
        collection: &str,
        doc_id: &str,
    ) -> Result<Vec<AuditLog>, AppError>;
}

#[derive(Clone)]
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn insert(&self, entry: &AuditLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, unit_id, collection, doc_id, action, diff, ts, actor_uid, actor_email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.unit_id)
        .bind(entry.collection.as_str())
        .bind(entry.doc_id.as_str())
        .bind(entry.action)
        .bind(Json(&entry.diff))
        .bind(entry.ts)
        .bind(entry.actor_uid.as_deref())
        .bind(entry.actor_email.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_doc(
        &self,
        unit_id: Uuid,
        collection: &str,
        doc_id: &str,
    ) -> Result<Vec<AuditLog>, AppError> {
        let entries = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, unit_id, collection, doc_id, action, diff, ts, actor_uid, actor_email
            FROM audit_logs
            WHERE unit_id = $1 AND collection = $2 AND doc_id = $3
            ORDER BY ts ASC
            "#,
        )
        .bind(unit_id)
        .bind(collection)
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
