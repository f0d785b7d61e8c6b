// src/services/audit_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AuditRepository,
    models::{
        audit::{AuditAction, AuditDiff, AuditLog, FieldChange},
        auth::{Identity, RequestContext},
    },
};

/// Diferença campo a campo entre duas versões de um documento.
/// Campos que somem aparecem com `after: null`.
pub fn diff(before: &Value, after: &Value) -> AuditDiff {
    let empty = serde_json::Map::new();
    let before_obj = before.as_object().unwrap_or(&empty);
    let after_obj = after.as_object().unwrap_or(&empty);

    let mut changes = AuditDiff::new();

    for (key, value) in after_obj {
        if before_obj.get(key) != Some(value) {
            changes.insert(
                key.clone(),
                FieldChange {
                    before: before_obj.get(key).cloned().unwrap_or(Value::Null),
                    after: value.clone(),
                },
            );
        }
    }

    for (key, value) in before_obj {
        if !after_obj.contains_key(key) {
            changes.insert(
                key.clone(),
                FieldChange { before: value.clone(), after: Value::Null },
            );
        }
    }

    changes
}

#[derive(Clone)]
pub struct AuditService {
    repo: Arc<dyn AuditRepository>,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }

    /// Registra create/update/delete de um documento. A ação sai de quais
    /// lados existem. Falhas viram log e não afetam a escrita principal.
    pub async fn record_change<T>(
        &self,
        ctx: &RequestContext,
        collection: &str,
        doc_id: Uuid,
        before: Option<&T>,
        after: Option<&T>,
    ) where
        T: Serialize + Sync,
    {
        let action = match (before, after) {
            (None, Some(_)) => AuditAction::Create,
            (Some(_), None) => AuditAction::Delete,
            _ => AuditAction::Update,
        };

        let to_value = |doc: Option<&T>| {
            doc.map(serde_json::to_value)
                .transpose()
                .map(|v| v.unwrap_or(Value::Null))
        };

        let changes = match (to_value(before), to_value(after)) {
            (Ok(b), Ok(a)) => diff(&b, &a),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("⚠️ Auditoria ignorada ({}/{}): {}", collection, doc_id, e);
                return;
            }
        };

        self.record(
            Some(ctx.unit_id),
            collection,
            &doc_id.to_string(),
            action,
            changes,
            Some(&ctx.identity),
        )
        .await;
    }

    pub async fn record(
        &self,
        unit_id: Option<Uuid>,
        collection: &str,
        doc_id: &str,
        action: AuditAction,
        diff: AuditDiff,
        actor: Option<&Identity>,
    ) {
        let entry = AuditLog {
            id: Uuid::new_v4(),
            unit_id,
            collection: collection.to_string(),
            doc_id: doc_id.to_string(),
            action,
            diff,
            ts: Utc::now(),
            actor_uid: actor.map(|a| a.uid.clone()),
            actor_email: actor.and_then(|a| a.email.clone()),
        };

        if let Err(e) = self.repo.insert(&entry).await {
            tracing::warn!("⚠️ Falha ao gravar auditoria de {}/{}: {}", collection, doc_id, e);
        }
    }

    pub async fn history(
        &self,
        ctx: &RequestContext,
        collection: &str,
        doc_id: &str,
    ) -> Result<Vec<AuditLog>, AppError> {
        self.repo.list_for_doc(ctx.unit_id, collection, doc_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::services::test_support::{admin_ctx, memory_repos};

    #[test]
    fn diff_reports_changed_added_and_removed_fields() {
        let before = json!({ "name": "Ana", "phone": "1", "email": "a@x.com" });
        let after = json!({ "name": "Ana", "phone": "2", "document": "123" });

        let d = diff(&before, &after);

        assert!(!d.contains_key("name"));
        assert_eq!(d["phone"], FieldChange { before: json!("1"), after: json!("2") });
        assert_eq!(d["document"], FieldChange { before: Value::Null, after: json!("123") });
        assert_eq!(d["email"], FieldChange { before: json!("a@x.com"), after: Value::Null });
    }

    #[test]
    fn diff_of_creation_lists_every_field() {
        let d = diff(&Value::Null, &json!({ "a": 1, "b": 2 }));
        assert_eq!(d.len(), 2);
        assert_eq!(d["a"].before, Value::Null);
    }

    #[tokio::test]
    async fn record_change_stores_actor_and_action() {
        let (_, repos) = memory_repos();
        let audit = AuditService::new(repos.audit.clone());
        let ctx = admin_ctx();
        let doc = Uuid::new_v4();

        audit
            .record_change(&ctx, "customers", doc, None, Some(&json!({ "name": "Ana" })))
            .await;

        let history = audit.history(&ctx, "customers", &doc.to_string()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, AuditAction::Create);
        assert_eq!(history[0].actor_uid.as_deref(), Some(ctx.user_id()));
        assert_eq!(history[0].diff["name"].after, json!("Ana"));
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let (store, repos) = memory_repos();
        let audit = AuditService::new(repos.audit.clone());
        let ctx = admin_ctx();
        store.set_fail_writes(true);

        audit
            .record_change(&ctx, "customers", Uuid::new_v4(), None, Some(&json!({ "x": 1 })))
            .await;
    }
}
