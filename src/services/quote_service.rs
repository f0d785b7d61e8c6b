// src/services/quote_service.rs

use std::sync::Arc;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, QuoteRepository},
    models::{
        audit::{AuditAction, AuditDiff, FieldChange},
        auth::RequestContext,
        orders::{compute_total, NewOrder, ServiceOrder},
        quotes::{PublicQuote, PublishedQuote, Quote, QuotePayload, QuoteStatus},
    },
    services::{audit_service::AuditService, crm_service::snapshot_items, order_service::OrderService},
};

const TOKEN_LEN: usize = 20;

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct QuoteService {
    quotes: Arc<dyn QuoteRepository>,
    catalog: Arc<dyn CatalogRepository>,
    orders: OrderService,
    audit: AuditService,
}

impl QuoteService {
    pub fn new(
        quotes: Arc<dyn QuoteRepository>,
        catalog: Arc<dyn CatalogRepository>,
        orders: OrderService,
        audit: AuditService,
    ) -> Self {
        Self { quotes, catalog, orders, audit }
    }

    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<Quote>, AppError> {
        self.quotes.list(ctx.unit_id).await
    }

    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> Result<Quote, AppError> {
        self.quotes
            .get(ctx.unit_id, id)
            .await?
            .ok_or(AppError::NotFound("quote_not_found"))
    }

    pub async fn create(&self, ctx: &RequestContext, payload: QuotePayload) -> Result<Quote, AppError> {
        let customer_id = payload.customer_id.ok_or(AppError::InvalidInput("customer_required"))?;
        let vehicle_id = payload.vehicle_id.ok_or(AppError::InvalidInput("vehicle_required"))?;
        if payload.service_ids.is_empty() {
            return Err(AppError::InvalidInput("quote_items_required"));
        }
        let discount = payload.discount.unwrap_or(Decimal::ZERO);
        if discount < Decimal::ZERO {
            return Err(AppError::InvalidInput("negative_discount"));
        }

        let items = snapshot_items(self.catalog.as_ref(), ctx.unit_id, &payload.service_ids, &[]).await?;
        let now = Utc::now();
        let quote = Quote {
            id: Uuid::new_v4(),
            unit_id: ctx.unit_id,
            customer_id,
            vehicle_id,
            total: compute_total(&items, discount),
            items,
            discount,
            status: payload.status.unwrap_or(QuoteStatus::Rascunho),
            public_token: None,
            decision_at: None,
            decision_source: None,
            created_at: now,
            updated_at: now,
        };
        self.quotes.insert(&quote).await?;
        Ok(quote)
    }

    pub async fn update(&self, ctx: &RequestContext, id: Uuid, payload: QuotePayload) -> Result<Quote, AppError> {
        let current = self.get(ctx, id).await?;
        let mut next = current.clone();

        if let Some(customer_id) = payload.customer_id {
            next.customer_id = customer_id;
        }
        if let Some(vehicle_id) = payload.vehicle_id {
            next.vehicle_id = vehicle_id;
        }
        if !payload.service_ids.is_empty() {
            next.items = snapshot_items(self.catalog.as_ref(), ctx.unit_id, &payload.service_ids, &current.items).await?;
        }
        if let Some(discount) = payload.discount {
            if discount < Decimal::ZERO {
                return Err(AppError::InvalidInput("negative_discount"));
            }
            next.discount = discount;
        }
        if let Some(status) = payload.status {
            next.status = status;
        }
        next.total = compute_total(&next.items, next.discount);
        next.updated_at = Utc::now();

        if !self.quotes.update(&next).await? {
            return Err(AppError::NotFound("quote_not_found"));
        }
        Ok(next)
    }

    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), AppError> {
        if !self.quotes.delete(ctx.unit_id, id).await? {
            return Err(AppError::NotFound("quote_not_found"));
        }
        Ok(())
    }

    /// Gera um link público com uma cópia congelada do orçamento.
    /// Rascunhos passam a `enviado`.
    pub async fn publish(&self, ctx: &RequestContext, id: Uuid) -> Result<PublishedQuote, AppError> {
        let mut quote = self.get(ctx, id).await?;
        let token = generate_token();

        if quote.status == QuoteStatus::Rascunho {
            quote.status = QuoteStatus::Enviado;
        }
        quote.public_token = Some(token.clone());
        quote.updated_at = Utc::now();

        let public = PublicQuote {
            token: token.clone(),
            quote_id: quote.id,
            unit_id: quote.unit_id,
            snapshot: quote.clone(),
            created_at: quote.updated_at,
        };
        if !self.quotes.update(&quote).await? {
            return Err(AppError::NotFound("quote_not_found"));
        }
        self.quotes.insert_public(&public).await?;

        tracing::info!("🔗 Orçamento {} publicado", quote.id);
        Ok(PublishedQuote { token, quote_id: quote.id })
    }

    /// Leitura sem autenticação.
    pub async fn public_view(&self, token: &str) -> Result<PublicQuote, AppError> {
        self.quotes
            .find_public(token)
            .await?
            .ok_or(AppError::NotFound("public_quote_not_found"))
    }

    /// Aceite ou recusa pelo cliente através do link público.
    pub async fn decide(&self, token: Option<&str>, decision: QuoteStatus) -> Result<(), AppError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AppError::InvalidInput("quote_token_missing"))?;
        let public = self.public_view(token).await?;
        let now = Utc::now();

        match self.quotes.get(public.unit_id, public.quote_id).await? {
            Some(mut quote) => {
                quote.status = decision;
                quote.decision_at = Some(now);
                quote.decision_source = Some("public".to_string());
                quote.updated_at = now;
                self.quotes.update(&quote).await?;
            }
            None => tracing::warn!("⚠️ Orçamento {} do link público não existe mais", public.quote_id),
        }

        let mut diff = AuditDiff::new();
        diff.insert(
            "status".to_string(),
            FieldChange {
                before: serde_json::Value::String(public.snapshot.status.as_str().to_string()),
                after: serde_json::Value::String(decision.as_str().to_string()),
            },
        );
        self.audit
            .record(Some(public.unit_id), "quotes", &public.quote_id.to_string(), AuditAction::Update, diff, None)
            .await;

        tracing::info!("📝 Orçamento {} marcado como {}", public.quote_id, decision.as_str());
        Ok(())
    }

    /// Converte em OS reaproveitando os itens já congelados no orçamento.
    pub async fn convert_to_order(&self, ctx: &RequestContext, id: Uuid) -> Result<ServiceOrder, AppError> {
        let quote = self.get(ctx, id).await?;

        let new_order = NewOrder {
            customer_id: quote.customer_id,
            vehicle_id: quote.vehicle_id,
            items: quote.items.clone(),
            discount: quote.discount,
            window: None,
            notes: format!("Orçamento {}", quote.id),
            assigned_to: None,
        };
        self.orders.create_order(ctx, new_order).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Harness;

    async fn quote(h: &Harness) -> Quote {
        let service = h.catalog_service("Revisão", 300).await;
        h.services
            .quotes
            .create(
                &h.ctx,
                QuotePayload {
                    customer_id: Some(Uuid::new_v4()),
                    vehicle_id: Some(Uuid::new_v4()),
                    service_ids: vec![service.id],
                    discount: Some(Decimal::from(50)),
                    status: None,
                },
            )
            .await
            .unwrap()
    }

    /// Repositório que apaga o orçamento logo depois de entregá-lo.
    struct VanishingQuotes(Arc<crate::db::MemoryStore>);

    #[async_trait::async_trait]
    impl QuoteRepository for VanishingQuotes {
        async fn list(&self, unit_id: Uuid) -> Result<Vec<Quote>, AppError> {
            QuoteRepository::list(self.0.as_ref(), unit_id).await
        }
        async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Quote>, AppError> {
            let found = QuoteRepository::get(self.0.as_ref(), unit_id, id).await?;
            QuoteRepository::delete(self.0.as_ref(), unit_id, id).await?;
            Ok(found)
        }
        async fn insert(&self, quote: &Quote) -> Result<(), AppError> {
            QuoteRepository::insert(self.0.as_ref(), quote).await
        }
        async fn update(&self, quote: &Quote) -> Result<bool, AppError> {
            QuoteRepository::update(self.0.as_ref(), quote).await
        }
        async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
            QuoteRepository::delete(self.0.as_ref(), unit_id, id).await
        }
        async fn insert_public(&self, public: &PublicQuote) -> Result<(), AppError> {
            self.0.insert_public(public).await
        }
        async fn find_public(&self, token: &str) -> Result<Option<PublicQuote>, AppError> {
            self.0.find_public(token).await
        }
    }

    #[test]
    fn tokens_are_twenty_alphanumerics() {
        let token = generate_token();
        assert_eq!(token.len(), 20);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn publish_then_accept_updates_quote_and_audits() {
        let h = Harness::new().await;
        let q = quote(&h).await;
        assert_eq!(q.total, Decimal::from(250));

        let published = h.services.quotes.publish(&h.ctx, q.id).await.unwrap();
        let public = h.services.quotes.public_view(&published.token).await.unwrap();
        assert_eq!(public.snapshot.status, QuoteStatus::Enviado);

        h.services.quotes.decide(Some(&published.token), QuoteStatus::Aceito).await.unwrap();

        let stored = h.services.quotes.get(&h.ctx, q.id).await.unwrap();
        assert_eq!(stored.status, QuoteStatus::Aceito);
        assert_eq!(stored.decision_source.as_deref(), Some("public"));
        assert!(stored.decision_at.is_some());

        let history = h.services.audit.history(&h.ctx, "quotes", &q.id.to_string()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].actor_uid, None);
        assert_eq!(history[0].diff["status"].before, serde_json::json!("enviado"));
        assert_eq!(history[0].diff["status"].after, serde_json::json!("aceito"));
    }

    #[tokio::test]
    async fn decide_validates_the_token() {
        let h = Harness::new().await;
        let err = h.services.quotes.decide(None, QuoteStatus::Rejeitado).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput("quote_token_missing")));

        let err = h.services.quotes.decide(Some("nope"), QuoteStatus::Rejeitado).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("public_quote_not_found")));
    }

    #[tokio::test]
    async fn convert_reuses_captured_prices() {
        let h = Harness::new().await;
        let q = quote(&h).await;
        h.set_catalog_price_by_id(q.items[0].service_id, 999).await;

        let order = h.services.quotes.convert_to_order(&h.ctx, q.id).await.unwrap();
        assert_eq!(order.items, q.items);
        assert_eq!(order.total, Decimal::from(250));
    }

    #[tokio::test]
    async fn status_only_update_keeps_discount_and_total() {
        let h = Harness::new().await;
        let q = quote(&h).await;

        let payload: QuotePayload = serde_json::from_value(serde_json::json!({ "status": "enviado" })).unwrap();
        let updated = h.services.quotes.update(&h.ctx, q.id, payload).await.unwrap();

        assert_eq!(updated.status, QuoteStatus::Enviado);
        assert_eq!(updated.discount, Decimal::from(50));
        assert_eq!(updated.total, Decimal::from(250));
        assert_eq!(updated.items, q.items);
    }

    #[tokio::test]
    async fn negative_discount_is_rejected_on_update() {
        let h = Harness::new().await;
        let q = quote(&h).await;

        let payload: QuotePayload = serde_json::from_value(serde_json::json!({ "discount": -1 })).unwrap();
        let err = h.services.quotes.update(&h.ctx, q.id, payload).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput("negative_discount")));
    }

    #[tokio::test]
    async fn publishing_a_quote_deleted_meanwhile_is_not_found() {
        let h = Harness::new().await;
        let q = quote(&h).await;

        let quotes = QuoteService::new(
            Arc::new(VanishingQuotes(h.store.clone())),
            h.repos.catalog.clone(),
            h.services.orders.clone(),
            h.services.audit.clone(),
        );
        let err = quotes.publish(&h.ctx, q.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("quote_not_found")));
        assert!(QuoteRepository::get(h.store.as_ref(), h.unit(), q.id).await.unwrap().is_none());
    }
}
