// src/services/test_support.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    db::{MemoryStore, Repositories},
    models::{
        auth::{Identity, RequestContext, Role},
        catalog::{CatalogService, CatalogServicePayload},
        orders::{LineItem, NewOrder, OrderStatus, ScheduleWindow, ServiceOrder},
    },
    services::{notification_service::RecordingNotifier, Services},
};

pub fn test_unit() -> Uuid {
    Uuid::from_u128(0x0f1c_1a00)
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, hour, minute, 0).unwrap()
}

pub fn admin_ctx() -> RequestContext {
    RequestContext::new(
        test_unit(),
        Identity { uid: "admin-1".into(), role: Role::Admin, email: Some("admin@oficina.dev".into()) },
    )
}

pub fn memory_repos() -> (Arc<MemoryStore>, Repositories) {
    let store = Arc::new(MemoryStore::new());
    let repos = Repositories::memory(store.clone());
    (store, repos)
}

/// OS solta, sem passar pelo repositório.
pub fn sample_order() -> ServiceOrder {
    let now = Utc::now();
    ServiceOrder {
        id: Uuid::new_v4(),
        unit_id: test_unit(),
        customer_id: Uuid::new_v4(),
        vehicle_id: Uuid::new_v4(),
        items: vec![LineItem { service_id: Uuid::new_v4(), name: "Troca de óleo".into(), price: Decimal::from(100) }],
        discount: Decimal::ZERO,
        total: Decimal::from(100),
        status: OrderStatus::Novo,
        assigned_to: None,
        scheduled_start: None,
        scheduled_end: None,
        notes: String::new(),
        kanban_order: 0,
        notified_24h: false,
        version: 1,
        created_at: now,
        updated_at: now,
        closed_at: None,
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub repos: Repositories,
    pub notifier: Arc<RecordingNotifier>,
    pub services: Services,
    pub ctx: RequestContext,
    default_item: LineItem,
}

impl Harness {
    pub async fn new() -> Self {
        let (store, repos) = memory_repos();
        let notifier = Arc::new(RecordingNotifier::default());
        let services = Services::build(&repos, notifier.clone(), Duration::hours(24));

        let now = Utc::now();
        let diagnostic = CatalogService {
            id: Uuid::new_v4(),
            unit_id: test_unit(),
            name: "Diagnóstico".into(),
            price: Decimal::from(100),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        repos.catalog.insert(&diagnostic).await.unwrap();

        Self {
            store,
            repos,
            notifier,
            services,
            ctx: admin_ctx(),
            default_item: diagnostic.snapshot(),
        }
    }

    pub fn unit(&self) -> Uuid {
        self.ctx.unit_id
    }

    pub fn default_service_id(&self) -> Uuid {
        self.default_item.service_id
    }

    pub async fn catalog_service(&self, name: &str, price: i64) -> CatalogService {
        self.services
            .crm
            .create_service(
                &self.ctx,
                CatalogServicePayload { name: name.into(), price: Decimal::from(price), is_active: true },
            )
            .await
            .unwrap()
    }

    pub async fn set_catalog_price(&self, service: &CatalogService, price: i64) {
        self.set_catalog_price_by_id(service.id, price).await;
    }

    pub async fn set_catalog_price_by_id(&self, id: Uuid, price: i64) {
        let current = self.repos.catalog.get(self.unit(), id).await.unwrap().unwrap();
        self.services
            .crm
            .update_service(
                &self.ctx,
                id,
                CatalogServicePayload { name: current.name, price: Decimal::from(price), is_active: true },
            )
            .await
            .unwrap();
    }

    pub async fn scheduled_order_for(
        &self,
        customer_id: Uuid,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> ServiceOrder {
        let new_order = NewOrder {
            customer_id,
            vehicle_id,
            items: vec![self.default_item.clone()],
            discount: Decimal::ZERO,
            window: Some(ScheduleWindow::new(start, end)),
            notes: String::new(),
            assigned_to: None,
        };
        self.services.orders.create_order(&self.ctx, new_order).await.unwrap()
    }

    pub async fn scheduled_order(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> ServiceOrder {
        self.scheduled_order_for(Uuid::new_v4(), Uuid::new_v4(), start, end).await
    }

    pub async fn order_with(&self, service_ids: &[Uuid]) -> ServiceOrder {
        let items = crate::services::crm_service::snapshot_items(
            self.repos.catalog.as_ref(),
            self.unit(),
            service_ids,
            &[],
        )
        .await
        .unwrap();
        let new_order = NewOrder {
            customer_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            items,
            discount: Decimal::ZERO,
            window: None,
            notes: String::new(),
            assigned_to: None,
        };
        self.services.orders.create_order(&self.ctx, new_order).await.unwrap()
    }

    pub async fn order_totalling(&self, total: i64) -> ServiceOrder {
        let service = self.catalog_service("Serviço", total).await;
        self.order_with(&[service.id]).await
    }

    pub async fn store_claim_reminder(&self, order: &ServiceOrder) {
        let start = order.scheduled_start.unwrap();
        assert!(self.repos.orders.claim_reminder(order.id, start).await.unwrap());
    }
}
