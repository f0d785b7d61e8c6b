// src/db.rs

use std::sync::Arc;

use sqlx::PgPool;

pub mod audit_repo;
pub mod catalog_repo;
pub mod crm_repo;
pub mod memory;
pub mod orders_repo;
pub mod payments_repo;
pub mod quotes_repo;

pub use audit_repo::{AuditRepository, PgAuditRepository};
pub use catalog_repo::{CatalogRepository, PgCatalogRepository};
pub use crm_repo::{CrmRepository, PgCrmRepository};
pub use memory::MemoryStore;
pub use orders_repo::{OrderRepository, PgOrderRepository};
pub use payments_repo::{PaymentRepository, PgPaymentRepository};
pub use quotes_repo::{PgQuoteRepository, QuoteRepository};

/// Conjunto de repositórios injetado nos serviços.
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub crm: Arc<dyn CrmRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            payments: Arc::new(PgPaymentRepository::new(pool.clone())),
            crm: Arc::new(PgCrmRepository::new(pool.clone())),
            catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
            quotes: Arc::new(PgQuoteRepository::new(pool.clone())),
            audit: Arc::new(PgAuditRepository::new(pool)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            orders: store.clone(),
            payments: store.clone(),
            crm: store.clone(),
            catalog: store.clone(),
            quotes: store.clone(),
            audit: store,
        }
    }
}
