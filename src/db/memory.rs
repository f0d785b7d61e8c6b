// src/db/memory.rs

//! Backend em memória (DATA_BACKEND=memory), usado em desenvolvimento e nos
//! testes. Um único RwLock protege todas as coleções, então o lote do
//! kanban é atômico de graça. Sem persistência.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        AuditRepository, CatalogRepository, CrmRepository, OrderRepository, PaymentRepository,
        QuoteRepository,
    },
    models::{
        audit::AuditLog,
        catalog::CatalogService,
        crm::{Customer, Vehicle},
        orders::{OrderFilter, ScheduleWindow, ScheduledSlot, ServiceOrder},
        payments::Payment,
        quotes::{PublicQuote, Quote},
    },
};

#[derive(Debug, Default)]
struct MemoryData {
    orders: HashMap<Uuid, ServiceOrder>,
    payments: HashMap<Uuid, Payment>,
    customers: HashMap<Uuid, Customer>,
    vehicles: HashMap<Uuid, Vehicle>,
    services: HashMap<Uuid, CatalogService>,
    quotes: HashMap<Uuid, Quote>,
    public_quotes: HashMap<String, PublicQuote>,
    audit: Vec<AuditLog>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
    fail_writes: AtomicBool,
}

fn poison_err<T>(_: PoisonError<T>) -> AppError {
    AppError::StoreUnavailable("lock envenenado".into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faz toda escrita seguinte falhar com `StoreUnavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryData>, AppError> {
        self.data.read().map_err(poison_err)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryData>, AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("escrita recusada pelo armazenamento".into()));
        }
        self.data.write().map_err(poison_err)
    }
}

fn sort_for_board(orders: &mut [ServiceOrder]) {
    orders.sort_by(|a, b| {
        (a.status, a.kanban_order, a.created_at).cmp(&(b.status, b.kanban_order, b.created_at))
    });
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<ServiceOrder>, AppError> {
        let data = self.read()?;
        Ok(data.orders.get(&id).filter(|o| o.unit_id == unit_id).cloned())
    }

    async fn list(&self, unit_id: Uuid, filter: &OrderFilter) -> Result<Vec<ServiceOrder>, AppError> {
        let data = self.read()?;
        let mut orders: Vec<ServiceOrder> = data
            .orders
            .values()
            .filter(|o| o.unit_id == unit_id && filter.matches(o))
            .cloned()
            .collect();
        sort_for_board(&mut orders);
        Ok(orders)
    }

    async fn list_overlapping(&self, unit_id: Uuid, window: ScheduleWindow) -> Result<Vec<ServiceOrder>, AppError> {
        let data = self.read()?;
        let mut orders: Vec<ServiceOrder> = data
            .orders
            .values()
            .filter(|o| o.unit_id == unit_id)
            .filter(|o| o.window().is_some_and(|w| w.overlaps(&window)))
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.scheduled_start, o.created_at));
        Ok(orders)
    }

    async fn schedule_candidates(
        &self,
        unit_id: Uuid,
        customer_id: Option<Uuid>,
        vehicle_id: Option<Uuid>,
        before: DateTime<Utc>,
    ) -> Result<Vec<ScheduledSlot>, AppError> {
        let data = self.read()?;
        let slots = data
            .orders
            .values()
            .filter(|o| o.unit_id == unit_id)
            .filter(|o| o.status != crate::models::orders::OrderStatus::Cancelado)
            .filter(|o| customer_id.is_none_or(|c| o.customer_id == c))
            .filter(|o| vehicle_id.is_none_or(|v| o.vehicle_id == v))
            .filter_map(|o| {
                let start = o.scheduled_start?;
                (start < before).then_some(ScheduledSlot {
                    id: o.id,
                    scheduled_start: start,
                    scheduled_end: o.scheduled_end,
                })
            })
            .collect();
        Ok(slots)
    }

    async fn insert(&self, order: &ServiceOrder) -> Result<(), AppError> {
        let mut data = self.write()?;
        data.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update(&self, order: &ServiceOrder, expected_version: i32) -> Result<bool, AppError> {
        let mut data = self.write()?;
        match data.orders.get_mut(&order.id) {
            Some(current) if current.unit_id == order.unit_id && current.version == expected_version => {
                *current = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_batch(&self, writes: &[(ServiceOrder, i32)]) -> Result<bool, AppError> {
        let mut data = self.write()?;

        // Valida tudo antes de gravar qualquer coisa.
        let all_current = writes.iter().all(|(order, expected)| {
            data.orders
                .get(&order.id)
                .is_some_and(|c| c.unit_id == order.unit_id && c.version == *expected)
        });
        if !all_current {
            return Ok(false);
        }

        for (order, _) in writes {
            data.orders.insert(order.id, order.clone());
        }
        Ok(true)
    }

    async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.write()?;
        let paid = data.payments.values().any(|p| p.unit_id == unit_id && p.order_id == id);
        if !paid && data.orders.get(&id).is_some_and(|o| o.unit_id == unit_id) {
            data.orders.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ServiceOrder>, AppError> {
        let data = self.read()?;
        let mut orders: Vec<ServiceOrder> = data
            .orders
            .values()
            .filter(|o| !o.notified_24h && !o.status.is_terminal())
            .filter(|o| o.scheduled_start.is_some_and(|s| s >= from && s <= to))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.scheduled_start);
        Ok(orders)
    }

    async fn claim_reminder(&self, id: Uuid, scheduled_start: DateTime<Utc>) -> Result<bool, AppError> {
        let mut data = self.write()?;
        match data.orders.get_mut(&id) {
            Some(o) if !o.notified_24h && o.scheduled_start == Some(scheduled_start) => {
                o.notified_24h = true;
                o.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn list_for_order(&self, unit_id: Uuid, order_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let data = self.read()?;
        let mut payments: Vec<Payment> = data
            .payments
            .values()
            .filter(|p| p.unit_id == unit_id && p.order_id == order_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.paid_at, p.created_at));
        Ok(payments)
    }

    async fn count_for_order(&self, unit_id: Uuid, order_id: Uuid) -> Result<i64, AppError> {
        let data = self.read()?;
        let count = data
            .payments
            .values()
            .filter(|p| p.unit_id == unit_id && p.order_id == order_id)
            .count();
        Ok(count as i64)
    }

    async fn insert(&self, payment: &Payment) -> Result<bool, AppError> {
        let mut data = self.write()?;
        let order_exists = data
            .orders
            .get(&payment.order_id)
            .is_some_and(|o| o.unit_id == payment.unit_id);
        if order_exists {
            data.payments.insert(payment.id, payment.clone());
        }
        Ok(order_exists)
    }

    async fn delete(&self, unit_id: Uuid, order_id: Uuid, payment_id: Uuid) -> Result<bool, AppError> {
        let mut data = self.write()?;
        let owned = data
            .payments
            .get(&payment_id)
            .is_some_and(|p| p.unit_id == unit_id && p.order_id == order_id);
        if owned {
            data.payments.remove(&payment_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl CrmRepository for MemoryStore {
    async fn list_customers(&self, unit_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let data = self.read()?;
        let mut customers: Vec<Customer> =
            data.customers.values().filter(|c| c.unit_id == unit_id).cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn get_customer(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError> {
        let data = self.read()?;
        Ok(data.customers.get(&id).filter(|c| c.unit_id == unit_id).cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), AppError> {
        let mut data = self.write()?;
        data.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<bool, AppError> {
        let mut data = self.write()?;
        match data.customers.get_mut(&customer.id) {
            Some(current) if current.unit_id == customer.unit_id => {
                *current = customer.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_customer(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.write()?;
        if data.customers.get(&id).is_some_and(|c| c.unit_id == unit_id) {
            data.customers.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn list_vehicles(&self, unit_id: Uuid, customer_id: Uuid) -> Result<Vec<Vehicle>, AppError> {
        let data = self.read()?;
        let mut vehicles: Vec<Vehicle> = data
            .vehicles
            .values()
            .filter(|v| v.unit_id == unit_id && v.customer_id == customer_id)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.plate.cmp(&b.plate));
        Ok(vehicles)
    }

    async fn count_vehicles(&self, unit_id: Uuid, customer_id: Uuid) -> Result<i64, AppError> {
        let data = self.read()?;
        let count = data
            .vehicles
            .values()
            .filter(|v| v.unit_id == unit_id && v.customer_id == customer_id)
            .count();
        Ok(count as i64)
    }

    async fn get_vehicle(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Vehicle>, AppError> {
        let data = self.read()?;
        Ok(data.vehicles.get(&id).filter(|v| v.unit_id == unit_id).cloned())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), AppError> {
        let mut data = self.write()?;
        data.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    async fn delete_vehicle(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.write()?;
        if data.vehicles.get(&id).is_some_and(|v| v.unit_id == unit_id) {
            data.vehicles.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn list(&self, unit_id: Uuid) -> Result<Vec<CatalogService>, AppError> {
        let data = self.read()?;
        let mut services: Vec<CatalogService> =
            data.services.values().filter(|s| s.unit_id == unit_id).cloned().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<CatalogService>, AppError> {
        let data = self.read()?;
        Ok(data.services.get(&id).filter(|s| s.unit_id == unit_id).cloned())
    }

    async fn insert(&self, service: &CatalogService) -> Result<(), AppError> {
        let mut data = self.write()?;
        data.services.insert(service.id, service.clone());
        Ok(())
    }

    async fn update(&self, service: &CatalogService) -> Result<bool, AppError> {
        let mut data = self.write()?;
        match data.services.get_mut(&service.id) {
            Some(current) if current.unit_id == service.unit_id => {
                *current = service.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.write()?;
        if data.services.get(&id).is_some_and(|s| s.unit_id == unit_id) {
            data.services.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl QuoteRepository for MemoryStore {
    async fn list(&self, unit_id: Uuid) -> Result<Vec<Quote>, AppError> {
        let data = self.read()?;
        let mut quotes: Vec<Quote> =
            data.quotes.values().filter(|q| q.unit_id == unit_id).cloned().collect();
        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quotes)
    }

    async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<Quote>, AppError> {
        let data = self.read()?;
        Ok(data.quotes.get(&id).filter(|q| q.unit_id == unit_id).cloned())
    }

    async fn insert(&self, quote: &Quote) -> Result<(), AppError> {
        let mut data = self.write()?;
        data.quotes.insert(quote.id, quote.clone());
        Ok(())
    }

    async fn update(&self, quote: &Quote) -> Result<bool, AppError> {
        let mut data = self.write()?;
        match data.quotes.get_mut(&quote.id) {
            Some(current) if current.unit_id == quote.unit_id => {
                *current = quote.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.write()?;
        if data.quotes.get(&id).is_some_and(|q| q.unit_id == unit_id) {
            data.quotes.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn insert_public(&self, public: &PublicQuote) -> Result<(), AppError> {
        let mut data = self.write()?;
        data.public_quotes.insert(public.token.clone(), public.clone());
        Ok(())
    }

    async fn find_public(&self, token: &str) -> Result<Option<PublicQuote>, AppError> {
        let data = self.read()?;
        Ok(data.public_quotes.get(token).cloned())
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn insert(&self, entry: &AuditLog) -> Result<(), AppError> {
        let mut data = self.write()?;
        data.audit.push(entry.clone());
        Ok(())
    }

    async fn list_for_doc(
        &self,
        unit_id: Uuid,
        collection: &str,
        doc_id: &str,
    ) -> Result<Vec<AuditLog>, AppError> {
        let data = self.read()?;
        Ok(data
            .audit
            .iter()
            .filter(|e| e.unit_id == Some(unit_id) && e.collection == collection && e.doc_id == doc_id)
            .cloned()
            .collect())
    }
}
