// src/services.rs

use std::sync::Arc;

use chrono::Duration;

use crate::db::Repositories;

pub mod audit_service;
pub mod auth;
pub mod conflict_service;
pub mod crm_service;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod quote_service;
pub mod reminder_service;
pub mod schedule_service;

#[cfg(test)]
pub(crate) mod test_support;

use audit_service::AuditService;
use conflict_service::ConflictService;
use crm_service::CrmService;
use notification_service::{NotificationService, Notifier};
use order_service::OrderService;
use payment_service::PaymentService;
use quote_service::QuoteService;
use reminder_service::ReminderService;
use schedule_service::ScheduleService;

/// Grafo de serviços montado sobre um conjunto de repositórios.
#[derive(Clone)]
pub struct Services {
    pub audit: AuditService,
    pub notifications: NotificationService,
    pub conflicts: ConflictService,
    pub orders: OrderService,
    pub schedule: ScheduleService,
    pub payments: PaymentService,
    pub crm: CrmService,
    pub quotes: QuoteService,
    pub reminders: ReminderService,
}

impl Services {
    pub fn build(repos: &Repositories, notifier: Arc<dyn Notifier>, reminder_window: Duration) -> Self {
        let audit = AuditService::new(repos.audit.clone());
        let notifications = NotificationService::new(notifier);
        let conflicts = ConflictService::new(repos.orders.clone());
        let orders = OrderService::new(
            repos.orders.clone(),
            repos.payments.clone(),
            repos.catalog.clone(),
            audit.clone(),
            notifications.clone(),
        );
        let schedule = ScheduleService::new(orders.clone(), conflicts.clone());
        let payments = PaymentService::new(repos.payments.clone(), repos.orders.clone());
        let crm = CrmService::new(repos.crm.clone(), repos.catalog.clone(), audit.clone());
        let quotes = QuoteService::new(repos.quotes.clone(), repos.catalog.clone(), orders.clone(), audit.clone());
        let reminders = ReminderService::new(repos.orders.clone(), notifications.clone(), reminder_window);

        Self { audit, notifications, conflicts, orders, schedule, payments, crm, quotes, reminders }
    }
}
