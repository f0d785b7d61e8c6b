// src/services/order_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, OrderRepository, PaymentRepository},
    models::{
        auth::RequestContext,
        orders::{
            CreateOrderPayload, KanbanUpdate, NewOrder, OrderFilter, OrderPatch,
            OrderStatus, ScheduleWindow, ServiceOrder,
        },
    },
    services::{
        audit_service::AuditService, crm_service::snapshot_items,
        notification_service::NotificationService,
    },
};

const COLLECTION: &str = "orders";

/// Aplica a máquina de estados na cópia em memória.
/// Retorna `false` quando não há nada para gravar (reentrada no mesmo estado).
fn apply_transition(order: &mut ServiceOrder, to: OrderStatus, now: DateTime<Utc>) -> Result<bool, AppError> {
    if order.status == to {
        // Reentrada em concluido só completa um closed_at ausente.
        if to == OrderStatus::Concluido && order.closed_at.is_none() {
            order.closed_at = Some(now);
            return Ok(true);
        }
        return Ok(false);
    }

    if !order.status.can_transition_to(to) {
        return Err(AppError::InvalidTransition { from: order.status, to });
    }

    order.status = to;
    if to == OrderStatus::Concluido && order.closed_at.is_none() {
        order.closed_at = Some(now);
    }
    Ok(true)
}

fn validate_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<Option<ScheduleWindow>, AppError> {
    match (start, end) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(AppError::InvalidInput("invalid_schedule_window")),
        (Some(start), end) => {
            let window = ScheduleWindow::new(start, end);
            if !window.is_valid() {
                return Err(AppError::InvalidInput("invalid_schedule_window"));
            }
            Ok(Some(window))
        }
    }
}

fn validate_discount(discount: Decimal) -> Result<(), AppError> {
    if discount < Decimal::ZERO {
        return Err(AppError::InvalidInput("negative_discount"));
    }
    Ok(())
}

/// Gerenciador do ciclo de vida da OS.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    catalog: Arc<dyn CatalogRepository>,
    audit: AuditService,
    notifications: NotificationService,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        catalog: Arc<dyn CatalogRepository>,
        audit: AuditService,
        notifications: NotificationService,
    ) -> Self {
        Self { orders, payments, catalog, audit, notifications }
    }

    // --- LEITURA ---

    pub async fn get_order(&self, ctx: &RequestContext, id: Uuid) -> Result<ServiceOrder, AppError> {
        self.orders
            .get(ctx.unit_id, id)
            .await?
            .ok_or(AppError::NotFound("order_not_found"))
    }

    pub async fn list_orders(&self, ctx: &RequestContext, filter: &OrderFilter) -> Result<Vec<ServiceOrder>, AppError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::InvalidInput("invalid_range"));
            }
        }
        self.orders.list(ctx.unit_id, filter).await
    }

    /// Calendário: tudo que estiver agendado cruzando a janela visível.
    pub async fn calendar(&self, ctx: &RequestContext, window: ScheduleWindow) -> Result<Vec<ServiceOrder>, AppError> {
        self.orders.list_overlapping(ctx.unit_id, window).await
    }

    /// Lista do técnico: OS atribuídas a quem está chamando.
    pub async fn list_assigned_to_me(&self, ctx: &RequestContext) -> Result<Vec<ServiceOrder>, AppError> {
        let filter = OrderFilter {
            assigned_to: Some(ctx.user_id().to_string()),
            ..Default::default()
        };
        self.orders.list(ctx.unit_id, &filter).await
    }

    // --- CRIAÇÃO ---

    /// Resolve o payload da API em uma OS pronta para gravar
    /// (itens congelados a partir do catálogo).
    pub async fn prepare_new_order(&self, ctx: &RequestContext, payload: CreateOrderPayload) -> Result<NewOrder, AppError> {
        payload.validate()?;

        let customer_id = payload.customer_id.ok_or(AppError::InvalidInput("customer_required"))?;
        let vehicle_id = payload.vehicle_id.ok_or(AppError::InvalidInput("vehicle_required"))?;
        if payload.service_ids.is_empty() {
            return Err(AppError::InvalidInput("order_items_required"));
        }
        validate_discount(payload.discount)?;
        let window = validate_window(payload.scheduled_start, payload.scheduled_end)?;

        let items = snapshot_items(self.catalog.as_ref(), ctx.unit_id, &payload.service_ids, &[]).await?;

        Ok(NewOrder {
            customer_id,
            vehicle_id,
            items,
            discount: payload.discount,
            window,
            notes: payload.notes,
            assigned_to: payload.assigned_to,
        })
    }

    /// Cria a OS em `novo`. Não verifica conflitos: isso é papel do calendário.
    pub async fn create_order(&self, ctx: &RequestContext, new_order: NewOrder) -> Result<ServiceOrder, AppError> {
        if new_order.items.is_empty() {
            return Err(AppError::InvalidInput("order_items_required"));
        }
        validate_discount(new_order.discount)?;
        if new_order.window.is_some_and(|w| !w.is_valid()) {
            return Err(AppError::InvalidInput("invalid_schedule_window"));
        }

        // Entra no fim da coluna "novo" do kanban.
        let column = OrderFilter { status: Some(OrderStatus::Novo), ..Default::default() };
        let kanban_order = self
            .orders
            .list(ctx.unit_id, &column)
            .await?
            .iter()
            .map(|o| o.kanban_order + 1)
            .max()
            .unwrap_or(0);

        let now = Utc::now();
        let mut order = ServiceOrder {
            id: Uuid::new_v4(),
            unit_id: ctx.unit_id,
            customer_id: new_order.customer_id,
            vehicle_id: new_order.vehicle_id,
            items: new_order.items,
            discount: new_order.discount,
            total: Decimal::ZERO,
            status: OrderStatus::Novo,
            assigned_to: new_order.assigned_to,
            scheduled_start: new_order.window.map(|w| w.start),
            scheduled_end: new_order.window.and_then(|w| w.end),
            notes: new_order.notes,
            kanban_order,
            notified_24h: false,
            version: 1,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        order.recompute_total();

        self.orders.insert(&order).await?;
        tracing::info!("🧾 OS {} criada na unidade {}", order.id, ctx.unit_id);

        self.audit.record_change(ctx, COLLECTION, order.id, None, Some(&order)).await;
        Ok(order)
    }

    // --- ATUALIZAÇÃO ---

    /// Mescla o patch sobre a versão atual sem gravar nada.
    pub async fn merge_patch(
        &self,
        ctx: &RequestContext,
        current: &ServiceOrder,
        patch: &OrderPatch,
    ) -> Result<ServiceOrder, AppError> {
        patch.validate()?;

        if patch.expected_version.is_some_and(|v| v != current.version) {
            return Err(AppError::ConcurrentModification);
        }
        if patch.touches_schedule() && current.status.is_terminal() {
            return Err(AppError::OrderClosed);
        }

        let mut merged = current.clone();

        if let Some(customer_id) = patch.customer_id {
            merged.customer_id = customer_id;
        }
        if let Some(vehicle_id) = patch.vehicle_id {
            merged.vehicle_id = vehicle_id;
        }
        if let Some(service_ids) = &patch.service_ids {
            if service_ids.is_empty() {
                return Err(AppError::InvalidInput("order_items_required"));
            }
            merged.items = snapshot_items(self.catalog.as_ref(), ctx.unit_id, service_ids, &current.items).await?;
        }
        if let Some(discount) = patch.discount {
            validate_discount(discount)?;
            merged.discount = discount;
        }
        if let Some(notes) = &patch.notes {
            merged.notes = notes.clone();
        }
        if let Some(assigned_to) = &patch.assigned_to {
            merged.assigned_to = assigned_to.clone();
        }
        if let Some(start) = patch.scheduled_start {
            merged.scheduled_start = start;
            // Sem início não existe fim.
            if start.is_none() && patch.scheduled_end.is_none() {
                merged.scheduled_end = None;
            }
        }
        if let Some(end) = patch.scheduled_end {
            merged.scheduled_end = end;
        }

        validate_window(merged.scheduled_start, merged.scheduled_end)?;

        if merged.scheduled_start != current.scheduled_start {
            merged.notified_24h = false;
        }
        merged.recompute_total();
        Ok(merged)
    }

    /// Grava a versão mesclada se ninguém escreveu antes (trava otimista).
    pub async fn commit_update(
        &self,
        ctx: &RequestContext,
        current: &ServiceOrder,
        mut next: ServiceOrder,
    ) -> Result<ServiceOrder, AppError> {
        next.version = current.version + 1;
        next.updated_at = Utc::now();
        next.recompute_total();

        if !self.orders.update(&next, current.version).await? {
            return Err(AppError::ConcurrentModification);
        }

        self.audit.record_change(ctx, COLLECTION, next.id, Some(current), Some(&next)).await;
        self.notifications.order_status_changed(current.status, &next).await;
        Ok(next)
    }

    pub async fn update_order(&self, ctx: &RequestContext, id: Uuid, patch: &OrderPatch) -> Result<ServiceOrder, AppError> {
        let current = self.get_order(ctx, id).await?;
        let merged = self.merge_patch(ctx, &current, patch).await?;
        self.commit_update(ctx, &current, merged).await
    }

    // --- STATUS ---

    pub async fn set_status(&self, ctx: &RequestContext, id: Uuid, status: OrderStatus) -> Result<ServiceOrder, AppError> {
        let current = self.get_order(ctx, id).await?;
        let mut next = current.clone();

        if !apply_transition(&mut next, status, Utc::now())? {
            return Ok(current);
        }

        let saved = self.commit_update(ctx, &current, next).await?;
        tracing::info!("🔁 OS {}: {} -> {}", saved.id, current.status, saved.status);
        Ok(saved)
    }

    /// Botão "Avançar": novo -> em_andamento -> concluido. Estados finais ficam parados.
    pub async fn advance(&self, ctx: &RequestContext, id: Uuid) -> Result<ServiceOrder, AppError> {
        let current = self.get_order(ctx, id).await?;
        let next = current.status.next_in_flow();
        if next == current.status {
            return Ok(current);
        }
        self.set_status(ctx, id, next).await
    }

    pub async fn assign(&self, ctx: &RequestContext, id: Uuid, user_id: Option<String>) -> Result<ServiceOrder, AppError> {
        let current = self.get_order(ctx, id).await?;
        let mut next = current.clone();
        next.assigned_to = user_id;
        self.commit_update(ctx, &current, next).await
    }

    /// Arrastar cartões no kanban. Todas as transições são validadas antes
    /// de qualquer escrita e o lote é gravado de uma vez.
    pub async fn reorder_within_status(
        &self,
        ctx: &RequestContext,
        updates: &[KanbanUpdate],
    ) -> Result<Vec<ServiceOrder>, AppError> {
        let now = Utc::now();
        // (original, cópia de trabalho) por OS, na ordem em que apareceram.
        let mut touched: Vec<(ServiceOrder, ServiceOrder)> = Vec::new();

        for update in updates {
            let position = match touched.iter().position(|(o, _)| o.id == update.id) {
                Some(position) => position,
                None => {
                    let current = self.get_order(ctx, update.id).await?;
                    touched.push((current.clone(), current));
                    touched.len() - 1
                }
            };

            let (_, working) = &mut touched[position];
            apply_transition(working, update.status, now)?;
            working.kanban_order = update.kanban_order;
        }

        let writes: Vec<(ServiceOrder, i32)> = touched
            .iter()
            .map(|(current, working)| {
                let mut next = working.clone();
                next.version = current.version + 1;
                next.updated_at = now;
                (next, current.version)
            })
            .collect();

        if !self.orders.update_batch(&writes).await? {
            return Err(AppError::ConcurrentModification);
        }

        let mut saved = Vec::with_capacity(writes.len());
        for ((current, _), (next, _)) in touched.iter().zip(writes) {
            self.audit.record_change(ctx, COLLECTION, next.id, Some(current), Some(&next)).await;
            self.notifications.order_status_changed(current.status, &next).await;
            saved.push(next);
        }
        Ok(saved)
    }

    // --- EXCLUSÃO ---

    pub async fn delete_order(&self, ctx: &RequestContext, id: Uuid, confirm: bool) -> Result<ServiceOrder, AppError> {
        let current = self.get_order(ctx, id).await?;

        if self.payments.count_for_order(ctx.unit_id, id).await? > 0 {
            return Err(AppError::OrderHasPayments);
        }
        if current.status.is_terminal() && !confirm {
            return Err(AppError::ConfirmationRequired);
        }

        if !self.orders.delete(ctx.unit_id, id).await? {
            // Um pagamento pode ter chegado depois da checagem acima.
            if self.payments.count_for_order(ctx.unit_id, id).await? > 0 {
                return Err(AppError::OrderHasPayments);
            }
            return Err(AppError::NotFound("order_not_found"));
        }
        tracing::info!("🗑️ OS {} excluída", id);

        self.audit.record_change(ctx, COLLECTION, id, Some(&current), None).await;
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::payments::{AddPaymentPayload, Payment, PaymentMethod};
    use crate::services::test_support::{at, Harness};

    fn payment_for(order: &ServiceOrder) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            unit_id: order.unit_id,
            order_id: order.id,
            amount: Decimal::from(10),
            method: PaymentMethod::Dinheiro,
            paid_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    /// Outra escrita mexe em `victim` entre a leitura e a gravação do lote.
    struct BumpBeforeBatch {
        store: Arc<MemoryStore>,
        victim: Uuid,
    }

    #[async_trait]
    impl OrderRepository for BumpBeforeBatch {
        async fn get(&self, unit_id: Uuid, id: Uuid) -> Result<Option<ServiceOrder>, AppError> {
            OrderRepository::get(self.store.as_ref(), unit_id, id).await
        }
        async fn list(&self, unit_id: Uuid, filter: &OrderFilter) -> Result<Vec<ServiceOrder>, AppError> {
            OrderRepository::list(self.store.as_ref(), unit_id, filter).await
        }
        async fn list_overlapping(&self, unit_id: Uuid, window: ScheduleWindow) -> Result<Vec<ServiceOrder>, AppError> {
            self.store.list_overlapping(unit_id, window).await
        }
        async fn schedule_candidates(
            &self,
            unit_id: Uuid,
            customer_id: Option<Uuid>,
            vehicle_id: Option<Uuid>,
            before: DateTime<Utc>,
        ) -> Result<Vec<crate::models::orders::ScheduledSlot>, AppError> {
            self.store.schedule_candidates(unit_id, customer_id, vehicle_id, before).await
        }
        async fn insert(&self, order: &ServiceOrder) -> Result<(), AppError> {
            OrderRepository::insert(self.store.as_ref(), order).await
        }
        async fn update(&self, order: &ServiceOrder, expected_version: i32) -> Result<bool, AppError> {
            OrderRepository::update(self.store.as_ref(), order, expected_version).await
        }
        async fn update_batch(&self, writes: &[(ServiceOrder, i32)]) -> Result<bool, AppError> {
            if let Some(current) = OrderRepository::get(self.store.as_ref(), writes[0].0.unit_id, self.victim).await? {
                let mut bumped = current.clone();
                bumped.notes = "editada em outra aba".into();
                bumped.version = current.version + 1;
                assert!(OrderRepository::update(self.store.as_ref(), &bumped, current.version).await?);
            }
            self.store.update_batch(writes).await
        }
        async fn delete(&self, unit_id: Uuid, id: Uuid) -> Result<bool, AppError> {
            OrderRepository::delete(self.store.as_ref(), unit_id, id).await
        }
        async fn due_for_reminder(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<ServiceOrder>, AppError> {
            self.store.due_for_reminder(from, to).await
        }
        async fn claim_reminder(&self, id: Uuid, scheduled_start: DateTime<Utc>) -> Result<bool, AppError> {
            self.store.claim_reminder(id, scheduled_start).await
        }
    }

    /// Um pagamento chega logo depois da contagem feita pelo serviço.
    struct PaymentAfterCount {
        store: Arc<MemoryStore>,
        landed: AtomicBool,
    }

    #[async_trait]
    impl PaymentRepository for PaymentAfterCount {
        async fn list_for_order(&self, unit_id: Uuid, order_id: Uuid) -> Result<Vec<Payment>, AppError> {
            self.store.list_for_order(unit_id, order_id).await
        }
        async fn count_for_order(&self, unit_id: Uuid, order_id: Uuid) -> Result<i64, AppError> {
            if !self.landed.swap(true, Ordering::SeqCst) {
                let order = OrderRepository::get(self.store.as_ref(), unit_id, order_id).await?;
                if let Some(order) = order {
                    PaymentRepository::insert(self.store.as_ref(), &payment_for(&order)).await?;
                }
                return Ok(0);
            }
            self.store.count_for_order(unit_id, order_id).await
        }
        async fn insert(&self, payment: &Payment) -> Result<bool, AppError> {
            PaymentRepository::insert(self.store.as_ref(), payment).await
        }
        async fn delete(&self, unit_id: Uuid, order_id: Uuid, payment_id: Uuid) -> Result<bool, AppError> {
            PaymentRepository::delete(self.store.as_ref(), unit_id, order_id, payment_id).await
        }
    }

    fn orders_with(h: &Harness, orders: Arc<dyn OrderRepository>, payments: Arc<dyn PaymentRepository>) -> OrderService {
        OrderService::new(
            orders,
            payments,
            h.repos.catalog.clone(),
            h.services.audit.clone(),
            h.services.notifications.clone(),
        )
    }

    #[tokio::test]
    async fn create_computes_total_and_clamps_discount() {
        let h = Harness::new().await;
        let a = h.catalog_service("Troca de óleo", 100).await;
        let b = h.catalog_service("Filtro", 50).await;

        let payload = CreateOrderPayload {
            customer_id: Some(Uuid::new_v4()),
            vehicle_id: Some(Uuid::new_v4()),
            service_ids: vec![a.id, b.id],
            discount: Decimal::from(30),
            scheduled_start: None,
            scheduled_end: None,
            notes: String::new(),
            assigned_to: None,
        };
        let new_order = h.services.orders.prepare_new_order(&h.ctx, payload.clone()).await.unwrap();
        let order = h.services.orders.create_order(&h.ctx, new_order).await.unwrap();
        assert_eq!(order.total, Decimal::from(120));
        assert_eq!(order.status, OrderStatus::Novo);

        let big_discount = CreateOrderPayload { discount: Decimal::from(200), ..payload };
        let new_order = h.services.orders.prepare_new_order(&h.ctx, big_discount).await.unwrap();
        let order = h.services.orders.create_order(&h.ctx, new_order).await.unwrap();
        assert_eq!(order.total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn create_rejects_missing_pieces() {
        let h = Harness::new().await;
        let a = h.catalog_service("Alinhamento", 80).await;
        let base = CreateOrderPayload {
            customer_id: Some(Uuid::new_v4()),
            vehicle_id: Some(Uuid::new_v4()),
            service_ids: vec![a.id],
            discount: Decimal::ZERO,
            scheduled_start: None,
            scheduled_end: None,
            notes: String::new(),
            assigned_to: None,
        };

        let cases = [
            (CreateOrderPayload { customer_id: None, ..base.clone() }, "customer_required"),
            (CreateOrderPayload { vehicle_id: None, ..base.clone() }, "vehicle_required"),
            (CreateOrderPayload { service_ids: vec![], ..base.clone() }, "order_items_required"),
            (CreateOrderPayload { discount: Decimal::from(-1), ..base.clone() }, "negative_discount"),
            (
                CreateOrderPayload { scheduled_end: Some(at(10, 0)), ..base.clone() },
                "invalid_schedule_window",
            ),
            (
                CreateOrderPayload {
                    scheduled_start: Some(at(10, 0)),
                    scheduled_end: Some(at(10, 0)),
                    ..base.clone()
                },
                "invalid_schedule_window",
            ),
        ];

        for (payload, key) in cases {
            let err = h.services.orders.prepare_new_order(&h.ctx, payload).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(k) if k == key), "{key}: {err:?}");
        }

        let unknown = CreateOrderPayload { service_ids: vec![Uuid::new_v4()], ..base };
        let err = h.services.orders.prepare_new_order(&h.ctx, unknown).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("service_not_found")));
    }

    #[tokio::test]
    async fn line_items_keep_captured_price_after_catalog_change() {
        let h = Harness::new().await;
        let service = h.catalog_service("Balanceamento", 60).await;
        let extra = h.catalog_service("Geometria", 40).await;
        let order = h.order_with(&[service.id]).await;

        h.set_catalog_price(&service, 90).await;

        let patch = OrderPatch { service_ids: Some(vec![service.id, extra.id]), ..Default::default() };
        let updated = h.services.orders.update_order(&h.ctx, order.id, &patch).await.unwrap();

        assert_eq!(updated.items[0].price, Decimal::from(60));
        assert_eq!(updated.items[1].price, Decimal::from(40));
        assert_eq!(updated.total, Decimal::from(100));
    }

    #[tokio::test]
    async fn recomputing_total_is_idempotent() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;

        let same = h.services.orders.update_order(&h.ctx, order.id, &OrderPatch::default()).await.unwrap();
        let again = h.services.orders.update_order(&h.ctx, order.id, &OrderPatch::default()).await.unwrap();
        assert_eq!(same.total, order.total);
        assert_eq!(again.total, order.total);
        assert_eq!(again.version, order.version + 2);
    }

    #[tokio::test]
    async fn terminal_states_reject_every_transition() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        let orders = &h.services.orders;

        let err = orders.set_status(&h.ctx, order.id, OrderStatus::Concluido).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        orders.set_status(&h.ctx, order.id, OrderStatus::EmAndamento).await.unwrap();
        orders.set_status(&h.ctx, order.id, OrderStatus::Concluido).await.unwrap();

        for target in [OrderStatus::Novo, OrderStatus::EmAndamento, OrderStatus::Cancelado] {
            let err = orders.set_status(&h.ctx, order.id, target).await.unwrap_err();
            assert!(matches!(
                err,
                AppError::InvalidTransition { from: OrderStatus::Concluido, .. }
            ));
        }
    }

    #[tokio::test]
    async fn closed_at_is_set_once() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        let orders = &h.services.orders;

        orders.set_status(&h.ctx, order.id, OrderStatus::EmAndamento).await.unwrap();
        let done = orders.set_status(&h.ctx, order.id, OrderStatus::Concluido).await.unwrap();
        let closed_at = done.closed_at.expect("closed_at");

        let again = orders.set_status(&h.ctx, order.id, OrderStatus::Concluido).await.unwrap();
        assert_eq!(again.closed_at, Some(closed_at));
        assert_eq!(again.version, done.version);
    }

    #[tokio::test]
    async fn advance_walks_the_happy_path_and_stops() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        let orders = &h.services.orders;

        let step = orders.advance(&h.ctx, order.id).await.unwrap();
        assert_eq!(step.status, OrderStatus::EmAndamento);
        let step = orders.advance(&h.ctx, order.id).await.unwrap();
        assert_eq!(step.status, OrderStatus::Concluido);
        let step = orders.advance(&h.ctx, order.id).await.unwrap();
        assert_eq!(step.status, OrderStatus::Concluido);
    }

    #[tokio::test]
    async fn status_hook_notifies_on_progress() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        h.services.orders.assign(&h.ctx, order.id, Some("tec-7".into())).await.unwrap();

        h.services.orders.set_status(&h.ctx, order.id, OrderStatus::EmAndamento).await.unwrap();

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "OS em_andamento");
    }

    #[tokio::test]
    async fn kanban_batch_is_all_or_nothing() {
        let h = Harness::new().await;
        let a = h.scheduled_order(at(9, 0), None).await;
        let b = h.scheduled_order(at(10, 0), None).await;
        h.services.orders.set_status(&h.ctx, b.id, OrderStatus::Cancelado).await.unwrap();

        let updates = [
            KanbanUpdate { id: a.id, status: OrderStatus::EmAndamento, kanban_order: 0 },
            KanbanUpdate { id: b.id, status: OrderStatus::Novo, kanban_order: 1 },
        ];
        let err = h.services.orders.reorder_within_status(&h.ctx, &updates).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let a_after = h.services.orders.get_order(&h.ctx, a.id).await.unwrap();
        assert_eq!(a_after.status, OrderStatus::Novo);
        assert_eq!(a_after.version, a.version);
    }

    #[tokio::test]
    async fn kanban_batch_with_a_stale_card_writes_nothing() {
        let h = Harness::new().await;
        let a = h.scheduled_order(at(9, 0), None).await;
        let b = h.scheduled_order(at(10, 0), None).await;
        let orders = orders_with(
            &h,
            Arc::new(BumpBeforeBatch { store: h.store.clone(), victim: b.id }),
            h.repos.payments.clone(),
        );

        let updates = [
            KanbanUpdate { id: a.id, status: OrderStatus::EmAndamento, kanban_order: 5 },
            KanbanUpdate { id: b.id, status: OrderStatus::EmAndamento, kanban_order: 6 },
        ];
        let err = orders.reorder_within_status(&h.ctx, &updates).await.unwrap_err();
        assert!(matches!(err, AppError::ConcurrentModification));

        let a_after = h.services.orders.get_order(&h.ctx, a.id).await.unwrap();
        assert_eq!((a_after.status, a_after.kanban_order, a_after.version), (a.status, a.kanban_order, a.version));

        let b_after = h.services.orders.get_order(&h.ctx, b.id).await.unwrap();
        assert_eq!((b_after.status, b_after.kanban_order), (b.status, b.kanban_order));
        assert_eq!(b_after.version, b.version + 1);
        assert_eq!(b_after.notes, "editada em outra aba");
    }

    #[tokio::test]
    async fn kanban_batch_writes_every_card() {
        let h = Harness::new().await;
        let a = h.scheduled_order(at(9, 0), None).await;
        let b = h.scheduled_order(at(10, 0), None).await;

        let updates = [
            KanbanUpdate { id: b.id, status: OrderStatus::Novo, kanban_order: 0 },
            KanbanUpdate { id: a.id, status: OrderStatus::EmAndamento, kanban_order: 0 },
        ];
        let saved = h.services.orders.reorder_within_status(&h.ctx, &updates).await.unwrap();
        assert_eq!(saved.len(), 2);

        let board = h.services.orders.list_orders(&h.ctx, &OrderFilter::default()).await.unwrap();
        assert_eq!(board[0].id, b.id);
        assert_eq!(board[1].id, a.id);
        assert_eq!(board[1].status, OrderStatus::EmAndamento);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;

        let patch = OrderPatch {
            notes: Some("primeiro".into()),
            expected_version: Some(order.version),
            ..Default::default()
        };
        h.services.orders.update_order(&h.ctx, order.id, &patch).await.unwrap();

        let stale = OrderPatch { notes: Some("segundo".into()), ..patch };
        let err = h.services.orders.update_order(&h.ctx, order.id, &stale).await.unwrap_err();
        assert!(matches!(err, AppError::ConcurrentModification));

        // Escrita concorrente detectada só no commit.
        let current = h.services.orders.get_order(&h.ctx, order.id).await.unwrap();
        let merged = h.services.orders.merge_patch(&h.ctx, &current, &OrderPatch::default()).await.unwrap();
        h.services.orders.assign(&h.ctx, order.id, Some("x".into())).await.unwrap();
        let err = h.services.orders.commit_update(&h.ctx, &current, merged).await.unwrap_err();
        assert!(matches!(err, AppError::ConcurrentModification));
    }

    #[tokio::test]
    async fn schedule_edits_on_closed_orders_are_refused() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        h.services.orders.set_status(&h.ctx, order.id, OrderStatus::Cancelado).await.unwrap();

        let patch = OrderPatch { scheduled_start: Some(Some(at(11, 0))), ..Default::default() };
        let err = h.services.orders.update_order(&h.ctx, order.id, &patch).await.unwrap_err();
        assert!(matches!(err, AppError::OrderClosed));
    }

    #[tokio::test]
    async fn moving_the_start_resets_the_reminder_flag() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        h.store_claim_reminder(&order).await;

        let patch = OrderPatch { scheduled_start: Some(Some(at(11, 0))), ..Default::default() };
        let moved = h.services.orders.update_order(&h.ctx, order.id, &patch).await.unwrap();
        assert!(!moved.notified_24h);
    }

    #[tokio::test]
    async fn delete_rules() {
        let h = Harness::new().await;
        let paid = h.scheduled_order(at(9, 0), None).await;
        h.services
            .payments
            .add_payment(
                &h.ctx,
                paid.id,
                AddPaymentPayload { amount: Decimal::from(10), method: PaymentMethod::Pix, paid_at: None },
            )
            .await
            .unwrap();
        let err = h.services.orders.delete_order(&h.ctx, paid.id, true).await.unwrap_err();
        assert!(matches!(err, AppError::OrderHasPayments));

        let closed = h.scheduled_order(at(10, 0), None).await;
        h.services.orders.set_status(&h.ctx, closed.id, OrderStatus::Cancelado).await.unwrap();
        let err = h.services.orders.delete_order(&h.ctx, closed.id, false).await.unwrap_err();
        assert!(matches!(err, AppError::ConfirmationRequired));
        h.services.orders.delete_order(&h.ctx, closed.id, true).await.unwrap();

        let err = h.services.orders.get_order(&h.ctx, closed.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("order_not_found")));
    }

    #[tokio::test]
    async fn payment_arriving_during_delete_keeps_the_order() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        let orders = orders_with(
            &h,
            h.repos.orders.clone(),
            Arc::new(PaymentAfterCount { store: h.store.clone(), landed: AtomicBool::new(false) }),
        );

        let err = orders.delete_order(&h.ctx, order.id, true).await.unwrap_err();
        assert!(matches!(err, AppError::OrderHasPayments));
        assert!(h.services.orders.get_order(&h.ctx, order.id).await.is_ok());
    }

    #[tokio::test]
    async fn store_refuses_payments_for_missing_orders() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        h.services.orders.delete_order(&h.ctx, order.id, true).await.unwrap();

        assert!(!h.repos.payments.insert(&payment_for(&order)).await.unwrap());
        assert_eq!(h.repos.payments.count_for_order(h.unit(), order.id).await.unwrap(), 0);

        let err = h
            .services
            .payments
            .add_payment(
                &h.ctx,
                order.id,
                AddPaymentPayload { amount: Decimal::from(10), method: PaymentMethod::Pix, paid_at: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("order_not_found")));
    }

    #[tokio::test]
    async fn store_refuses_to_delete_paid_orders() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        assert!(h.repos.payments.insert(&payment_for(&order)).await.unwrap());

        assert!(!h.repos.orders.delete(h.unit(), order.id).await.unwrap());
        assert!(h.repos.orders.get(h.unit(), order.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn mine_lists_only_my_orders() {
        let h = Harness::new().await;
        let mine = h.scheduled_order(at(9, 0), None).await;
        let _other = h.scheduled_order(at(10, 0), None).await;
        h.services
            .orders
            .assign(&h.ctx, mine.id, Some(h.ctx.user_id().to_string()))
            .await
            .unwrap();

        let listed = h.services.orders.list_assigned_to_me(&h.ctx).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
    }
}
