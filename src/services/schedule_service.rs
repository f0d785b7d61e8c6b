// src/services/schedule_service.rs

//! Reconciliador do calendário.
//!
//! Todo gesto (criar, arrastar, redimensionar, editar cliente/veículo de uma
//! OS agendada) passa pelo detector de conflitos antes de chegar ao ciclo de
//! vida da OS. Gestos da mesma OS são serializados; OS diferentes seguem em
//! paralelo. Cada gesto termina com a janela nova gravada ou com a janela
//! anterior para o cliente desfazer o arraste.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use serde_json::{json, Value};
use tokio::sync::{broadcast, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::{
        error::{ApiError, AppError},
        i18n::I18nStore,
    },
    middleware::i18n::Locale,
    models::{
        auth::RequestContext,
        orders::{CreateOrderPayload, KanbanUpdate, OrderPatch, OrderStatus, ScheduleWindow, ServiceOrder},
        schedule::{
            CalendarRange, ConflictCheckPayload, ConflictCheckResponse, MoveEventPayload, ScheduleChangeKind,
            ScheduleChanged,
        },
    },
    services::{conflict_service::ConflictService, order_service::OrderService},
};

const EVENTS_CAPACITY: usize = 64;

/// Uma trava assíncrona por OS.
#[derive(Clone, Default)]
pub struct OrderLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl OrderLocks {
    pub async fn lock(&self, order_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Descarta travas que ninguém está segurando nem esperando.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(order_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Gesto em andamento: a última janela gravada e a proposta.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingGesture {
    pub order_id: Option<Uuid>,
    pub committed: Option<ScheduleWindow>,
    pub proposed: Option<ScheduleWindow>,
}

impl PendingGesture {
    pub fn resolve(self, outcome: Result<ServiceOrder, AppError>) -> Result<ServiceOrder, GestureRejection> {
        match outcome {
            Ok(order) => Ok(order),
            Err(error) => {
                tracing::info!(
                    order_id = ?self.order_id,
                    proposed = ?self.proposed,
                    "↩️ Gesto recusado ({}), voltando para {:?}",
                    error.code(),
                    self.committed
                );
                Err(GestureRejection { error, revert_to: self.committed })
            }
        }
    }
}

#[derive(Debug)]
pub struct GestureRejection {
    pub error: AppError,
    /// Janela que o calendário deve voltar a mostrar.
    pub revert_to: Option<ScheduleWindow>,
}

impl From<AppError> for GestureRejection {
    fn from(error: AppError) -> Self {
        Self { error, revert_to: None }
    }
}

impl GestureRejection {
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let mut api_error = self.error.to_api_error(locale, i18n);
        let revert_to = json!(self.revert_to);

        match api_error.details.as_mut() {
            Some(Value::Object(details)) => {
                details.insert("revertTo".to_string(), revert_to);
            }
            _ => api_error.details = Some(json!({ "revertTo": revert_to })),
        }
        api_error
    }
}

fn proposed_window(current: &ServiceOrder, patch: &OrderPatch) -> Option<ScheduleWindow> {
    let start = patch.scheduled_start.unwrap_or(current.scheduled_start)?;
    let end = patch.scheduled_end.unwrap_or(current.scheduled_end);
    Some(ScheduleWindow::new(start, end))
}

#[derive(Clone)]
pub struct ScheduleService {
    orders: OrderService,
    conflicts: ConflictService,
    locks: OrderLocks,
    events: broadcast::Sender<ScheduleChanged>,
}

impl ScheduleService {
    pub fn new(orders: OrderService, conflicts: ConflictService) -> Self {
        let (events, _) = broadcast::channel(EVENTS_CAPACITY);
        Self { orders, conflicts, locks: OrderLocks::default(), events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScheduleChanged> {
        self.events.subscribe()
    }

    fn publish(&self, ctx: &RequestContext, order_id: Uuid, kind: ScheduleChangeKind, window: Option<ScheduleWindow>) {
        // Sem assinantes o envio falha, e tudo bem.
        let _ = self.events.send(ScheduleChanged { unit_id: ctx.unit_id, order_id, kind, window });
    }

    // --- LEITURA ---

    pub async fn calendar(&self, ctx: &RequestContext, range: &CalendarRange) -> Result<Vec<ServiceOrder>, AppError> {
        if range.from > range.to {
            return Err(AppError::InvalidInput("invalid_range"));
        }
        self.orders.calendar(ctx, range.window()).await
    }

    pub async fn check_conflict(
        &self,
        ctx: &RequestContext,
        payload: &ConflictCheckPayload,
    ) -> Result<ConflictCheckResponse, AppError> {
        let window = ScheduleWindow::new(payload.start, payload.end);
        let conflicting_order_id = self
            .conflicts
            .find_conflict(ctx.unit_id, payload.customer_id, payload.vehicle_id, window, payload.exclude_order_id)
            .await?;

        Ok(ConflictCheckResponse { conflict: conflicting_order_id.is_some(), conflicting_order_id })
    }

    // --- GESTOS ---

    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        payload: CreateOrderPayload,
    ) -> Result<ServiceOrder, GestureRejection> {
        let new_order = self.orders.prepare_new_order(ctx, payload).await?;
        let gesture = PendingGesture { order_id: None, committed: None, proposed: new_order.window };

        let outcome = async {
            if let Some(window) = new_order.window {
                if let Some(conflicting_order_id) = self
                    .conflicts
                    .find_booking_conflict(ctx.unit_id, new_order.customer_id, new_order.vehicle_id, window, None)
                    .await?
                {
                    return Err(AppError::ConflictDetected { conflicting_order_id });
                }
            }
            self.orders.create_order(ctx, new_order).await
        }
        .await;

        let order = gesture.resolve(outcome)?;
        if order.window().is_some() {
            self.publish(ctx, order.id, ScheduleChangeKind::Created, order.window());
        }
        Ok(order)
    }

    /// Qualquer edição da OS. Só consulta o detector quando a janela, o
    /// cliente ou o veículo de uma OS agendada mudam.
    pub async fn update_order(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        patch: OrderPatch,
    ) -> Result<ServiceOrder, GestureRejection> {
        let _guard = self.locks.lock(id).await;

        let current = self.orders.get_order(ctx, id).await?;
        let gesture = PendingGesture {
            order_id: Some(id),
            committed: current.window(),
            proposed: proposed_window(&current, &patch),
        };

        let outcome = self.commit_patch(ctx, &current, &patch).await;
        let order = gesture.resolve(outcome)?;

        let rescheduled = order.window() != current.window();
        if rescheduled {
            self.publish(ctx, order.id, ScheduleChangeKind::Moved, order.window());
        } else if order.window().is_some() {
            self.publish(ctx, order.id, ScheduleChangeKind::Updated, order.window());
        }
        Ok(order)
    }

    /// Arrastar (início e fim novos) ou redimensionar (fim novo).
    pub async fn move_event(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        payload: MoveEventPayload,
    ) -> Result<ServiceOrder, GestureRejection> {
        let patch = OrderPatch {
            scheduled_start: Some(Some(payload.start)),
            scheduled_end: Some(payload.end),
            ..Default::default()
        };
        self.update_order(ctx, id, patch).await
    }

    pub async fn delete_order(&self, ctx: &RequestContext, id: Uuid, confirm: bool) -> Result<(), AppError> {
        let _guard = self.locks.lock(id).await;

        let deleted = self.orders.delete_order(ctx, id, confirm).await?;
        if deleted.window().is_some() {
            self.publish(ctx, id, ScheduleChangeKind::Deleted, None);
        }
        Ok(())
    }

    // --- STATUS ---

    /// Cancelar uma OS agendada libera o horário, então o calendário é avisado.
    fn publish_if_cancelled(&self, ctx: &RequestContext, before: OrderStatus, saved: &ServiceOrder) {
        if before != OrderStatus::Cancelado && saved.status == OrderStatus::Cancelado && saved.window().is_some() {
            self.publish(ctx, saved.id, ScheduleChangeKind::Updated, saved.window());
        }
    }

    pub async fn set_status(&self, ctx: &RequestContext, id: Uuid, status: OrderStatus) -> Result<ServiceOrder, AppError> {
        let _guard = self.locks.lock(id).await;

        let before = self.orders.get_order(ctx, id).await?.status;
        let saved = self.orders.set_status(ctx, id, status).await?;
        self.publish_if_cancelled(ctx, before, &saved);
        Ok(saved)
    }

    pub async fn reorder_kanban(&self, ctx: &RequestContext, updates: &[KanbanUpdate]) -> Result<Vec<ServiceOrder>, AppError> {
        // Travas sempre na mesma ordem para dois lotes não se bloquearem.
        let mut ids: Vec<Uuid> = updates.iter().map(|u| u.id).collect();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        let mut before = HashMap::with_capacity(ids.len());
        for id in ids {
            guards.push(self.locks.lock(id).await);
            before.insert(id, self.orders.get_order(ctx, id).await?.status);
        }

        let saved = self.orders.reorder_within_status(ctx, updates).await?;
        for order in &saved {
            if let Some(status) = before.get(&order.id) {
                self.publish_if_cancelled(ctx, *status, order);
            }
        }
        Ok(saved)
    }

    async fn commit_patch(
        &self,
        ctx: &RequestContext,
        current: &ServiceOrder,
        patch: &OrderPatch,
    ) -> Result<ServiceOrder, AppError> {
        let merged = self.orders.merge_patch(ctx, current, patch).await?;

        let slot_changed = merged.window() != current.window()
            || merged.customer_id != current.customer_id
            || merged.vehicle_id != current.vehicle_id;

        if slot_changed && merged.status != OrderStatus::Cancelado {
            if let Some(window) = merged.window() {
                if let Some(conflicting_order_id) = self
                    .conflicts
                    .find_booking_conflict(ctx.unit_id, merged.customer_id, merged.vehicle_id, window, Some(merged.id))
                    .await?
                {
                    return Err(AppError::ConflictDetected { conflicting_order_id });
                }
            }
        }

        self.orders.commit_update(ctx, current, merged).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{at, Harness};

    fn payload_for(h: &Harness, base: &ServiceOrder, start: chrono::DateTime<chrono::Utc>, end: Option<chrono::DateTime<chrono::Utc>>) -> CreateOrderPayload {
        CreateOrderPayload {
            customer_id: Some(base.customer_id),
            vehicle_id: Some(Uuid::new_v4()),
            service_ids: vec![h.default_service_id()],
            discount: Default::default(),
            scheduled_start: Some(start),
            scheduled_end: end,
            notes: String::new(),
            assigned_to: None,
        }
    }

    #[tokio::test]
    async fn booking_scenario_nine_to_ten() {
        let h = Harness::new().await;
        let existing = h.scheduled_order(at(9, 0), Some(at(10, 0))).await;
        let schedule = &h.services.schedule;

        let rejected = schedule
            .create_order(&h.ctx, payload_for(&h, &existing, at(9, 30), Some(at(10, 30))))
            .await
            .unwrap_err();
        assert!(matches!(
            rejected.error,
            AppError::ConflictDetected { conflicting_order_id } if conflicting_order_id == existing.id
        ));
        assert_eq!(rejected.revert_to, None);

        let accepted = schedule
            .create_order(&h.ctx, payload_for(&h, &existing, at(10, 0), Some(at(11, 0))))
            .await
            .unwrap();
        assert_eq!(accepted.scheduled_start, Some(at(10, 0)));
    }

    #[tokio::test]
    async fn conflicting_move_reverts_to_committed_window() {
        let h = Harness::new().await;
        let blocker = h.scheduled_order(at(9, 0), Some(at(10, 0))).await;
        let moving = h.scheduled_order_for(blocker.customer_id, Uuid::new_v4(), at(13, 0), Some(at(14, 0))).await;

        let rejection = h
            .services
            .schedule
            .move_event(&h.ctx, moving.id, MoveEventPayload { start: at(9, 15), end: Some(at(9, 45)) })
            .await
            .unwrap_err();

        assert!(matches!(rejection.error, AppError::ConflictDetected { .. }));
        assert_eq!(rejection.revert_to, moving.window());

        let stored = h.services.orders.get_order(&h.ctx, moving.id).await.unwrap();
        assert_eq!(stored.window(), moving.window());
        assert_eq!(stored.version, moving.version);
    }

    #[tokio::test]
    async fn store_failure_reverts_the_gesture() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), Some(at(10, 0))).await;
        h.store.set_fail_writes(true);

        let rejection = h
            .services
            .schedule
            .move_event(&h.ctx, order.id, MoveEventPayload { start: at(15, 0), end: None })
            .await
            .unwrap_err();

        assert!(matches!(rejection.error, AppError::StoreUnavailable(_)));
        assert_eq!(rejection.revert_to, order.window());

        h.store.set_fail_writes(false);
        let stored = h.services.orders.get_order(&h.ctx, order.id).await.unwrap();
        assert_eq!(stored.scheduled_start, Some(at(9, 0)));
    }

    #[tokio::test]
    async fn successful_move_is_published() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), Some(at(10, 0))).await;
        let mut events = h.services.schedule.subscribe();

        let moved = h
            .services
            .schedule
            .move_event(&h.ctx, order.id, MoveEventPayload { start: at(11, 0), end: Some(at(12, 0)) })
            .await
            .unwrap();
        assert!(!moved.notified_24h);

        let event = events.recv().await.unwrap();
        assert_eq!(event.order_id, order.id);
        assert_eq!(event.kind, ScheduleChangeKind::Moved);
        assert_eq!(event.window, moved.window());
    }

    #[tokio::test]
    async fn changing_the_vehicle_rechecks_the_slot() {
        let h = Harness::new().await;
        let other = h.scheduled_order(at(9, 0), Some(at(10, 0))).await;
        let order = h.scheduled_order(at(9, 0), Some(at(10, 0))).await;

        let patch = OrderPatch { vehicle_id: Some(other.vehicle_id), ..Default::default() };
        let rejection = h.services.schedule.update_order(&h.ctx, order.id, patch).await.unwrap_err();
        assert!(matches!(rejection.error, AppError::ConflictDetected { .. }));
    }

    #[tokio::test]
    async fn same_order_gestures_are_serialized() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), Some(at(10, 0))).await;
        let schedule = &h.services.schedule;

        let patch = |start| OrderPatch {
            scheduled_start: Some(Some(start)),
            scheduled_end: Some(None),
            expected_version: Some(order.version),
            ..Default::default()
        };

        let (a, b) = tokio::join!(
            schedule.update_order(&h.ctx, order.id, patch(at(11, 0))),
            schedule.update_order(&h.ctx, order.id, patch(at(12, 0))),
        );

        let outcomes = [a.is_ok(), b.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let loser = a.err().or(b.err()).unwrap();
        assert!(matches!(loser.error, AppError::ConcurrentModification));
    }

    #[tokio::test]
    async fn cancelling_a_scheduled_order_is_published() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), Some(at(10, 0))).await;
        let mut events = h.services.schedule.subscribe();

        let cancelled = h.services.schedule.set_status(&h.ctx, order.id, OrderStatus::Cancelado).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelado);

        let event = events.recv().await.unwrap();
        assert_eq!(event.order_id, order.id);
        assert_eq!(event.kind, ScheduleChangeKind::Updated);

        // Cancelar de novo não muda nada e não avisa ninguém.
        h.services.schedule.set_status(&h.ctx, order.id, OrderStatus::Cancelado).await.unwrap();
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn kanban_cancel_is_published_only_for_scheduled_cards() {
        let h = Harness::new().await;
        let scheduled = h.scheduled_order(at(9, 0), Some(at(10, 0))).await;
        let unscheduled = h.order_with(&[h.default_service_id()]).await;
        let mut events = h.services.schedule.subscribe();

        let updates = [
            KanbanUpdate { id: unscheduled.id, status: OrderStatus::Cancelado, kanban_order: 0 },
            KanbanUpdate { id: scheduled.id, status: OrderStatus::Cancelado, kanban_order: 1 },
        ];
        let saved = h.services.schedule.reorder_kanban(&h.ctx, &updates).await.unwrap();
        assert_eq!(saved.len(), 2);

        let event = events.recv().await.unwrap();
        assert_eq!(event.order_id, scheduled.id);
        assert_eq!(event.window, scheduled.window());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn calendar_lists_orders_in_range() {
        let h = Harness::new().await;
        let inside = h.scheduled_order(at(9, 0), None).await;
        let _outside = h.scheduled_order(at(20, 0), None).await;

        let listed = h
            .services
            .schedule
            .calendar(&h.ctx, &CalendarRange { from: at(8, 0), to: at(12, 0) })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, inside.id);

        let err = h
            .services
            .schedule
            .calendar(&h.ctx, &CalendarRange { from: at(12, 0), to: at(8, 0) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput("invalid_range")));
    }

    #[tokio::test]
    async fn calendar_includes_events_spanning_the_range_edges() {
        let h = Harness::new().await;
        let spanning = h.scheduled_order(at(7, 0), Some(at(10, 0))).await;
        let _ends_at_from = h.scheduled_order(at(6, 0), Some(at(8, 0))).await;
        let _starts_at_to = h.scheduled_order(at(12, 0), Some(at(13, 0))).await;

        let listed = h
            .services
            .schedule
            .calendar(&h.ctx, &CalendarRange { from: at(8, 0), to: at(12, 0) })
            .await
            .unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![spanning.id]);
    }

    #[tokio::test]
    async fn rejection_details_carry_revert_window() {
        let rejection = GestureRejection {
            error: AppError::ConflictDetected { conflicting_order_id: Uuid::nil() },
            revert_to: Some(ScheduleWindow::new(at(9, 0), None)),
        };
        let api = rejection.to_api_error(&Locale::default(), I18nStore::builtin_ref());
        let details = api.details.unwrap();
        assert_eq!(details["conflictingOrderId"], json!(Uuid::nil()));
        assert_eq!(details["revertTo"]["start"], json!(at(9, 0)));
    }
}
