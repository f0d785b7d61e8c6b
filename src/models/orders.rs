// src/models/orders.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::serde_utils::double_option;

// --- Enums ---

// A ordem de declaração é a ordem das colunas do kanban.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Novo,
    EmAndamento,
    Concluido,
    Cancelado,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Novo,
        OrderStatus::EmAndamento,
        OrderStatus::Concluido,
        OrderStatus::Cancelado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Novo => "novo",
            OrderStatus::EmAndamento => "em_andamento",
            OrderStatus::Concluido => "concluido",
            OrderStatus::Cancelado => "cancelado",
        }
    }

    /// Concluído e cancelado não aceitam mais nenhuma transição.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Concluido | OrderStatus::Cancelado)
    }

    /// Tabela de transições da OS. A reentrada no mesmo estado é tratada
    /// pelo chamador como no-op, por isso também é aceita aqui.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Novo, EmAndamento) | (EmAndamento, Concluido) | (Novo, Cancelado) | (EmAndamento, Cancelado)
        )
    }

    /// Próximo passo do fluxo feliz (botão "Avançar" da lista do técnico).
    pub fn next_in_flow(&self) -> OrderStatus {
        match self {
            OrderStatus::Novo => OrderStatus::EmAndamento,
            OrderStatus::EmAndamento => OrderStatus::Concluido,
            other => *other,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Itens ---

/// Cópia de um serviço do catálogo no momento em que entrou na OS.
/// O preço fica congelado: nunca é recalculado a partir do catálogo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub service_id: Uuid,
    #[schema(example = "Troca de óleo")]
    pub name: String,
    #[schema(example = "100.00")]
    pub price: Decimal,
}

pub fn subtotal(items: &[LineItem]) -> Decimal {
    items.iter().map(|i| i.price).sum()
}

/// total = max(0, Σ preços − desconto)
pub fn compute_total(items: &[LineItem], discount: Decimal) -> Decimal {
    (subtotal(items) - discount).max(Decimal::ZERO)
}

// --- Janela de agendamento ---

/// Épsilon usado para eventos pontuais (sem fim definido).
pub fn point_epsilon() -> Duration {
    Duration::milliseconds(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleWindow {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl ScheduleWindow {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Fim efetivo do intervalo semiaberto [start, end).
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.end.unwrap_or(self.start + point_epsilon())
    }

    pub fn overlaps(&self, other: &ScheduleWindow) -> bool {
        self.start < other.effective_end() && other.start < self.effective_end()
    }

    pub fn is_valid(&self) -> bool {
        self.end.is_none_or(|end| end > self.start)
    }
}

// --- Ordem de Serviço ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrder {
    pub id: Uuid,
    #[schema(ignore)]
    pub unit_id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    #[sqlx(json)]
    pub items: Vec<LineItem>,
    #[schema(example = "30.00")]
    pub discount: Decimal,
    #[schema(example = "120.00")]
    pub total: Decimal,
    pub status: OrderStatus,
    pub assigned_to: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub notes: String,
    pub kanban_order: i32,
    #[serde(rename = "notified24h")]
    pub notified_24h: bool,
    #[schema(example = 1)]
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl ServiceOrder {
    pub fn window(&self) -> Option<ScheduleWindow> {
        self.scheduled_start
            .map(|start| ScheduleWindow::new(start, self.scheduled_end))
    }

    pub fn recompute_total(&mut self) {
        self.total = compute_total(&self.items, self.discount);
    }
}

/// Projeção mínima usada pelo detector de conflitos.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ScheduledSlot {
    pub id: Uuid,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: Option<DateTime<Utc>>,
}

impl ScheduledSlot {
    pub fn window(&self) -> ScheduleWindow {
        ScheduleWindow::new(self.scheduled_start, self.scheduled_end)
    }
}

// --- Comandos ---

/// Dados já resolvidos (itens congelados) para inserir uma OS.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    pub items: Vec<LineItem>,
    pub discount: Decimal,
    pub window: Option<ScheduleWindow>,
    pub notes: String,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub customer_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,

    #[serde(default)]
    pub service_ids: Vec<Uuid>,

    #[serde(default)]
    #[schema(example = "30.00")]
    pub discount: Decimal,

    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,

    #[serde(default)]
    #[validate(length(max = 4000, message = "notes_too_long"))]
    pub notes: String,

    pub assigned_to: Option<String>,
}

/// Patch parcial. Campos anuláveis usam Option<Option<_>>:
/// ausente = não mexe, null = limpa.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub customer_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub service_ids: Option<Vec<Uuid>>,
    pub discount: Option<Decimal>,

    #[validate(length(max = 4000, message = "notes_too_long"))]
    pub notes: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub scheduled_start: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub scheduled_end: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub assigned_to: Option<Option<String>>,

    /// Token de concorrência otimista opcional.
    pub expected_version: Option<i32>,
}

impl OrderPatch {
    pub fn touches_schedule(&self) -> bool {
        self.scheduled_start.is_some() || self.scheduled_end.is_some()
    }

    pub fn touches_scope(&self) -> bool {
        self.customer_id.is_some() || self.vehicle_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KanbanUpdate {
    pub id: Uuid,
    pub status: OrderStatus,
    #[schema(example = 0)]
    pub kanban_order: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KanbanPayload {
    pub updates: Vec<KanbanUpdate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusPayload {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPayload {
    pub user_id: Option<String>,
}

/// Filtros da listagem (status e intervalo de agendamento).
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
}

impl OrderFilter {
    pub fn matches(&self, order: &ServiceOrder) -> bool {
        if self.status.is_some_and(|s| s != order.status) {
            return false;
        }
        if let Some(assignee) = &self.assigned_to {
            if order.assigned_to.as_deref() != Some(assignee.as_str()) {
                return false;
            }
        }
        if self.from.is_some() || self.to.is_some() {
            let Some(start) = order.scheduled_start else {
                return false;
            };
            if self.from.is_some_and(|from| start < from) {
                return false;
            }
            if self.to.is_some_and(|to| start > to) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrderParams {
    #[serde(default)]
    pub confirm: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, h, m, 0).unwrap()
    }

    #[test]
    fn back_to_back_windows_do_not_overlap() {
        let a = ScheduleWindow::new(at(9, 0), Some(at(10, 0)));
        let b = ScheduleWindow::new(at(10, 0), Some(at(11, 0)));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn point_event_overlaps_containing_window_only() {
        let point = ScheduleWindow::new(at(9, 30), None);
        let around = ScheduleWindow::new(at(9, 0), Some(at(10, 0)));
        let after = ScheduleWindow::new(at(9, 31), Some(at(10, 0)));
        assert!(point.overlaps(&around));
        assert!(!point.overlaps(&after));
    }

    #[test]
    fn transition_table() {
        use OrderStatus::*;
        assert!(Novo.can_transition_to(EmAndamento));
        assert!(EmAndamento.can_transition_to(Concluido));
        assert!(Novo.can_transition_to(Cancelado));
        assert!(!Novo.can_transition_to(Concluido));
        for next in [Novo, EmAndamento, Cancelado] {
            assert!(!Concluido.can_transition_to(next));
        }
        for next in [Novo, EmAndamento, Concluido] {
            assert!(!Cancelado.can_transition_to(next));
        }
    }

    #[test]
    fn total_clamps_at_zero() {
        let items = vec![
            LineItem { service_id: Uuid::new_v4(), name: "a".into(), price: Decimal::from(100) },
            LineItem { service_id: Uuid::new_v4(), name: "b".into(), price: Decimal::from(50) },
        ];
        assert_eq!(compute_total(&items, Decimal::from(30)), Decimal::from(120));
        assert_eq!(compute_total(&items, Decimal::from(200)), Decimal::ZERO);
    }
}
