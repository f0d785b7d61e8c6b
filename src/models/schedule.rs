// src/models/schedule.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::orders::ScheduleWindow;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheckPayload {
    pub customer_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub exclude_order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheckResponse {
    pub conflict: bool,
    pub conflicting_order_id: Option<Uuid>,
}

/// Arrastar ou redimensionar um evento no calendário.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveEventPayload {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct CalendarRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl CalendarRange {
    /// Intervalo visível como janela semiaberta; `from == to` vira evento pontual.
    pub fn window(&self) -> ScheduleWindow {
        ScheduleWindow::new(self.from, (self.to > self.from).then_some(self.to))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleChangeKind {
    Created,
    Moved,
    Updated,
    Deleted,
}

/// Sinal de "agenda mudou" para observadores (não é durável).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleChanged {
    #[schema(ignore)]
    pub unit_id: Uuid,
    pub order_id: Uuid,
    pub kind: ScheduleChangeKind,
    pub window: Option<ScheduleWindow>,
}
