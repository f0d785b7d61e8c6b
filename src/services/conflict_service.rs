// src/services/conflict_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OrderRepository,
    models::orders::ScheduleWindow,
};

/// Detector de conflitos de agenda.
///
/// Candidatas vêm do repositório (mesmo cliente e/ou veículo, início antes
/// do fim proposto, não canceladas) e o teste final é a sobreposição do
/// intervalo semiaberto. Varredura linear: suficiente para uma oficina.
#[derive(Clone)]
pub struct ConflictService {
    orders: Arc<dyn OrderRepository>,
}

impl ConflictService {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Primeira OS conflitante, considerando os filtros informados em conjunto.
    pub async fn find_conflict(
        &self,
        unit_id: Uuid,
        customer_id: Option<Uuid>,
        vehicle_id: Option<Uuid>,
        window: ScheduleWindow,
        exclude_order_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        if customer_id.is_none() && vehicle_id.is_none() {
            return Err(AppError::InvalidInput("conflict_scope_required"));
        }
        if !window.is_valid() {
            return Err(AppError::InvalidInput("invalid_schedule_window"));
        }

        let mut candidates = self
            .orders
            .schedule_candidates(unit_id, customer_id, vehicle_id, window.effective_end())
            .await?;

        // Resposta estável quando há mais de um conflito.
        candidates.sort_by_key(|slot| (slot.scheduled_start, slot.id));

        Ok(candidates
            .into_iter()
            .filter(|slot| Some(slot.id) != exclude_order_id)
            .find(|slot| slot.window().overlaps(&window))
            .map(|slot| slot.id))
    }

    pub async fn has_conflict(
        &self,
        unit_id: Uuid,
        customer_id: Option<Uuid>,
        vehicle_id: Option<Uuid>,
        window: ScheduleWindow,
        exclude_order_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        Ok(self
            .find_conflict(unit_id, customer_id, vehicle_id, window, exclude_order_id)
            .await?
            .is_some())
    }

    /// Regra do calendário: conflito com qualquer OS do mesmo cliente
    /// OU do mesmo veículo.
    pub async fn find_booking_conflict(
        &self,
        unit_id: Uuid,
        customer_id: Uuid,
        vehicle_id: Uuid,
        window: ScheduleWindow,
        exclude_order_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        if let Some(id) = self
            .find_conflict(unit_id, Some(customer_id), None, window, exclude_order_id)
            .await?
        {
            return Ok(Some(id));
        }
        self.find_conflict(unit_id, None, Some(vehicle_id), window, exclude_order_id)
            .await
    }
}
