// src/handlers/schedule.rs

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::{
        auth::RequestContext,
        orders::{CreateOrderPayload, ServiceOrder},
        schedule::{CalendarRange, ConflictCheckPayload, ConflictCheckResponse, MoveEventPayload, ScheduleChanged},
    },
};

// GET /api/schedule?from&to
#[utoipa::path(
    get,
    path = "/api/schedule",
    tag = "Schedule",
    params(
        CalendarRange,
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "OS agendadas no intervalo", body = Vec<ServiceOrder>),
        (status = 400, description = "Intervalo inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn calendar(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Query(range): Query<CalendarRange>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = app_state
        .services
        .schedule
        .calendar(&ctx, &range)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(orders)))
}

// POST /api/schedule/conflicts
#[utoipa::path(
    post,
    path = "/api/schedule/conflicts",
    tag = "Schedule",
    request_body = ConflictCheckPayload,
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 200, description = "Resultado da verificação", body = ConflictCheckResponse),
        (status = 400, description = "Sem cliente/veículo ou janela inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn check_conflict(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<ConflictCheckPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .services
        .schedule
        .check_conflict(&ctx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(result)))
}

// POST /api/schedule/events
#[utoipa::path(
    post,
    path = "/api/schedule/events",
    tag = "Schedule",
    request_body = CreateOrderPayload,
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 201, description = "Evento (OS) criado", body = ServiceOrder),
        (status = 409, description = "Conflito de agenda")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_event(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .services
        .schedule
        .create_order(&ctx, payload)
        .await
        .map_err(|rejection| rejection.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

// PATCH /api/schedule/events/{id}
#[utoipa::path(
    patch,
    path = "/api/schedule/events/{id}",
    tag = "Schedule",
    request_body = MoveEventPayload,
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Evento movido ou redimensionado", body = ServiceOrder),
        (status = 409, description = "Recusado; details.revertTo traz a janela anterior")
    ),
    security(("api_jwt" = []))
)]
pub async fn move_event(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<MoveEventPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .services
        .schedule
        .move_event(&ctx, id, payload)
        .await
        .map_err(|rejection| rejection.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// GET /api/schedule/stream
#[utoipa::path(
    get,
    path = "/api/schedule/stream",
    tag = "Schedule",
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 200, description = "Eventos \"agenda mudou\" da unidade", content_type = "text/event-stream", body = ScheduleChanged)
    ),
    security(("api_jwt" = []))
)]
pub async fn schedule_stream(
    State(app_state): State<AppState>,
    ctx: RequestContext,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let unit_id = ctx.unit_id;
    let changes = BroadcastStream::new(app_state.services.schedule.subscribe());

    let stream = changes.filter_map(move |message| match message {
        Ok(change) if change.unit_id == unit_id => {
            Event::default().event("schedule").json_data(&change).ok().map(Ok)
        }
        Ok(_) => None,
        Err(lagged) => {
            // Assinante lento: o cliente recarrega o intervalo visível.
            tracing::warn!("⚠️ Stream da agenda atrasado: {}", lagged);
            Some(Ok(Event::default().event("resync").data("{}")))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
