// src/handlers/orders.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::{
        auth::RequestContext,
        orders::{
            AssignPayload, CreateOrderPayload, DeleteOrderParams, KanbanPayload, OrderFilter, OrderPatch,
            ServiceOrder, SetStatusPayload,
        },
    },
};

// =============================================================================
//  LEITURA
// =============================================================================

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    params(
        OrderFilter,
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "OS da unidade (ordem do kanban)", body = Vec<ServiceOrder>),
        (status = 400, description = "Intervalo inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = app_state
        .services
        .orders
        .list_orders(&ctx, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(orders)))
}

// GET /api/orders/mine
#[utoipa::path(
    get,
    path = "/api/orders/mine",
    tag = "Orders",
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 200, description = "OS atribuídas a quem chamou", body = Vec<ServiceOrder>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let orders = app_state
        .services
        .orders
        .list_assigned_to_me(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(orders)))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "OS", body = ServiceOrder),
        (status = 404, description = "OS não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .services
        .orders
        .get_order(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// =============================================================================
//  ESCRITA (criação/edição passam pelo reconciliador do calendário)
// =============================================================================

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 201, description = "OS criada", body = ServiceOrder),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Conflito de agenda (details.revertTo)")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
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

// PATCH /api/orders/{id}
#[utoipa::path(
    patch,
    path = "/api/orders/{id}",
    tag = "Orders",
    request_body = OrderPatch,
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "OS atualizada", body = ServiceOrder),
        (status = 409, description = "Conflito, OS encerrada ou versão desatualizada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_order(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(patch): Json<OrderPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .services
        .schedule
        .update_order(&ctx, id, patch)
        .await
        .map_err(|rejection| rejection.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// DELETE /api/orders/{id}?confirm=true
#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        DeleteOrderParams,
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 204, description = "OS removida"),
        (status = 409, description = "OS com pagamentos ou encerrada sem confirmação")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_order(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteOrderParams>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .services
        .schedule
        .delete_order(&ctx, id, params.confirm)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  CICLO DE VIDA
// =============================================================================

// POST /api/orders/{id}/status
#[utoipa::path(
    post,
    path = "/api/orders/{id}/status",
    tag = "Orders",
    request_body = SetStatusPayload,
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Status alterado", body = ServiceOrder),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_status(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .services
        .schedule
        .set_status(&ctx, id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// POST /api/orders/{id}/advance
#[utoipa::path(
    post,
    path = "/api/orders/{id}/advance",
    tag = "Orders",
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "OS na próxima etapa do fluxo", body = ServiceOrder)
    ),
    security(("api_jwt" = []))
)]
pub async fn advance_order(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .services
        .orders
        .advance(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// PUT /api/orders/{id}/assignee
#[utoipa::path(
    put,
    path = "/api/orders/{id}/assignee",
    tag = "Orders",
    request_body = AssignPayload,
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Responsável definido (null remove)", body = ServiceOrder)
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_order(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .services
        .orders
        .assign(&ctx, id, payload.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// POST /api/orders/kanban
#[utoipa::path(
    post,
    path = "/api/orders/kanban",
    tag = "Orders",
    request_body = KanbanPayload,
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 200, description = "Lote aplicado inteiro", body = Vec<ServiceOrder>),
        (status = 409, description = "Lote recusado inteiro")
    ),
    security(("api_jwt" = []))
)]
pub async fn reorder_kanban(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<KanbanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = app_state
        .services
        .schedule
        .reorder_kanban(&ctx, &payload.updates)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(orders)))
}
