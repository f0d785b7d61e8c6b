// src/handlers/crm.rs

use axum::{
    extract::{Path, State},
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
        crm::{Customer, CustomerPayload, Vehicle, VehiclePayload},
    },
};

// =============================================================================
//  ÁREA 1: CLIENTES
// =============================================================================

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "CRM",
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 200, description = "Clientes da unidade", body = Vec<Customer>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let customers = app_state
        .services
        .crm
        .list_customers(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customers)))
}

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "CRM",
    request_body = CustomerPayload,
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 201, description = "Cliente criado", body = Customer),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .services
        .crm
        .create_customer(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "CRM",
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .services
        .crm
        .get_customer(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

// PUT /api/customers/{id}
#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "CRM",
    request_body = CustomerPayload,
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Cliente atualizado", body = Customer)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .services
        .crm
        .update_customer(&ctx, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

// DELETE /api/customers/{id}
#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "CRM",
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 204, description = "Cliente removido"),
        (status = 409, description = "Cliente ainda possui veículos")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .services
        .crm
        .delete_customer(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: VEÍCULOS
// =============================================================================

// GET /api/customers/{id}/vehicles
#[utoipa::path(
    get,
    path = "/api/customers/{id}/vehicles",
    tag = "CRM",
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Veículos do cliente", body = Vec<Vehicle>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_vehicles(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let vehicles = app_state
        .services
        .crm
        .list_vehicles(&ctx, customer_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(vehicles)))
}

// POST /api/customers/{id}/vehicles
#[utoipa::path(
    post,
    path = "/api/customers/{id}/vehicles",
    tag = "CRM",
    request_body = VehiclePayload,
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 201, description = "Veículo cadastrado", body = Vehicle),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_vehicle(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<VehiclePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let vehicle = app_state
        .services
        .crm
        .create_vehicle(&ctx, customer_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(vehicle)))
}

// DELETE /api/vehicles/{id}
#[utoipa::path(
    delete,
    path = "/api/vehicles/{id}",
    tag = "CRM",
    params(
        ("id" = Uuid, Path, description = "ID do veículo"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 204, description = "Veículo removido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_vehicle(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .services
        .crm
        .delete_vehicle(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
