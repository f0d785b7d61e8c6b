// src/handlers/catalog.rs

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
    middleware::{i18n::Locale, rbac::AdminOnly},
    models::{
        auth::RequestContext,
        catalog::{CatalogService, CatalogServicePayload},
    },
};

// GET /api/services
#[utoipa::path(
    get,
    path = "/api/services",
    tag = "Catalog",
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 200, description = "Catálogo de serviços", body = Vec<CatalogService>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_services(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let services = app_state
        .services
        .crm
        .list_services(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(services)))
}

// POST /api/services (admin)
#[utoipa::path(
    post,
    path = "/api/services",
    tag = "Catalog",
    request_body = CatalogServicePayload,
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 201, description = "Serviço criado", body = CatalogService),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_service(
    State(app_state): State<AppState>,
    _admin: AdminOnly,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<CatalogServicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = app_state
        .services
        .crm
        .create_service(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(service)))
}

// PUT /api/services/{id} (admin)
#[utoipa::path(
    put,
    path = "/api/services/{id}",
    tag = "Catalog",
    request_body = CatalogServicePayload,
    params(
        ("id" = Uuid, Path, description = "ID do serviço"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Serviço atualizado (OS existentes mantêm o preço)", body = CatalogService)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_service(
    State(app_state): State<AppState>,
    _admin: AdminOnly,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CatalogServicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = app_state
        .services
        .crm
        .update_service(&ctx, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(service)))
}

// DELETE /api/services/{id} (admin)
#[utoipa::path(
    delete,
    path = "/api/services/{id}",
    tag = "Catalog",
    params(
        ("id" = Uuid, Path, description = "ID do serviço"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 204, description = "Serviço removido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_service(
    State(app_state): State<AppState>,
    _admin: AdminOnly,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .services
        .crm
        .delete_service(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
