// src/handlers/quotes.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::{
        auth::RequestContext,
        orders::ServiceOrder,
        quotes::{PublicQuote, PublishedQuote, Quote, QuotePayload, QuoteStatus, TokenQuery},
    },
};

// =============================================================================
//  ÁREA 1: ORÇAMENTOS (autenticado)
// =============================================================================

// GET /api/quotes
#[utoipa::path(
    get,
    path = "/api/quotes",
    tag = "Quotes",
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 200, description = "Orçamentos (mais recentes primeiro)", body = Vec<Quote>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_quotes(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    let quotes = app_state
        .services
        .quotes
        .list(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quotes)))
}

// POST /api/quotes
#[utoipa::path(
    post,
    path = "/api/quotes",
    tag = "Quotes",
    request_body = QuotePayload,
    params(("x-unit-id" = Uuid, Header, description = "ID da Unidade")),
    responses(
        (status = 201, description = "Orçamento criado", body = Quote),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Json(payload): Json<QuotePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = app_state
        .services
        .quotes
        .create(&ctx, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(quote)))
}

// GET /api/quotes/{id}
#[utoipa::path(
    get,
    path = "/api/quotes/{id}",
    tag = "Quotes",
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Orçamento", body = Quote),
        (status = 404, description = "Orçamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = app_state
        .services
        .quotes
        .get(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quote)))
}

// PUT /api/quotes/{id}
#[utoipa::path(
    put,
    path = "/api/quotes/{id}",
    tag = "Quotes",
    request_body = QuotePayload,
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Orçamento atualizado", body = Quote)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuotePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = app_state
        .services
        .quotes
        .update(&ctx, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quote)))
}

// DELETE /api/quotes/{id}
#[utoipa::path(
    delete,
    path = "/api/quotes/{id}",
    tag = "Quotes",
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 204, description = "Orçamento removido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .services
        .quotes
        .delete(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/quotes/{id}/publish
#[utoipa::path(
    post,
    path = "/api/quotes/{id}/publish",
    tag = "Quotes",
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 201, description = "Link público gerado", body = PublishedQuote)
    ),
    security(("api_jwt" = []))
)]
pub async fn publish_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let published = app_state
        .services
        .quotes
        .publish(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(published)))
}

// POST /api/quotes/{id}/convert
#[utoipa::path(
    post,
    path = "/api/quotes/{id}/convert",
    tag = "Quotes",
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 201, description = "OS criada a partir do orçamento", body = ServiceOrder)
    ),
    security(("api_jwt" = []))
)]
pub async fn convert_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .services
        .quotes
        .convert_to_order(&ctx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

// =============================================================================
//  ÁREA 2: LINK PÚBLICO (sem autenticação)
// =============================================================================

// GET /api/public/quotes/{token}
#[utoipa::path(
    get,
    path = "/api/public/quotes/{token}",
    tag = "Public",
    params(("token" = String, Path, description = "Token do link público")),
    responses(
        (status = 200, description = "Cópia congelada do orçamento", body = PublicQuote),
        (status = 404, description = "Link desconhecido")
    )
)]
pub async fn get_public_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let public = app_state
        .services
        .quotes
        .public_view(&token)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(public)))
}

async fn decide(
    app_state: &AppState,
    locale: &Locale,
    query: &TokenQuery,
    decision: QuoteStatus,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    app_state
        .services
        .quotes
        .decide(query.token.as_deref(), decision)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(json!({ "ok": true }))))
}

// POST /acceptQuote?token=
#[utoipa::path(
    post,
    path = "/acceptQuote",
    tag = "Public",
    params(TokenQuery),
    responses(
        (status = 200, description = "{\"ok\": true}"),
        (status = 400, description = "Token ausente"),
        (status = 404, description = "Link desconhecido")
    )
)]
pub async fn accept_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    decide(&app_state, &locale, &query, QuoteStatus::Aceito).await
}

// POST /rejectQuote?token=
#[utoipa::path(
    post,
    path = "/rejectQuote",
    tag = "Public",
    params(TokenQuery),
    responses(
        (status = 200, description = "{\"ok\": true}"),
        (status = 400, description = "Token ausente"),
        (status = 404, description = "Link desconhecido")
    )
)]
pub async fn reject_quote(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    decide(&app_state, &locale, &query, QuoteStatus::Rejeitado).await
}
