// src/handlers/payments.rs

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
        payments::{AddPaymentPayload, Payment, PaymentSummary},
    },
};

// GET /api/orders/{id}/payments
#[utoipa::path(
    get,
    path = "/api/orders/{id}/payments",
    tag = "Payments",
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Pagamentos e saldo em aberto", body = PaymentSummary),
        (status = 404, description = "OS não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn payment_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .services
        .payments
        .summary(&ctx, order_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}

// POST /api/orders/{id}/payments
#[utoipa::path(
    post,
    path = "/api/orders/{id}/payments",
    tag = "Payments",
    request_body = AddPaymentPayload,
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 201, description = "Pagamento registrado", body = Payment),
        (status = 400, description = "Valor não positivo")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AddPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = app_state
        .services
        .payments
        .add_payment(&ctx, order_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(payment)))
}

// DELETE /api/orders/{id}/payments/{paymentId}
#[utoipa::path(
    delete,
    path = "/api/orders/{id}/payments/{paymentId}",
    tag = "Payments",
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("paymentId" = Uuid, Path, description = "ID do pagamento"),
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 204, description = "Pagamento removido"),
        (status = 404, description = "Pagamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: RequestContext,
    Path((order_id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .services
        .payments
        .delete_payment(&ctx, order_id, payment_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
