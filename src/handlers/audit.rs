// src/handlers/audit.rs

use axum::{
    extract::{Query, State},
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
        audit::{AuditLog, AuditQuery},
        auth::RequestContext,
    },
};

// GET /api/audit?collection&docId (admin)
#[utoipa::path(
    get,
    path = "/api/audit",
    tag = "Audit",
    params(
        AuditQuery,
        ("x-unit-id" = Uuid, Header, description = "ID da Unidade")
    ),
    responses(
        (status = 200, description = "Histórico do documento (mais antigo primeiro)", body = Vec<AuditLog>),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn audit_history(
    State(app_state): State<AppState>,
    _admin: AdminOnly,
    locale: Locale,
    ctx: RequestContext,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let history = app_state
        .services
        .audit
        .history(&ctx, &query.collection, &query.doc_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(history)))
}
