// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

// O nome do nosso cabeçalho HTTP customizado
pub const UNIT_ID_HEADER: &str = "x-unit-id";

/// Unidade (oficina) em que a requisição atua.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitContext(pub Uuid);

impl UnitContext {
    pub fn from_parts(parts: &Parts) -> Result<Self, AppError> {
        parts
            .headers
            .get(UNIT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(UnitContext)
            .ok_or(AppError::MissingUnit)
    }
}

impl<S> FromRequestParts<S> for UnitContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        UnitContext::from_parts(parts).map_err(|e| {
            let app_state = AppState::from_ref(state);
            e.to_api_error(&Locale::from_parts(parts), &app_state.i18n_store)
        })
    }
}
