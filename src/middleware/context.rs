// src/middleware/context.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::UnitContext},
    models::auth::RequestContext,
};

fn resolve(parts: &Parts) -> Result<RequestContext, AppError> {
    let user = parts
        .extensions
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AppError::InvalidToken)?;
    let unit = UnitContext::from_parts(parts)?;
    Ok(RequestContext::new(unit.0, user.0))
}

// Monta o contexto explícito (unidade + identidade) que os serviços recebem.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts).map_err(|e| {
            let app_state = AppState::from_ref(state);
            e.to_api_error(&Locale::from_parts(parts), &app_state.i18n_store)
        })
    }
}
