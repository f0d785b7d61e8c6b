// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::Role,
};

/// 1. O Trait que define o papel exigido pela rota
pub trait RoleDef: Send + Sync + 'static {
    fn role() -> Role;

    // Admin passa em qualquer rota.
    fn allows(role: Role) -> bool {
        role == Role::Admin || role == Self::role()
    }
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verdict = match parts.extensions.get::<AuthenticatedUser>() {
            None => Err(AppError::InvalidToken),
            Some(user) if T::allows(user.0.role) => Ok(RequireRole(PhantomData)),
            Some(user) => {
                tracing::info!(uid = %user.0.uid, "🚫 Papel {:?} exigido", T::role());
                Err(AppError::Forbidden)
            }
        };

        verdict.map_err(|e| {
            let app_state = AppState::from_ref(state);
            e.to_api_error(&Locale::from_parts(parts), &app_state.i18n_store)
        })
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct AdminRole;
impl RoleDef for AdminRole {
    fn role() -> Role { Role::Admin }
}

pub type AdminOnly = RequireRole<AdminRole>;
