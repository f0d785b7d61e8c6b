use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::orders::OrderStatus,
};

// Nosso tipo de erro de domínio, com `thiserror` para melhor ergonomia.
// As chaves (&'static str) são resolvidas pelo I18nStore na borda HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(&'static str),

    #[error("Não encontrado: {0}")]
    NotFound(&'static str),

    #[error("Conflito de agendamento com a OS {conflicting_order_id}")]
    ConflictDetected { conflicting_order_id: Uuid },

    #[error("Transição inválida: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("A OS foi alterada por outra pessoa")]
    ConcurrentModification,

    #[error("A OS está encerrada")]
    OrderClosed,

    #[error("A OS possui pagamentos")]
    OrderHasPayments,

    #[error("O cliente possui veículos")]
    CustomerHasVehicles,

    #[error("Confirmação necessária")]
    ConfirmationRequired,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Unidade ausente ou inválida")]
    MissingUnit,

    // Falhas transitórias de I/O do armazenamento: sem retry automático.
    #[error("Armazenamento indisponível: {0}")]
    StoreUnavailable(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(sqlx::Error),

    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// sqlx::Error é dividido em "transitório" (StoreUnavailable) e o resto.
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::StoreUnavailable(e.to_string())
            }
            other => AppError::DatabaseError(other),
        }
    }
}

/// Erro pronto para a resposta HTTP (já traduzido).
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "code": self.code,
            "error": self.error,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    /// Código estável (usado pelos clientes e como chave de tradução).
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::InvalidInput(key) | AppError::NotFound(key) => *key,
            AppError::ConflictDetected { .. } => "schedule_conflict",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::ConcurrentModification => "concurrent_modification",
            AppError::OrderClosed => "order_closed",
            AppError::OrderHasPayments => "order_has_payments",
            AppError::CustomerHasVehicles => "customer_has_vehicles",
            AppError::ConfirmationRequired => "confirmation_required",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden => "forbidden",
            AppError::MissingUnit => "missing_unit",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::JwtError(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) | AppError::MissingUnit => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConflictDetected { .. }
            | AppError::InvalidTransition { .. }
            | AppError::ConcurrentModification
            | AppError::OrderClosed
            | AppError::OrderHasPayments
            | AppError::CustomerHasVehicles
            | AppError::ConfirmationRequired => StatusCode::CONFLICT,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();
        let code = self.code();
        let error = i18n.translate(&locale.0, code).to_string();

        let details = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let key = e.message.as_deref().unwrap_or(e.code.as_ref());
                            Value::String(i18n.translate(&locale.0, key).to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(details))
            }
            AppError::ConflictDetected { conflicting_order_id } => {
                Some(json!({ "conflictingOrderId": conflicting_order_id }))
            }
            AppError::InvalidTransition { from, to } => Some(json!({ "from": from, "to": to })),
            AppError::StoreUnavailable(e) => {
                tracing::warn!("⚠️ Armazenamento indisponível: {}", e);
                None
            }
            // Todos os outros erros internos viram 500 e vão para o log.
            e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                None
            }
            _ => None,
        };

        ApiError { status, code, error, details }
    }
}

// Usado por extratores e pelo middleware, onde não temos o AppState à mão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::builtin_ref())
            .into_response()
    }
}
