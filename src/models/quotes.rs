// src/models/quotes.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::orders::LineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "quote_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Rascunho,
    Enviado,
    Aceito,
    Rejeitado,
    Expirado,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Rascunho => "rascunho",
            QuoteStatus::Enviado => "enviado",
            QuoteStatus::Aceito => "aceito",
            QuoteStatus::Rejeitado => "rejeitado",
            QuoteStatus::Expirado => "expirado",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: Uuid,
    #[schema(ignore)]
    pub unit_id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    #[sqlx(json)]
    pub items: Vec<LineItem>,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: QuoteStatus,
    pub public_token: Option<String>,
    pub decision_at: Option<DateTime<Utc>>,
    #[schema(example = "public")]
    pub decision_source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cópia imutável do orçamento, endereçada pelo token público.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuote {
    #[schema(example = "a8Kd02LmQz7Xv1Rt9bYc")]
    pub token: String,
    pub quote_id: Uuid,
    #[schema(ignore)]
    pub unit_id: Uuid,
    #[sqlx(json)]
    pub snapshot: Quote,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    pub customer_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    #[serde(default)]
    pub service_ids: Vec<Uuid>,
    #[schema(example = "50.00")]
    pub discount: Option<Decimal>,
    pub status: Option<QuoteStatus>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishedQuote {
    pub token: String,
    pub quote_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TokenQuery {
    pub token: Option<String>,
}
