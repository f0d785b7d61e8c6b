// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::orders::LineItem;

/// Serviço do catálogo (tabela de preços viva). As OS guardam cópias
/// (`LineItem`), nunca uma referência a este registro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogService {
    pub id: Uuid,
    #[schema(ignore)]
    pub unit_id: Uuid,
    #[schema(example = "Alinhamento")]
    pub name: String,
    #[schema(example = "80.00")]
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogService {
    pub fn snapshot(&self) -> LineItem {
        LineItem {
            service_id: self.id,
            name: self.name.clone(),
            price: self.price,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogServicePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Alinhamento")]
    pub name: String,
    #[schema(example = "80.00")]
    pub price: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
