// src/models/payments.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Dinheiro,
    Cartao,
    Outro,
}

// Sub-razão da OS: pagamentos só são criados ou apagados, nunca editados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    #[schema(ignore)]
    pub unit_id: Uuid,
    pub order_id: Uuid,
    #[schema(example = "50.00")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentPayload {
    #[schema(example = "50.00")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub order_id: Uuid,
    #[schema(example = "120.00")]
    pub total: Decimal,
    #[schema(example = "100.00")]
    pub paid: Decimal,
    #[schema(example = "20.00")]
    pub open_balance: Decimal,
    pub payments: Vec<Payment>,
}
