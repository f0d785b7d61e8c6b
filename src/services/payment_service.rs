// src/services/payment_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{OrderRepository, PaymentRepository},
    models::{
        auth::RequestContext,
        payments::{AddPaymentPayload, Payment, PaymentSummary},
    },
};

pub fn paid_total(payments: &[Payment]) -> Decimal {
    payments.iter().map(|p| p.amount).sum()
}

/// Saldo em aberto nunca fica negativo (pagamento a maior não gera crédito).
pub fn open_balance(total: Decimal, payments: &[Payment]) -> Decimal {
    (total - paid_total(payments)).max(Decimal::ZERO)
}

/// Razão de pagamentos da OS. Não mexe no status: quitar não encerra a OS.
#[derive(Clone)]
pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl PaymentService {
    pub fn new(payments: Arc<dyn PaymentRepository>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { payments, orders }
    }

    pub async fn add_payment(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        payload: AddPaymentPayload,
    ) -> Result<Payment, AppError> {
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("payment_amount_not_positive"));
        }
        self.orders
            .get(ctx.unit_id, order_id)
            .await?
            .ok_or(AppError::NotFound("order_not_found"))?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            unit_id: ctx.unit_id,
            order_id,
            amount: payload.amount,
            method: payload.method,
            paid_at: payload.paid_at.unwrap_or(now),
            created_at: now,
        };
        if !self.payments.insert(&payment).await? {
            return Err(AppError::NotFound("order_not_found"));
        }

        tracing::info!("💰 Pagamento de {} registrado na OS {}", payment.amount, order_id);
        Ok(payment)
    }

    pub async fn list_payments(&self, ctx: &RequestContext, order_id: Uuid) -> Result<Vec<Payment>, AppError> {
        self.payments.list_for_order(ctx.unit_id, order_id).await
    }

    pub async fn delete_payment(&self, ctx: &RequestContext, order_id: Uuid, payment_id: Uuid) -> Result<(), AppError> {
        if !self.payments.delete(ctx.unit_id, order_id, payment_id).await? {
            return Err(AppError::NotFound("payment_not_found"));
        }
        Ok(())
    }

    pub async fn summary(&self, ctx: &RequestContext, order_id: Uuid) -> Result<PaymentSummary, AppError> {
        let order = self
            .orders
            .get(ctx.unit_id, order_id)
            .await?
            .ok_or(AppError::NotFound("order_not_found"))?;
        let payments = self.payments.list_for_order(ctx.unit_id, order_id).await?;

        Ok(PaymentSummary {
            order_id,
            total: order.total,
            paid: paid_total(&payments),
            open_balance: open_balance(order.total, &payments),
            payments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{orders::OrderStatus, payments::PaymentMethod};
    use crate::services::test_support::{at, Harness};

    fn pay(amount: i64) -> AddPaymentPayload {
        AddPaymentPayload { amount: Decimal::from(amount), method: PaymentMethod::Pix, paid_at: None }
    }

    #[tokio::test]
    async fn open_balance_follows_payments_and_clamps() {
        let h = Harness::new().await;
        let order = h.order_totalling(120).await;
        let ledger = &h.services.payments;

        ledger.add_payment(&h.ctx, order.id, pay(50)).await.unwrap();
        ledger.add_payment(&h.ctx, order.id, pay(50)).await.unwrap();
        let summary = ledger.summary(&h.ctx, order.id).await.unwrap();
        assert_eq!(summary.paid, Decimal::from(100));
        assert_eq!(summary.open_balance, Decimal::from(20));

        ledger.add_payment(&h.ctx, order.id, pay(30)).await.unwrap();
        let summary = ledger.summary(&h.ctx, order.id).await.unwrap();
        assert_eq!(summary.open_balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn full_payment_does_not_close_the_order() {
        let h = Harness::new().await;
        let order = h.order_totalling(120).await;

        h.services.payments.add_payment(&h.ctx, order.id, pay(120)).await.unwrap();

        let after = h.services.orders.get_order(&h.ctx, order.id).await.unwrap();
        assert_eq!(after.status, OrderStatus::Novo);
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts_and_unknown_orders() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;

        let err = h.services.payments.add_payment(&h.ctx, order.id, pay(0)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput("payment_amount_not_positive")));

        let err = h.services.payments.add_payment(&h.ctx, Uuid::new_v4(), pay(10)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("order_not_found")));
    }

    #[tokio::test]
    async fn payments_are_listed_by_paid_at_and_can_be_removed() {
        let h = Harness::new().await;
        let order = h.scheduled_order(at(9, 0), None).await;
        let ledger = &h.services.payments;

        let late = AddPaymentPayload { paid_at: Some(at(18, 0)), ..pay(10) };
        let early = AddPaymentPayload { paid_at: Some(at(8, 0)), ..pay(20) };
        let late = ledger.add_payment(&h.ctx, order.id, late).await.unwrap();
        ledger.add_payment(&h.ctx, order.id, early).await.unwrap();

        let listed = ledger.list_payments(&h.ctx, order.id).await.unwrap();
        assert_eq!(listed[0].amount, Decimal::from(20));

        ledger.delete_payment(&h.ctx, order.id, late.id).await.unwrap();
        let err = ledger.delete_payment(&h.ctx, order.id, late.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("payment_not_found")));
    }
}
