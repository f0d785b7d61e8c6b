// src/services/reminder_service.rs

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use crate::{
    common::error::AppError,
    db::OrderRepository,
    services::notification_service::NotificationService,
};

/// Job periódico de lembretes: OS com início nas próximas horas.
#[derive(Clone)]
pub struct ReminderService {
    orders: Arc<dyn OrderRepository>,
    notifications: NotificationService,
    window: Duration,
}

impl ReminderService {
    pub fn new(orders: Arc<dyn OrderRepository>, notifications: NotificationService, window: Duration) -> Self {
        Self { orders, notifications, window }
    }

    /// Uma rodada do job. Cada OS é reservada (flag condicional) antes do
    /// envio, então duas rodadas simultâneas não lembram a mesma OS.
    /// Retorna quantos lembretes saíram.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let due = self.orders.due_for_reminder(now, now + self.window).await?;
        let mut sent = 0;

        for order in due {
            let Some(start) = order.scheduled_start else { continue };

            if !self.orders.claim_reminder(order.id, start).await? {
                continue;
            }

            match self.notifications.order_reminder(&order).await {
                Ok(()) => sent += 1,
                Err(e) => tracing::warn!("⚠️ Lembrete da OS {} não entregue: {}", order.id, e),
            }
        }

        Ok(sent)
    }

    pub fn spawn(self, every: StdDuration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match self.run_once(Utc::now()).await {
                    Ok(0) => {}
                    Ok(sent) => tracing::info!("⏰ {} lembrete(s) de OS enviados", sent),
                    Err(e) => tracing::warn!("⚠️ Rodada de lembretes falhou: {}", e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::orders::{OrderPatch, OrderStatus};
    use crate::services::test_support::Harness;

    #[tokio::test]
    async fn reminds_each_scheduled_start_once() {
        let h = Harness::new().await;
        let now = Utc::now();
        let soon = h.scheduled_order(now + Duration::hours(3), None).await;
        let _far = h.scheduled_order(now + Duration::hours(30), None).await;
        let _past = h.scheduled_order(now - Duration::hours(1), None).await;

        let reminders = &h.services.reminders;
        assert_eq!(reminders.run_once(now).await.unwrap(), 1);
        assert_eq!(reminders.run_once(now).await.unwrap(), 0);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].order_id, soon.id);
        assert_eq!(sent[0].title, "Lembrete de OS");

        let stored = h.services.orders.get_order(&h.ctx, soon.id).await.unwrap();
        assert!(stored.notified_24h);
    }

    #[tokio::test]
    async fn rescheduling_arms_the_reminder_again() {
        let h = Harness::new().await;
        let now = Utc::now();
        let order = h.scheduled_order(now + Duration::hours(2), None).await;
        let reminders = &h.services.reminders;
        reminders.run_once(now).await.unwrap();

        let patch = OrderPatch { scheduled_start: Some(Some(now + Duration::hours(5))), ..Default::default() };
        h.services.orders.update_order(&h.ctx, order.id, &patch).await.unwrap();

        assert_eq!(reminders.run_once(now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn closed_orders_are_skipped() {
        let h = Harness::new().await;
        let now = Utc::now();
        let order = h.scheduled_order(now + Duration::hours(1), None).await;
        h.services.orders.set_status(&h.ctx, order.id, OrderStatus::Cancelado).await.unwrap();

        assert_eq!(h.services.reminders.run_once(now).await.unwrap(), 0);
    }
}
