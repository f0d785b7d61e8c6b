// src/services/notification_service.rs

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::orders::{OrderStatus, ServiceOrder},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum Recipient {
    /// Todos os administradores da unidade.
    Admins(Uuid),
    User(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub order_id: Uuid,
    pub recipients: Vec<Recipient>,
}

/// Entrega de push. O provedor real fica fora deste serviço.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), AppError>;
}

/// Padrão: só escreve no log estruturado.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        tracing::info!(
            order_id = %notification.order_id,
            recipients = notification.recipients.len(),
            "🔔 {}: {}",
            notification.title,
            notification.body
        );
        Ok(())
    }
}

/// Guarda tudo o que foi enviado. Útil em testes e em ambiente local.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        self.sent
            .lock()
            .map_err(|_| AppError::StoreUnavailable("notificador indisponível".into()))?
            .push(notification.clone());
        Ok(())
    }
}

fn recipients_for(order: &ServiceOrder) -> Vec<Recipient> {
    let mut recipients = vec![Recipient::Admins(order.unit_id)];
    if let Some(assignee) = &order.assigned_to {
        recipients.push(Recipient::User(assignee.clone()));
    }
    recipients
}

#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Gatilho de mudança de status: só avisa ao entrar em
    /// `em_andamento` ou `concluido`.
    pub async fn order_status_changed(&self, previous: OrderStatus, order: &ServiceOrder) {
        if previous == order.status
            || !matches!(order.status, OrderStatus::EmAndamento | OrderStatus::Concluido)
        {
            return;
        }

        let notification = Notification {
            title: format!("OS {}", order.status),
            body: order.notes.clone(),
            order_id: order.id,
            recipients: recipients_for(order),
        };

        if let Err(e) = self.notifier.send(&notification).await {
            tracing::warn!("⚠️ Falha ao notificar mudança de status da OS {}: {}", order.id, e);
        }
    }

    /// Lembrete de agendamento. O erro volta para o job decidir o log.
    pub async fn order_reminder(&self, order: &ServiceOrder) -> Result<(), AppError> {
        let notification = Notification {
            title: "Lembrete de OS".to_string(),
            body: order.items.first().map(|i| i.name.clone()).unwrap_or_default(),
            order_id: order.id,
            recipients: recipients_for(order),
        };
        self.notifier.send(&notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::sample_order;

    #[tokio::test]
    async fn notifies_only_on_entry_into_progress_or_done() {
        let recorder = Arc::new(RecordingNotifier::default());
        let service = NotificationService::new(recorder.clone());

        let mut order = sample_order();
        order.notes = "Trocar pastilhas".into();
        order.assigned_to = Some("tec-1".into());

        order.status = OrderStatus::Cancelado;
        service.order_status_changed(OrderStatus::Novo, &order).await;
        assert!(recorder.sent().is_empty());

        order.status = OrderStatus::EmAndamento;
        service.order_status_changed(OrderStatus::EmAndamento, &order).await;
        assert!(recorder.sent().is_empty());

        service.order_status_changed(OrderStatus::Novo, &order).await;
        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "OS em_andamento");
        assert_eq!(sent[0].body, "Trocar pastilhas");
        assert_eq!(
            sent[0].recipients,
            vec![Recipient::Admins(order.unit_id), Recipient::User("tec-1".into())]
        );
    }

    #[tokio::test]
    async fn reminder_uses_first_item_name() {
        let recorder = Arc::new(RecordingNotifier::default());
        let service = NotificationService::new(recorder.clone());
        let order = sample_order();

        service.order_reminder(&order).await.unwrap();

        let sent = recorder.sent();
        assert_eq!(sent[0].title, "Lembrete de OS");
        assert_eq!(sent[0].body, order.items[0].name);
    }
}
