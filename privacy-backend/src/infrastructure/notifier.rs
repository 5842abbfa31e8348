// privacy-backend/src/infrastructure/notifier.rs

use crate::error::AppResult;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    ExportReady,
    ExportFailed,
    /// payload に verification_code を含む
    DeletionVerificationRequired,
    DeletionCompleted,
    DeletionFailed,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::ExportReady => "export_ready",
            NotificationEvent::ExportFailed => "export_failed",
            NotificationEvent::DeletionVerificationRequired => "deletion_verification_required",
            NotificationEvent::DeletionCompleted => "deletion_completed",
            NotificationEvent::DeletionFailed => "deletion_failed",
        }
    }
}

/// ユーザーへの通知 (メール送信などは外部実装)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        event: NotificationEvent,
        payload: serde_json::Value,
    ) -> AppResult<()>;
}

/// 通知内容をログに出すだけの実装。payload の値は出さない
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(
        &self,
        user_id: Uuid,
        event: NotificationEvent,
        payload: serde_json::Value,
    ) -> AppResult<()> {
        let fields: Vec<&str> = payload
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default();

        tracing::info!(
            user_id = %user_id,
            event = event.as_str(),
            payload_fields = ?fields,
            "User notification dispatched"
        );
        Ok(())
    }
}
