// tests/common/notifier.rs

use async_trait::async_trait;
use privacy_backend::error::AppResult;
use privacy_backend::infrastructure::notifier::{NotificationEvent, Notifier};
use serde_json::Value;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SentNotification {
    pub user_id: Uuid,
    pub event: NotificationEvent,
    pub payload: Value,
}

/// 送信内容を記録するだけの Notifier
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn events_for(&self, user_id: Uuid) -> Vec<NotificationEvent> {
        self.sent()
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.event)
            .collect()
    }

    /// 削除リクエストに対して送られた検証コード
    pub fn verification_code(&self, request_id: Uuid) -> Option<String> {
        self.sent().into_iter().find_map(|n| {
            let matches = n.event == NotificationEvent::DeletionVerificationRequired
                && n.payload["request_id"] == Value::String(request_id.to_string());
            if matches {
                n.payload["verification_code"].as_str().map(str::to_string)
            } else {
                None
            }
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: Uuid, event: NotificationEvent, payload: Value) -> AppResult<()> {
        self.sent.lock().unwrap().push(SentNotification {
            user_id,
            event,
            payload,
        });
        Ok(())
    }
}
