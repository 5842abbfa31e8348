// privacy-backend/src/features/audit/models/audit_log.rs

use crate::utils::time;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub result: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub metadata: Option<Json>,
    pub old_values: Option<Json>,
    pub new_values: Option<Json>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

// 監査ログはユーザー削除後も残すため、users へのリレーションは張らない
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// resource_type の値
pub mod resource {
    pub const USER: &str = "user";
    pub const USER_CONSENT: &str = "user_consent";
    pub const DATA_EXPORT: &str = "data_export";
    pub const DATA_DELETION: &str = "data_deletion";
    pub const DATA_BACKUP: &str = "data_backup";
    pub const AUDIT_LOG: &str = "audit_log";
    pub const COMPLIANCE_REPORT: &str = "compliance_report";
}

// 監査アクションの定義
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AuditAction {
    Create,
    Read,
    Delete,
    Export,
    ConsentGranted,
    ConsentWithdrawn,

    // プライバシーワークフロー
    Restore,
    Anonymize,
    Verify,
    Cancel,
    Purge,

    // その他
    Custom(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Read => "read",
            AuditAction::Delete => "delete",
            AuditAction::Export => "export",
            AuditAction::ConsentGranted => "consent_granted",
            AuditAction::ConsentWithdrawn => "consent_withdrawn",
            AuditAction::Restore => "restore",
            AuditAction::Anonymize => "anonymize",
            AuditAction::Verify => "verify",
            AuditAction::Cancel => "cancel",
            AuditAction::Purge => "purge",
            AuditAction::Custom(action) => action,
        }
    }
}

// 監査結果の定義
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Failure,
    Partial,
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Success => "success",
            AuditResult::Failure => "failure",
            AuditResult::Partial => "partial",
        }
    }
}

/// 呼び出し元 (認証レイヤー) から渡されるリクエスト情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub session_id: Option<String>,
}

impl AuditContext {
    /// バックグラウンドジョブなどリクエストを伴わない操作用
    pub fn system() -> Self {
        Self::default()
    }

    pub fn with_client(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address,
            user_agent,
            ..Self::default()
        }
    }
}

// 監査ログエントリービルダー
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
    user_id: Option<Uuid>,
    session_id: Option<String>,
    action: AuditAction,
    resource_type: String,
    resource_id: Option<String>,
    result: AuditResult,
    ip_address: Option<String>,
    user_agent: Option<String>,
    request_id: Option<String>,
    metadata: Option<serde_json::Value>,
    old_values: Option<serde_json::Value>,
    new_values: Option<serde_json::Value>,
    error_message: Option<String>,
}

impl AuditLogBuilder {
    pub fn new(action: AuditAction, resource_type: impl Into<String>) -> Self {
        Self {
            user_id: None,
            session_id: None,
            action,
            resource_type: resource_type.into(),
            resource_id: None,
            result: AuditResult::Success,
            ip_address: None,
            user_agent: None,
            request_id: None,
            metadata: None,
            old_values: None,
            new_values: None,
            error_message: None,
        }
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn resource_id(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn result(mut self, result: AuditResult) -> Self {
        self.result = result;
        self
    }

    pub fn context(mut self, context: &AuditContext) -> Self {
        self.ip_address = context.ip_address.clone();
        self.user_agent = context.user_agent.clone();
        self.request_id = context.request_id.clone();
        self.session_id = context.session_id.clone();
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn old_values(mut self, values: serde_json::Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn new_values(mut self, values: serde_json::Value) -> Self {
        self.new_values = Some(values);
        self
    }

    /// 失敗として記録する
    pub fn failure(mut self, error_message: impl Into<String>) -> Self {
        self.result = AuditResult::Failure;
        self.error_message = Some(error_message.into());
        self
    }

    pub fn build(self) -> ActiveModel {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(self.user_id),
            session_id: Set(self.session_id),
            action: Set(self.action.as_str().to_string()),
            resource_type: Set(self.resource_type),
            resource_id: Set(self.resource_id),
            result: Set(self.result.as_str().to_string()),
            ip_address: Set(self.ip_address),
            user_agent: Set(self.user_agent),
            request_id: Set(self.request_id),
            metadata: Set(self.metadata),
            old_values: Set(self.old_values),
            new_values: Set(self.new_values),
            error_message: Set(self.error_message),
            created_at: Set(time::now()),
        }
    }
}
