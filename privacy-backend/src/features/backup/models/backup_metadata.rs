// privacy-backend/src/features/backup/models/backup_metadata.rs

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// バックアップ対象のデータ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupDataType {
    User,
    Consents,
    AuditLogs,
}

impl BackupDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupDataType::User => "user",
            BackupDataType::Consents => "consents",
            BackupDataType::AuditLogs => "audit_logs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(BackupDataType::User),
            "consents" => Some(BackupDataType::Consents),
            "audit_logs" => Some(BackupDataType::AuditLogs),
            _ => None,
        }
    }

    /// リストア順序 (ユーザーを先に戻す)
    pub fn all() -> [BackupDataType; 3] {
        [
            BackupDataType::User,
            BackupDataType::Consents,
            BackupDataType::AuditLogs,
        ]
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "backup_metadata")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub storage_key: String,
    pub size: i64,
    /// 保存されたBLOB (圧縮・暗号化後) の SHA-256
    pub checksum: String,
    pub encrypted: bool,
    pub compression_level: i32,
    pub data_types: Json,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn data_type_list(&self) -> Vec<BackupDataType> {
        self.data_types
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().and_then(BackupDataType::parse))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
