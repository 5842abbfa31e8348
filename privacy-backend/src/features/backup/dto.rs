// privacy-backend/src/features/backup/dto.rs

use crate::features::backup::models::backup_metadata::{BackupDataType, Model};
use crate::features::backup::services::{BackupConfig, RestoreOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// バックアップ作成リクエスト (管理者向け)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBackupRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub include_audit_logs: Option<bool>,
    #[serde(default)]
    pub include_user_data: Option<bool>,
    #[serde(default)]
    pub include_consents: Option<bool>,
    #[serde(default)]
    pub encrypt_backup: Option<bool>,
    #[validate(range(max = 9, message = "compression_level must be 0-9"))]
    pub compression_level: Option<u32>,
    #[validate(range(min = 1, max = 3650, message = "retention_days must be 1-3650"))]
    pub retention_days: Option<i64>,
}

impl CreateBackupRequest {
    /// 未指定の項目は既定値
    pub fn to_config(&self) -> BackupConfig {
        let defaults = BackupConfig::default();
        BackupConfig {
            include_audit_logs: self
                .include_audit_logs
                .unwrap_or(defaults.include_audit_logs),
            include_user_data: self.include_user_data.unwrap_or(defaults.include_user_data),
            include_consents: self.include_consents.unwrap_or(defaults.include_consents),
            encrypt_backup: self.encrypt_backup.unwrap_or(defaults.encrypt_backup),
            compression_level: self.compression_level.unwrap_or(defaults.compression_level),
            retention_days: self.retention_days,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreBackupRequest {
    pub user_id: Uuid,
    pub backup_id: Uuid,
    pub data_types: Option<Vec<BackupDataType>>,
    #[serde(default = "default_true")]
    pub verify_integrity: bool,
    #[serde(default = "default_true")]
    pub create_audit_log: bool,
}

fn default_true() -> bool {
    true
}

impl From<&RestoreBackupRequest> for RestoreOptions {
    fn from(request: &RestoreBackupRequest) -> Self {
        Self {
            backup_id: request.backup_id,
            data_types: request.data_types.clone(),
            verify_integrity: request.verify_integrity,
            create_audit_log: request.create_audit_log,
        }
    }
}

/// バックアップメタデータ (ストレージキーは返さない)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub size: i64,
    pub checksum: String,
    pub encrypted: bool,
    pub compression_level: i32,
    pub data_types: Vec<BackupDataType>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for BackupResponse {
    fn from(model: Model) -> Self {
        Self {
            data_types: model.data_type_list(),
            id: model.id,
            user_id: model.user_id,
            size: model.size,
            checksum: model.checksum,
            encrypted: model.encrypted,
            compression_level: model.compression_level,
            expires_at: model.expires_at,
            created_at: model.created_at,
        }
    }
}
