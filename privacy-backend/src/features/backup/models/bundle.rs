// privacy-backend/src/features/backup/models/bundle.rs

use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::Model as AuditLogModel;
use crate::features::consent::models::user_consent::Model as ConsentModel;
use crate::features::user::models::user::Model as UserModel;
use chrono::{DateTime, Utc};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use uuid::Uuid;

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// バックアップBLOBの中身 (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupBundle {
    pub format_version: u32,
    pub backup_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consents: Option<Vec<ConsentModel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_logs: Option<Vec<AuditLogModel>>,
}

impl BackupBundle {
    /// JSON 化し、level > 0 なら gzip 圧縮する
    pub fn encode(&self, compression_level: u32) -> AppResult<Vec<u8>> {
        let json = serde_json::to_vec(self).map_err(|e| {
            AppError::InternalServerError(format!("Failed to serialize backup: {}", e))
        })?;

        if compression_level == 0 {
            return Ok(json);
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(compression_level.min(9)));
        encoder.write_all(&json).map_err(|e| {
            AppError::InternalServerError(format!("Failed to compress backup: {}", e))
        })?;
        encoder.finish().map_err(|e| {
            AppError::InternalServerError(format!("Failed to compress backup: {}", e))
        })
    }

    pub fn decode(bytes: &[u8], compressed: bool) -> AppResult<Self> {
        let json = if compressed {
            let mut decoder = GzDecoder::new(bytes);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).map_err(|e| {
                AppError::IntegrityCheckFailed(format!("Backup payload is not valid gzip: {}", e))
            })?;
            out
        } else {
            bytes.to_vec()
        };

        serde_json::from_slice(&json).map_err(|e| {
            AppError::IntegrityCheckFailed(format!("Backup payload could not be decoded: {}", e))
        })
    }
}
