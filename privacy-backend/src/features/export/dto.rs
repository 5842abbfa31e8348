// privacy-backend/src/features/export/dto.rs

use crate::features::export::models::data_export_request::{ExportFormat, ExportStatus, Model};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestExportRequest {
    pub format: ExportFormat,
    #[validate(length(min = 1, max = 20, message = "Request 1-20 data types"))]
    pub data_types: Vec<String>,
}

/// エクスポートリクエストの状態 (保存先パスは返さない)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub id: Uuid,
    pub status: ExportStatus,
    pub format: ExportFormat,
    pub data_types: Vec<String>,
    pub file_size: Option<i64>,
    pub download_url: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for ExportResponse {
    fn from(model: Model) -> Self {
        // 完了済み以外ではダウンロードURLを出さない
        let download_url = match model.status {
            ExportStatus::Completed => model.download_url.clone(),
            _ => None,
        };
        Self {
            data_types: model.data_type_list(),
            id: model.id,
            status: model.status,
            format: model.format,
            file_size: model.file_size,
            download_url,
            expires_at: model.expires_at,
            processed_at: model.processed_at,
            error_message: model.error_message,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedDataTypesResponse {
    pub data_types: Vec<String>,
    pub formats: Vec<ExportFormat>,
}
