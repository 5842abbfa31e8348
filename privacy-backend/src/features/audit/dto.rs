// privacy-backend/src/features/audit/dto.rs

use crate::features::audit::repositories::AuditLogFilter;
use crate::types::PaginationQuery;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// 監査ログ検索のクエリパラメータ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQuery {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub result: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl AuditLogQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn to_filter(&self) -> AuditLogFilter {
        let (limit, offset) = self.pagination().limit_offset();
        AuditLogFilter {
            user_id: self.user_id,
            action: self.action.clone(),
            resource_type: self.resource_type.clone(),
            resource_id: self.resource_id.clone(),
            result: self.result.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            limit: Some(limit),
            offset: Some(offset),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PurgeAuditLogsRequest {
    /// 未指定なら設定の保持期間
    #[validate(range(min = 1, message = "retention_days must be positive"))]
    pub retention_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeAuditLogsResponse {
    pub retention_days: i64,
    pub deleted_count: u64,
}
