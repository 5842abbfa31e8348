// privacy-backend/src/features/audit/services/audit_log.rs

use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::{
    resource, AuditAction, AuditLogBuilder, Model as AuditLogModel,
};
use crate::features::audit::repositories::audit_log::{AuditLogFilter, AuditLogRepository};
use crate::utils::time;
use chrono::Duration;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

pub const MAX_QUERY_LIMIT: u64 = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct AuditQueryResult {
    pub entries: Vec<AuditLogModel>,
    pub total: u64,
}

/// 追記専用の監査ログストア
#[derive(Clone)]
pub struct AuditLogService {
    repository: AuditLogRepository,
}

impl AuditLogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            repository: AuditLogRepository::new(db),
        }
    }

    pub fn repository(&self) -> &AuditLogRepository {
        &self.repository
    }

    pub async fn log(&self, entry: AuditLogBuilder) -> AppResult<AuditLogModel> {
        let created = self.repository.create(entry.build()).await?;
        tracing::debug!(
            audit_id = %created.id,
            action = %created.action,
            resource_type = %created.resource_type,
            result = %created.result,
            "Audit entry recorded"
        );
        Ok(created)
    }

    /// ワーカーの失敗経路など、記録に失敗しても処理を続ける箇所で使う
    pub async fn log_best_effort(&self, entry: AuditLogBuilder) {
        if let Err(e) = self.repository.create(entry.build()).await {
            error!(error = %e, "Failed to write audit entry");
        }
    }

    pub async fn query(&self, filter: AuditLogFilter) -> AppResult<AuditQueryResult> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(AppError::ValidationError(
                    "start_date must not be after end_date".to_string(),
                ));
            }
        }

        let mut filter = filter;
        filter.limit = Some(filter.limit.unwrap_or(100).min(MAX_QUERY_LIMIT));

        let entries = self.repository.find(&filter).await?;
        let total = self.repository.count(&filter).await?;

        Ok(AuditQueryResult { entries, total })
    }

    pub async fn get_user_activity(
        &self,
        user_id: Uuid,
        limit: u64,
    ) -> AppResult<Vec<AuditLogModel>> {
        let filter = AuditLogFilter {
            limit: Some(limit.min(MAX_QUERY_LIMIT)),
            ..AuditLogFilter::for_user(user_id)
        };
        Ok(self.repository.find(&filter).await?)
    }

    /// 保持期間を過ぎたログを一括削除
    pub async fn purge_older_than(&self, retention_days: i64) -> AppResult<u64> {
        if retention_days <= 0 {
            return Err(AppError::ValidationError(
                "retention_days must be positive".to_string(),
            ));
        }

        let cutoff = time::now() - Duration::days(retention_days);
        let deleted = self.repository.delete_older_than(cutoff).await?;

        info!(
            retention_days = retention_days,
            cutoff = %cutoff,
            deleted_count = deleted,
            "Audit log retention purge completed"
        );

        self.log_best_effort(
            AuditLogBuilder::new(AuditAction::Purge, resource::AUDIT_LOG).metadata(json!({
                "retention_days": retention_days,
                "cutoff": cutoff,
                "deleted_count": deleted,
            })),
        )
        .await;

        Ok(deleted)
    }
}
