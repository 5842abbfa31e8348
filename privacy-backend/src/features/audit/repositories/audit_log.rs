// privacy-backend/src/features/audit/repositories/audit_log.rs

use crate::features::audit::models::audit_log::{
    self, ActiveModel as AuditLogActiveModel, Entity as AuditLogEntity, Model as AuditLogModel,
};
use chrono::{DateTime, Utc};
use sea_orm::{entity::*, query::*, Condition, DbConn, DbErr};
use uuid::Uuid;

/// 監査ログ検索条件 (すべて AND 結合)
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub result: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl AuditLogFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(user_id) = self.user_id {
            condition = condition.add(audit_log::Column::UserId.eq(user_id));
        }
        if let Some(action) = &self.action {
            condition = condition.add(audit_log::Column::Action.eq(action.as_str()));
        }
        if let Some(resource_type) = &self.resource_type {
            condition = condition.add(audit_log::Column::ResourceType.eq(resource_type.as_str()));
        }
        if let Some(resource_id) = &self.resource_id {
            condition = condition.add(audit_log::Column::ResourceId.eq(resource_id.as_str()));
        }
        if let Some(result) = &self.result {
            condition = condition.add(audit_log::Column::Result.eq(result.as_str()));
        }
        if let Some(start) = self.start_date {
            condition = condition.add(audit_log::Column::CreatedAt.gte(start));
        }
        if let Some(end) = self.end_date {
            condition = condition.add(audit_log::Column::CreatedAt.lte(end));
        }
        condition
    }
}

#[derive(Clone)]
pub struct AuditLogRepository {
    db: DbConn,
}

impl AuditLogRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    // 監査ログの作成
    pub async fn create(&self, audit_log: AuditLogActiveModel) -> Result<AuditLogModel, DbErr> {
        audit_log.insert(&self.db).await
    }

    /// 条件に一致するログを新しい順に取得
    pub async fn find(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogModel>, DbErr> {
        let mut query = AuditLogEntity::find()
            .filter(filter.condition())
            .order_by_desc(audit_log::Column::CreatedAt)
            .order_by_desc(audit_log::Column::Id);

        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filter.offset {
            query = query.offset(offset);
        }

        query.all(&self.db).await
    }

    // 総件数を取得（ページネーションは無視）
    pub async fn count(&self, filter: &AuditLogFilter) -> Result<u64, DbErr> {
        AuditLogEntity::find()
            .filter(filter.condition())
            .count(&self.db)
            .await
    }

    /// 期間内の (action, resource_type, result) をすべて取得 (集計用)
    pub async fn find_actions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(String, String, String)>, DbErr> {
        AuditLogEntity::find()
            .select_only()
            .column(audit_log::Column::Action)
            .column(audit_log::Column::ResourceType)
            .column(audit_log::Column::Result)
            .filter(audit_log::Column::CreatedAt.gte(start))
            .filter(audit_log::Column::CreatedAt.lte(end))
            .into_tuple()
            .all(&self.db)
            .await
    }

    /// ユーザーの全ログ (バックアップ・エクスポート用、古い順)
    pub async fn find_all_by_user(&self, user_id: Uuid) -> Result<Vec<AuditLogModel>, DbErr> {
        AuditLogEntity::find()
            .filter(audit_log::Column::UserId.eq(user_id))
            .order_by_asc(audit_log::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditLogModel>, DbErr> {
        AuditLogEntity::find_by_id(id).one(&self.db).await
    }

    /// リストア用: 同じIDのログが無い場合だけ挿入する
    pub async fn insert_if_missing(&self, entry: AuditLogModel) -> Result<bool, DbErr> {
        if self.find_by_id(entry.id).await?.is_some() {
            return Ok(false);
        }
        let active: AuditLogActiveModel = entry.into();
        AuditLogEntity::insert(active.reset_all())
            .exec_without_returning(&self.db)
            .await?;
        Ok(true)
    }

    // 古いログの削除（保持期間を過ぎたもの）
    pub async fn delete_older_than(&self, before_date: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = AuditLogEntity::delete_many()
            .filter(audit_log::Column::CreatedAt.lt(before_date))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
