// privacy-backend/src/features/export/repositories/data_export_request.rs

use crate::features::export::models::data_export_request::{
    self, ActiveModel as ExportActiveModel, Entity as ExportEntity, ExportStatus,
    Model as ExportModel,
};
use crate::utils::time;
use chrono::{DateTime, Utc};
use sea_orm::{entity::*, query::*, DbConn, DbErr, Set};
use uuid::Uuid;

/// 生成済みファイルの情報
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_path: String,
    pub file_size: i64,
    pub download_url: String,
}

#[derive(Clone)]
pub struct DataExportRequestRepository {
    db: DbConn,
}

impl DataExportRequestRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    pub async fn create(&self, request: ExportActiveModel) -> Result<ExportModel, DbErr> {
        request.insert(&self.db).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ExportModel>, DbErr> {
        ExportEntity::find_by_id(id).one(&self.db).await
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ExportModel>, DbErr> {
        ExportEntity::find()
            .filter(data_export_request::Column::UserId.eq(user_id))
            .order_by_desc(data_export_request::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// pending → processing を条件付き UPDATE で一度だけ行う。取得できたら true
    pub async fn claim_pending(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = ExportEntity::update_many()
            .set(ExportActiveModel {
                status: Set(ExportStatus::Processing),
                updated_at: Set(time::now()),
                ..Default::default()
            })
            .filter(data_export_request::Column::Id.eq(id))
            .filter(data_export_request::Column::Status.eq(ExportStatus::Pending))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// processing → completed
    pub async fn mark_completed(&self, id: Uuid, artifact: &ExportArtifact) -> Result<bool, DbErr> {
        let now = time::now();
        let result = ExportEntity::update_many()
            .set(ExportActiveModel {
                status: Set(ExportStatus::Completed),
                file_path: Set(Some(artifact.file_path.clone())),
                file_size: Set(Some(artifact.file_size)),
                download_url: Set(Some(artifact.download_url.clone())),
                processed_at: Set(Some(now)),
                error_message: Set(None),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(data_export_request::Column::Id.eq(id))
            .filter(data_export_request::Column::Status.eq(ExportStatus::Processing))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// processing → failed
    pub async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<bool, DbErr> {
        let now = time::now();
        let result = ExportEntity::update_many()
            .set(ExportActiveModel {
                status: Set(ExportStatus::Failed),
                processed_at: Set(Some(now)),
                error_message: Set(Some(error_message.to_string())),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(data_export_request::Column::Id.eq(id))
            .filter(data_export_request::Column::Status.eq(ExportStatus::Processing))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// 期限切れだがまだ expired になっていないもの。処理中のものはワーカーに任せる
    pub async fn find_stale(&self, now: DateTime<Utc>) -> Result<Vec<ExportModel>, DbErr> {
        ExportEntity::find()
            .filter(data_export_request::Column::ExpiresAt.lt(now))
            .filter(
                data_export_request::Column::Status
                    .is_not_in([ExportStatus::Expired, ExportStatus::Processing]),
            )
            .all(&self.db)
            .await
    }

    pub async fn find_pending(&self) -> Result<Vec<ExportModel>, DbErr> {
        ExportEntity::find()
            .filter(data_export_request::Column::Status.eq(ExportStatus::Pending))
            .order_by_asc(data_export_request::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// claimed_before 以前に processing になったまま残っているものを pending に戻す
    pub async fn release_processing(&self, claimed_before: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = ExportEntity::update_many()
            .set(ExportActiveModel {
                status: Set(ExportStatus::Pending),
                updated_at: Set(time::now()),
                ..Default::default()
            })
            .filter(data_export_request::Column::Status.eq(ExportStatus::Processing))
            .filter(data_export_request::Column::UpdatedAt.lte(claimed_before))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn mark_expired(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = ExportEntity::update_many()
            .set(ExportActiveModel {
                status: Set(ExportStatus::Expired),
                file_path: Set(None),
                download_url: Set(None),
                updated_at: Set(time::now()),
                ..Default::default()
            })
            .filter(data_export_request::Column::Id.eq(id))
            .filter(
                data_export_request::Column::Status
                    .is_not_in([ExportStatus::Expired, ExportStatus::Processing]),
            )
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// 期間内に作成されたリクエスト (レポート集計用)
    pub async fn find_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExportModel>, DbErr> {
        ExportEntity::find()
            .filter(data_export_request::Column::CreatedAt.gte(start))
            .filter(data_export_request::Column::CreatedAt.lte(end))
            .all(&self.db)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64, DbErr> {
        let result = ExportEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        let result = ExportEntity::delete_many()
            .filter(data_export_request::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
