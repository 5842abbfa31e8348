// privacy-backend/src/features/deletion/repositories/data_deletion_request.rs

use crate::features::deletion::models::data_deletion_request::{
    self, ActiveModel as DeletionActiveModel, DeletionStatus, Entity as DeletionEntity,
    Model as DeletionModel,
};
use crate::utils::time;
use chrono::{DateTime, Utc};
use sea_orm::{entity::*, query::*, DbConn, DbErr, Set};
use uuid::Uuid;

#[derive(Clone)]
pub struct DataDeletionRequestRepository {
    db: DbConn,
}

impl DataDeletionRequestRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    pub async fn create(&self, request: DeletionActiveModel) -> Result<DeletionModel, DbErr> {
        request.insert(&self.db).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<DeletionModel>, DbErr> {
        DeletionEntity::find_by_id(id).one(&self.db).await
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<DeletionModel>, DbErr> {
        DeletionEntity::find()
            .filter(data_deletion_request::Column::UserId.eq(user_id))
            .order_by_desc(data_deletion_request::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// 未検証の pending にだけ verified_at を設定する
    pub async fn mark_verified(&self, id: Uuid, verified_at: DateTime<Utc>) -> Result<bool, DbErr> {
        let result = DeletionEntity::update_many()
            .set(DeletionActiveModel {
                verified_at: Set(Some(verified_at)),
                updated_at: Set(verified_at),
                ..Default::default()
            })
            .filter(data_deletion_request::Column::Id.eq(id))
            .filter(data_deletion_request::Column::Status.eq(DeletionStatus::Pending))
            .filter(data_deletion_request::Column::VerifiedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// pending かつ検証済みのものだけを processing に遷移させる
    pub async fn claim_verified(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = DeletionEntity::update_many()
            .set(DeletionActiveModel {
                status: Set(DeletionStatus::Processing),
                updated_at: Set(time::now()),
                ..Default::default()
            })
            .filter(data_deletion_request::Column::Id.eq(id))
            .filter(data_deletion_request::Column::Status.eq(DeletionStatus::Pending))
            .filter(data_deletion_request::Column::VerifiedAt.is_not_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    pub async fn cancel(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = DeletionEntity::update_many()
            .set(DeletionActiveModel {
                status: Set(DeletionStatus::Cancelled),
                updated_at: Set(time::now()),
                ..Default::default()
            })
            .filter(data_deletion_request::Column::Id.eq(id))
            .filter(data_deletion_request::Column::Status.eq(DeletionStatus::Pending))
            .filter(data_deletion_request::Column::VerifiedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// 破壊的処理の前にバックアップIDを記録する
    pub async fn set_backup_reference(&self, id: Uuid, backup_id: Uuid) -> Result<(), DbErr> {
        DeletionEntity::update_many()
            .set(DeletionActiveModel {
                backup_reference: Set(Some(backup_id)),
                updated_at: Set(time::now()),
                ..Default::default()
            })
            .filter(data_deletion_request::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn mark_completed(&self, id: Uuid) -> Result<bool, DbErr> {
        let now = time::now();
        let result = DeletionEntity::update_many()
            .set(DeletionActiveModel {
                status: Set(DeletionStatus::Completed),
                processed_at: Set(Some(now)),
                error_message: Set(None),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(data_deletion_request::Column::Id.eq(id))
            .filter(data_deletion_request::Column::Status.eq(DeletionStatus::Processing))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    pub async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<bool, DbErr> {
        let now = time::now();
        let result = DeletionEntity::update_many()
            .set(DeletionActiveModel {
                status: Set(DeletionStatus::Failed),
                processed_at: Set(Some(now)),
                error_message: Set(Some(error_message.to_string())),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(data_deletion_request::Column::Id.eq(id))
            .filter(data_deletion_request::Column::Status.eq(DeletionStatus::Processing))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// 検証済みで処理待ちのもの (起動時の再投入用)
    pub async fn find_ready(&self) -> Result<Vec<DeletionModel>, DbErr> {
        DeletionEntity::find()
            .filter(data_deletion_request::Column::Status.eq(DeletionStatus::Pending))
            .filter(data_deletion_request::Column::VerifiedAt.is_not_null())
            .order_by_asc(data_deletion_request::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// claimed_before 以前に processing になったまま残っているものを pending に戻す
    pub async fn release_processing(&self, claimed_before: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = DeletionEntity::update_many()
            .set(DeletionActiveModel {
                status: Set(DeletionStatus::Pending),
                updated_at: Set(time::now()),
                ..Default::default()
            })
            .filter(data_deletion_request::Column::Status.eq(DeletionStatus::Processing))
            .filter(data_deletion_request::Column::UpdatedAt.lte(claimed_before))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// 期間内に作成されたリクエスト (レポート集計用)
    pub async fn find_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DeletionModel>, DbErr> {
        DeletionEntity::find()
            .filter(data_deletion_request::Column::CreatedAt.gte(start))
            .filter(data_deletion_request::Column::CreatedAt.lte(end))
            .all(&self.db)
            .await
    }
}
