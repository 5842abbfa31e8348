// privacy-backend/src/features/backup/repositories/backup_metadata.rs

use crate::features::backup::models::backup_metadata::{
    self, ActiveModel as BackupActiveModel, Entity as BackupEntity, Model as BackupModel,
};
use chrono::{DateTime, Utc};
use sea_orm::{entity::*, query::*, DbConn, DbErr};
use uuid::Uuid;

#[derive(Clone)]
pub struct BackupMetadataRepository {
    db: DbConn,
}

impl BackupMetadataRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    pub async fn create(&self, backup: BackupActiveModel) -> Result<BackupModel, DbErr> {
        backup.insert(&self.db).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<BackupModel>, DbErr> {
        BackupEntity::find_by_id(id).one(&self.db).await
    }

    /// 期限内のバックアップを新しい順に取得
    pub async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<BackupModel>, DbErr> {
        BackupEntity::find()
            .filter(backup_metadata::Column::UserId.eq(user_id))
            .filter(backup_metadata::Column::ExpiresAt.gte(now))
            .order_by_desc(backup_metadata::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    pub async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<BackupModel>, DbErr> {
        BackupEntity::find()
            .filter(backup_metadata::Column::ExpiresAt.lt(now))
            .all(&self.db)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64, DbErr> {
        let result = BackupEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}
