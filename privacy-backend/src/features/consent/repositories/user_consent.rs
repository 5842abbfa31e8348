// privacy-backend/src/features/consent/repositories/user_consent.rs

use crate::features::consent::models::user_consent::{
    self, ActiveModel as ConsentActiveModel, ConsentType, Entity as ConsentEntity,
    Model as ConsentModel,
};
use crate::features::user::models::user::Entity as UserEntity;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{entity::*, query::*, DbConn, DbErr, Set, TransactionTrait};
use uuid::Uuid;

#[derive(Clone)]
pub struct UserConsentRepository {
    db: DbConn,
}

impl UserConsentRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    pub async fn create(&self, consent: ConsentActiveModel) -> Result<ConsentModel, DbErr> {
        consent.insert(&self.db).await
    }

    /// 同一ユーザーの直前のレコードより必ず後の created_at で追記する。
    /// 読み取りと挿入は同じトランザクション内で、ユーザー行のロックで直列化する
    pub async fn append(
        &self,
        user_id: Uuid,
        mut consent: ConsentActiveModel,
        now: DateTime<Utc>,
    ) -> Result<ConsentModel, DbErr> {
        let txn = self.db.begin().await?;

        UserEntity::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await?;
        let latest = ConsentEntity::find()
            .filter(user_consent::Column::UserId.eq(user_id))
            .order_by_desc(user_consent::Column::CreatedAt)
            .order_by_desc(user_consent::Column::Id)
            .one(&txn)
            .await?;

        let created_at = match latest {
            Some(previous) if previous.created_at >= now => {
                previous.created_at + Duration::microseconds(1)
            }
            _ => now,
        };
        consent.user_id = Set(user_id);
        consent.created_at = Set(created_at);
        let model = consent.insert(&txn).await?;

        txn.commit().await?;
        Ok(model)
    }

    /// (user, type) の最新レコード = 有効な同意
    pub async fn find_latest(
        &self,
        user_id: Uuid,
        consent_type: ConsentType,
    ) -> Result<Option<ConsentModel>, DbErr> {
        ConsentEntity::find()
            .filter(user_consent::Column::UserId.eq(user_id))
            .filter(user_consent::Column::ConsentType.eq(consent_type))
            .order_by_desc(user_consent::Column::CreatedAt)
            .order_by_desc(user_consent::Column::Id)
            .one(&self.db)
            .await
    }

    // 新しい順
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ConsentModel>, DbErr> {
        ConsentEntity::find()
            .filter(user_consent::Column::UserId.eq(user_id))
            .order_by_desc(user_consent::Column::CreatedAt)
            .order_by_desc(user_consent::Column::Id)
            .all(&self.db)
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ConsentModel>, DbErr> {
        ConsentEntity::find_by_id(id).one(&self.db).await
    }

    /// リストア用: 同じIDのレコードが無い場合だけ挿入する
    pub async fn insert_if_missing(&self, consent: ConsentModel) -> Result<bool, DbErr> {
        if self.find_by_id(consent.id).await?.is_some() {
            return Ok(false);
        }
        let active: ConsentActiveModel = consent.into();
        ConsentEntity::insert(active.reset_all())
            .exec_without_returning(&self.db)
            .await?;
        Ok(true)
    }

    /// 期間内に作成されたレコード (レポート集計用)
    pub async fn find_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ConsentModel>, DbErr> {
        ConsentEntity::find()
            .filter(user_consent::Column::CreatedAt.gte(start))
            .filter(user_consent::Column::CreatedAt.lte(end))
            .all(&self.db)
            .await
    }

    pub async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        let result = ConsentEntity::delete_many()
            .filter(user_consent::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
