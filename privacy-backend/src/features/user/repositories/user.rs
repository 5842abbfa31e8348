// privacy-backend/src/features/user/repositories/user.rs

use crate::features::user::models::user::{
    self, ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel,
};
use crate::utils::time;
use sea_orm::{entity::*, sea_query::OnConflict, DbConn, DbErr, Set};
use serde::Deserialize;
use uuid::Uuid;

/// ユーザー作成用の入力
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub website_url: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_handle: Option<String>,
    pub preferences: Option<serde_json::Value>,
    pub problems_solved: i32,
    pub contest_rating: i32,
}

#[derive(Clone)]
pub struct UserRepository {
    db: DbConn,
}

impl UserRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, DbErr> {
        UserEntity::find_by_id(id).one(&self.db).await
    }

    pub async fn create(&self, new_user: NewUser) -> Result<UserModel, DbErr> {
        let now = time::now();
        let active = UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(new_user.email),
            username: Set(new_user.username),
            display_name: Set(new_user.display_name),
            bio: Set(new_user.bio),
            location: Set(new_user.location),
            company: Set(new_user.company),
            job_title: Set(new_user.job_title),
            website_url: Set(new_user.website_url),
            github_url: Set(new_user.github_url),
            linkedin_url: Set(new_user.linkedin_url),
            twitter_handle: Set(new_user.twitter_handle),
            preferences: Set(new_user.preferences),
            problems_solved: Set(new_user.problems_solved),
            contest_rating: Set(new_user.contest_rating),
            created_at: Set(now),
            updated_at: Set(now),
        };
        active.insert(&self.db).await
    }

    pub async fn update(&self, active: UserActiveModel) -> Result<UserModel, DbErr> {
        active.update(&self.db).await
    }

    /// バックアップからのリストア: 同じIDがあれば全カラムを上書き
    pub async fn upsert(&self, model: UserModel) -> Result<(), DbErr> {
        let active: UserActiveModel = model.into();
        UserEntity::insert(active.reset_all())
            .on_conflict(
                OnConflict::column(user::Column::Id)
                    .update_columns([
                        user::Column::Email,
                        user::Column::Username,
                        user::Column::DisplayName,
                        user::Column::Bio,
                        user::Column::Location,
                        user::Column::Company,
                        user::Column::JobTitle,
                        user::Column::WebsiteUrl,
                        user::Column::GithubUrl,
                        user::Column::LinkedinUrl,
                        user::Column::TwitterHandle,
                        user::Column::Preferences,
                        user::Column::ProblemsSolved,
                        user::Column::ContestRating,
                        user::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64, DbErr> {
        let result = UserEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}
