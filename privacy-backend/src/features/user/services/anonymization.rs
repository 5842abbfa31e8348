// privacy-backend/src/features/user/services/anonymization.rs

use crate::error::{AppError, AppResult};
use crate::features::user::models::user::{ActiveModel as UserActiveModel, Model as UserModel};
use crate::features::user::repositories::user::UserRepository;
use crate::infrastructure::crypto::anonymization_hash;
use crate::utils::time;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{DatabaseConnection, Set};
use serde::Serialize;
use uuid::Uuid;

pub const ANONYMIZED_DISPLAY_NAME: &str = "Anonymized User";

static ANONYMIZED_EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^anonymized_[0-9a-f]{16}@anonymized\.local$").expect("Invalid email regex")
});

static ANONYMIZED_USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^anonymized_user_[0-9a-f]{16}$").expect("Invalid username regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnonymizedIdentity {
    pub email: String,
    pub username: String,
}

impl AnonymizedIdentity {
    /// ユーザーIDの一方向ハッシュから決定的に生成
    pub fn for_user(user_id: Uuid) -> Self {
        let hash = anonymization_hash(user_id);
        Self {
            email: format!("anonymized_{}@anonymized.local", hash),
            username: format!("anonymized_user_{}", hash),
        }
    }
}

/// email と username の両方が匿名化パターンに一致すれば匿名化済み
pub fn is_anonymized_profile(user: &UserModel) -> bool {
    ANONYMIZED_EMAIL_REGEX.is_match(&user.email)
        && ANONYMIZED_USERNAME_REGEX.is_match(&user.username)
}

#[derive(Clone)]
pub struct AnonymizationService {
    user_repository: UserRepository,
}

impl AnonymizationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            user_repository: UserRepository::new(db),
        }
    }

    pub async fn is_user_anonymized(&self, user_id: Uuid) -> AppResult<bool> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(is_anonymized_profile(&user))
    }

    /// PII を匿名化する。既に匿名化済みなら何もせずに現在の値を返す
    pub async fn anonymize_user(&self, user_id: Uuid) -> AppResult<UserModel> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if is_anonymized_profile(&user) {
            tracing::info!(user_id = %user_id, "User already anonymized, skipping");
            return Ok(user);
        }

        let identity = AnonymizedIdentity::for_user(user_id);
        let mut active: UserActiveModel = user.into();
        active.email = Set(identity.email);
        active.username = Set(identity.username);
        active.display_name = Set(Some(ANONYMIZED_DISPLAY_NAME.to_string()));
        active.bio = Set(None);
        active.location = Set(None);
        active.company = Set(None);
        active.job_title = Set(None);
        active.website_url = Set(None);
        active.github_url = Set(None);
        active.linkedin_url = Set(None);
        active.twitter_handle = Set(None);
        active.updated_at = Set(time::now());

        let updated = self.user_repository.update(active).await?;
        tracing::info!(user_id = %user_id, "User anonymized");
        Ok(updated)
    }
}
