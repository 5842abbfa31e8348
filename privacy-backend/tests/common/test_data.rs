// tests/common/test_data.rs

use privacy_backend::features::user::models::user::Model as UserModel;
use privacy_backend::features::user::repositories::{NewUser, UserRepository};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

pub fn new_user(name: &str) -> NewUser {
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    NewUser {
        email: format!("{}_{}@example.com", name, suffix),
        username: format!("{}_{}", name, suffix),
        display_name: Some(format!("{} Example", name)),
        bio: Some("Competitive programmer".to_string()),
        location: Some("Tokyo".to_string()),
        company: Some("Example Inc.".to_string()),
        job_title: Some("Engineer".to_string()),
        website_url: Some("https://example.com".to_string()),
        github_url: Some(format!("https://github.com/{}", name)),
        linkedin_url: None,
        twitter_handle: Some(format!("@{}", name)),
        preferences: Some(serde_json::json!({ "theme": "dark" })),
        problems_solved: 42,
        contest_rating: 1500,
    }
}

pub async fn create_user(db: &DatabaseConnection, name: &str) -> UserModel {
    UserRepository::new(db.clone())
        .create(new_user(name))
        .await
        .unwrap()
}
