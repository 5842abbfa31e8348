// tests/integration/backup/backup_retention_tests.rs

use crate::common::app_helper::{context, setup_app};
use crate::common::test_data::create_user;
use chrono::{Duration, Utc};
use privacy_backend::error::AppError;
use privacy_backend::features::backup::models::backup_metadata::ActiveModel as BackupActiveModel;
use privacy_backend::features::backup::services::backup::BackupConfig;
use sea_orm::{ActiveModelTrait, Set};

#[tokio::test]
async fn test_expired_backups_are_hidden_and_cleaned_up() {
    // Arrange
    let app = setup_app().await;
    let user = create_user(app.conn(), "alice").await;
    let backups = &app.state.backup_service;

    let kept = backups
        .create_backup(user.id, BackupConfig::default(), &context())
        .await
        .unwrap();
    let expired = backups
        .create_backup(user.id, BackupConfig::default(), &context())
        .await
        .unwrap();

    let mut active: BackupActiveModel = expired.clone().into();
    active.expires_at = Set(Utc::now() - Duration::hours(1));
    active.update(app.conn()).await.unwrap();

    // 期限切れは一覧にも取得にも出ない
    let listed = backups.list_user_backups(user.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, kept.id);
    let result = backups.get_backup(expired.id, user.id).await;
    assert!(matches!(result, Err(AppError::Expired(_))));

    // Act
    let cleanup = backups.cleanup_expired_backups().await.unwrap();

    // Assert
    assert_eq!(cleanup.deleted_count, 1);
    assert!(cleanup.errors.is_empty());
    assert_eq!(app.storage.len().await, 1);
    let result = backups.get_backup(expired.id, user.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(backups.get_backup(kept.id, user.id).await.is_ok());
}

#[tokio::test]
async fn test_retention_days_sets_expiry() {
    let app = setup_app().await;
    let user = create_user(app.conn(), "bob").await;

    let backup = app
        .state
        .backup_service
        .create_backup(
            user.id,
            BackupConfig {
                retention_days: Some(3),
                ..BackupConfig::default()
            },
            &context(),
        )
        .await
        .unwrap();

    assert_eq!(backup.expires_at - backup.created_at, Duration::days(3));
}

#[tokio::test]
async fn test_delete_backup_removes_blob_and_metadata() {
    let app = setup_app().await;
    let user = create_user(app.conn(), "carol").await;
    let backups = &app.state.backup_service;
    let backup = backups
        .create_backup(user.id, BackupConfig::default(), &context())
        .await
        .unwrap();

    backups
        .delete_backup(backup.id, user.id, &context())
        .await
        .unwrap();

    assert_eq!(app.storage.len().await, 0);
    assert!(backups.list_user_backups(user.id).await.unwrap().is_empty());
}
