// tests/integration/deletion/verification_tests.rs

use crate::common::app_helper::{context, setup_app, TestApp};
use crate::common::test_data::create_user;
use chrono::{Duration, Utc};
use privacy_backend::error::AppError;
use privacy_backend::features::deletion::models::data_deletion_request::{
    ActiveModel as DeletionActiveModel, DeletionStatus, DeletionType, Model as DeletionModel,
};
use privacy_backend::features::deletion::services::deletion::DeletionRequestInput;
use privacy_backend::features::user::services::anonymization::AnonymizationService;
use privacy_backend::infrastructure::notifier::NotificationEvent;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

async fn request_full_deletion(app: &TestApp, user_id: Uuid) -> DeletionModel {
    app.state
        .deletion_service
        .request_deletion(
            user_id,
            DeletionRequestInput {
                deletion_type: DeletionType::FullAccount,
                data_types: None,
                reason: Some("Leaving the platform".to_string()),
            },
            &context(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_request_sends_code_out_of_band() {
    let app = setup_app().await;
    let user = create_user(app.conn(), "alice").await;

    let request = request_full_deletion(&app, user.id).await;

    assert_eq!(request.status, DeletionStatus::Pending);
    assert!(request.verified_at.is_none());
    assert_eq!(request.scheduled_for - request.created_at, Duration::days(7));

    let code = app.notifier.verification_code(request.id).unwrap();
    assert_eq!(code, request.verification_code);
    assert_eq!(
        app.notifier.events_for(user.id),
        vec![NotificationEvent::DeletionVerificationRequired]
    );

    // 応答にコードは載らない
    let serialized = serde_json::to_value(&request).unwrap();
    assert!(serialized.get("verification_code").is_none());
}

#[tokio::test]
async fn test_unverified_request_is_never_processed() {
    // Arrange
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "bob").await;
    let request = request_full_deletion(&app, user.id).await;

    // Act: ワーカーを直接呼ぶ
    let result = app.state.deletion_service.process_deletion(request.id).await;

    // Assert
    assert!(matches!(result, Err(AppError::PreconditionFailed(_))));
    let stored = app
        .state
        .deletion_service
        .get_deletion(request.id, user.id)
        .await
        .unwrap();
    assert_eq!(stored.status, DeletionStatus::Pending);
    assert!(stored.backup_reference.is_none());
    assert_eq!(app.storage.len().await, 0);
    // 受付時点ではジョブは積まれない
    assert_eq!(app.run_jobs().await, 0);
}

#[tokio::test]
async fn test_unverified_anonymization_and_partial_requests_are_never_processed() {
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "bianca").await;
    let cases = [
        (DeletionType::Anonymization, None),
        (DeletionType::PartialData, Some(vec!["consents".to_string()])),
    ];

    for (deletion_type, data_types) in cases {
        let request = app
            .state
            .deletion_service
            .request_deletion(
                user.id,
                DeletionRequestInput {
                    deletion_type,
                    data_types,
                    reason: None,
                },
                &context(),
            )
            .await
            .unwrap();

        let result = app.state.deletion_service.process_deletion(request.id).await;

        assert!(matches!(result, Err(AppError::PreconditionFailed(_))));
        let stored = app
            .state
            .deletion_service
            .get_deletion(request.id, user.id)
            .await
            .unwrap();
        assert_eq!(stored.status, DeletionStatus::Pending);
        assert!(stored.backup_reference.is_none());
    }

    // プロフィールは元のまま、バックアップも作られていない
    let anonymizer = AnonymizationService::new(app.conn().clone());
    assert!(!anonymizer.is_user_anonymized(user.id).await.unwrap());
    assert_eq!(app.storage.len().await, 0);
    assert_eq!(app.run_jobs().await, 0);
}

#[tokio::test]
async fn test_wrong_code_is_rejected() {
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "carol").await;
    let request = request_full_deletion(&app, user.id).await;

    let result = app
        .state
        .deletion_service
        .verify_deletion(request.id, user.id, "not-the-code", &context())
        .await;
    assert!(matches!(result, Err(AppError::InvalidVerificationCode)));

    let result = app
        .state
        .deletion_service
        .verify_deletion(request.id, user.id, "   ", &context())
        .await;
    assert!(matches!(result, Err(AppError::InvalidVerificationCode)));

    let stored = app
        .state
        .deletion_service
        .get_deletion(request.id, user.id)
        .await
        .unwrap();
    assert!(stored.verified_at.is_none());
    assert_eq!(app.run_jobs().await, 0);
}

#[tokio::test]
async fn test_verify_twice_is_already_verified() {
    let app = setup_app().await;
    let user = create_user(app.conn(), "dave").await;
    let request = request_full_deletion(&app, user.id).await;
    let code = app.notifier.verification_code(request.id).unwrap();

    let verified = app
        .state
        .deletion_service
        .verify_deletion(request.id, user.id, &code, &context())
        .await
        .unwrap();
    assert!(verified.verified_at.is_some());

    let result = app
        .state
        .deletion_service
        .verify_deletion(request.id, user.id, &code, &context())
        .await;
    assert!(matches!(result, Err(AppError::AlreadyVerified(_))));
}

#[tokio::test]
async fn test_verification_window_expires() {
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "erin").await;
    let request = request_full_deletion(&app, user.id).await;
    let code = app.notifier.verification_code(request.id).unwrap();

    let mut active: DeletionActiveModel = request.clone().into();
    active.scheduled_for = Set(Utc::now() - Duration::minutes(1));
    active.update(app.conn()).await.unwrap();

    let result = app
        .state
        .deletion_service
        .verify_deletion(request.id, user.id, &code, &context())
        .await;

    assert!(matches!(result, Err(AppError::Expired(_))));
    assert_eq!(app.run_jobs().await, 0);
}

#[tokio::test]
async fn test_cancel_only_before_verification() {
    let app = setup_app().await;
    let user = create_user(app.conn(), "frank").await;
    let deletions = &app.state.deletion_service;

    // 未検証ならキャンセルできる
    let first = request_full_deletion(&app, user.id).await;
    let cancelled = deletions
        .cancel_deletion(first.id, user.id, &context())
        .await
        .unwrap();
    assert_eq!(cancelled.status, DeletionStatus::Cancelled);

    // キャンセル済みは検証も再キャンセルもできない
    let code = app.notifier.verification_code(first.id).unwrap();
    let result = deletions
        .verify_deletion(first.id, user.id, &code, &context())
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    let result = deletions.cancel_deletion(first.id, user.id, &context()).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // 検証後はキャンセルできない
    let second = request_full_deletion(&app, user.id).await;
    let code = app.notifier.verification_code(second.id).unwrap();
    deletions
        .verify_deletion(second.id, user.id, &code, &context())
        .await
        .unwrap();
    let result = deletions.cancel_deletion(second.id, user.id, &context()).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_other_users_cannot_touch_the_request() {
    let app = setup_app().await;
    let owner = create_user(app.conn(), "grace").await;
    let intruder = create_user(app.conn(), "heidi").await;
    let request = request_full_deletion(&app, owner.id).await;
    let code = app.notifier.verification_code(request.id).unwrap();
    let deletions = &app.state.deletion_service;

    assert!(matches!(
        deletions.get_deletion(request.id, intruder.id).await,
        Err(AppError::OwnershipMismatch(_))
    ));
    assert!(matches!(
        deletions
            .verify_deletion(request.id, intruder.id, &code, &context())
            .await,
        Err(AppError::OwnershipMismatch(_))
    ));
    assert!(matches!(
        deletions.cancel_deletion(request.id, intruder.id, &context()).await,
        Err(AppError::OwnershipMismatch(_))
    ));
    assert!(deletions.list_deletions(intruder.id).await.unwrap().is_empty());
}
