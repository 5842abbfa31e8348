// tests/integration/export/export_workflow_tests.rs

use crate::common::app_helper::{context, setup_app, setup_app_with};
use crate::common::test_data::create_user;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use privacy_backend::config::AppConfig;
use privacy_backend::error::{AppError, AppResult};
use privacy_backend::features::consent::models::user_consent::{ConsentStatus, ConsentType};
use privacy_backend::features::consent::services::consent::RecordConsentInput;
use privacy_backend::features::data_domain::{DataDomainRegistry, UserDataDomain};
use privacy_backend::features::export::models::data_export_request::{
    ActiveModel as ExportActiveModel, ExportFormat, ExportStatus,
};
use privacy_backend::infrastructure::notifier::NotificationEvent;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

fn types(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

struct SubmissionsDomain;

#[async_trait]
impl UserDataDomain for SubmissionsDomain {
    fn name(&self) -> &str {
        "submissions"
    }

    async fn collect(&self, user_id: Uuid) -> AppResult<Value> {
        Ok(json!([
            { "user_id": user_id, "problem": "two-sum", "verdict": "accepted" },
            { "user_id": user_id, "problem": "lru-cache", "verdict": "wrong_answer" },
        ]))
    }

    async fn erase(&self, _user_id: Uuid) -> AppResult<u64> {
        Ok(2)
    }
}

#[tokio::test]
async fn test_json_export_contains_requested_sections() {
    // Arrange
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "alice").await;
    app.state
        .consent_service
        .record_consent(
            user.id,
            RecordConsentInput {
                consent_type: ConsentType::Marketing,
                status: ConsentStatus::Granted,
                version: "1.0".to_string(),
                consent_text: "Send me contest announcements".to_string(),
            },
            &context(),
        )
        .await
        .unwrap();

    // Act: 受付時点では pending のまま返る
    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Json, types(&["user", "consents"]), &context())
        .await
        .unwrap();
    assert_eq!(request.status, ExportStatus::Pending);
    assert!(request.download_url.is_none());

    assert_eq!(app.run_jobs().await, 1);

    // Assert
    let done = app
        .state
        .export_service
        .get_export(request.id, user.id)
        .await
        .unwrap();
    assert_eq!(done.status, ExportStatus::Completed);
    assert_eq!(
        done.download_url,
        Some(format!("/privacy/exports/{}/download", request.id))
    );
    assert_eq!(
        done.file_path,
        Some(format!("exports/{}/{}.json", user.id, request.id))
    );
    assert!(done.processed_at.is_some());

    let download = app
        .state
        .export_service
        .download_export(request.id, user.id, &context())
        .await
        .unwrap();
    assert_eq!(download.content_type, "application/json");
    assert_eq!(download.file_name, format!("export_{}.json", request.id));
    assert_eq!(done.file_size, Some(download.bytes.len() as i64));

    let document: Value = serde_json::from_slice(&download.bytes).unwrap();
    let keys: Vec<&str> = document
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys.len(), 3);
    assert!(keys.contains(&"metadata"));
    assert_eq!(document["metadata"]["user_id"], json!(user.id));
    assert_eq!(document["user"]["email"], json!(user.email));
    assert_eq!(document["consents"].as_array().unwrap().len(), 1);
    assert_eq!(document["consents"][0]["consent_type"], "marketing");

    assert_eq!(
        app.notifier.events_for(user.id),
        vec![NotificationEvent::ExportReady]
    );
}

#[tokio::test]
async fn test_csv_export_is_one_row_per_field() {
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "bob").await;

    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Csv, types(&["user"]), &context())
        .await
        .unwrap();
    app.run_jobs().await;

    let download = app
        .state
        .export_service
        .download_export(request.id, user.id, &context())
        .await
        .unwrap();
    let text = String::from_utf8(download.bytes).unwrap();
    let mut lines = text.lines();

    assert_eq!(lines.next(), Some("data_type,record,field,value"));
    assert!(text.contains(&format!("user,0,email,{}", user.email)));
    assert!(text.contains("user,0,contest_rating,1500"));
    assert!(download.content_type.starts_with("text/csv"));
}

#[tokio::test]
async fn test_xml_export_wraps_sections() {
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "carol").await;

    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Xml, types(&["user"]), &context())
        .await
        .unwrap();
    app.run_jobs().await;

    let download = app
        .state
        .export_service
        .download_export(request.id, user.id, &context())
        .await
        .unwrap();
    let text = String::from_utf8(download.bytes).unwrap();

    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<section name=\"user\">"));
    assert!(text.contains(&user.username));
}

#[tokio::test]
async fn test_request_export_validates_data_types() {
    let app = setup_app().await;
    let user = create_user(app.conn(), "dave").await;
    let exports = &app.state.export_service;

    let result = exports
        .request_export(user.id, ExportFormat::Json, Vec::new(), &context())
        .await;
    assert!(matches!(result, Err(AppError::ValidationError(_))));

    let result = exports
        .request_export(
            user.id,
            ExportFormat::Json,
            types(&["user", "passwords", "payments"]),
            &context(),
        )
        .await;
    match result {
        Err(AppError::ValidationErrors(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("expected validation errors, got {:?}", other.map(|r| r.id)),
    }

    assert!(exports.list_exports(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_before_completion_is_not_ready() {
    let app = setup_app().await;
    let user = create_user(app.conn(), "erin").await;

    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Json, types(&["user"]), &context())
        .await
        .unwrap();

    let result = app
        .state
        .export_service
        .download_export(request.id, user.id, &context())
        .await;
    assert!(matches!(result, Err(AppError::NotReady(_))));
}

#[tokio::test]
async fn test_expired_export_cannot_be_downloaded_and_is_swept() {
    // Arrange
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "frank").await;
    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Json, types(&["user"]), &context())
        .await
        .unwrap();
    app.run_jobs().await;
    assert_eq!(app.storage.len().await, 1);

    let completed = app
        .state
        .export_service
        .get_export(request.id, user.id)
        .await
        .unwrap();
    let mut active: ExportActiveModel = completed.into();
    active.expires_at = Set(Utc::now() - Duration::minutes(1));
    active.update(app.conn()).await.unwrap();

    // Act
    let result = app
        .state
        .export_service
        .download_export(request.id, user.id, &context())
        .await;

    // Assert: 保存上は completed でも読み出しでは expired
    assert!(matches!(result, Err(AppError::Expired(_))));
    let listed = app.state.export_service.list_exports(user.id).await.unwrap();
    assert_eq!(listed[0].status, ExportStatus::Expired);

    let swept = app.state.export_service.expire_stale_exports().await.unwrap();
    assert_eq!(swept.expired_count, 1);
    assert!(swept.errors.is_empty());
    assert_eq!(app.storage.len().await, 0);

    let stored = app
        .state
        .export_service
        .repository()
        .find_by_id(request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ExportStatus::Expired);
}

#[tokio::test]
async fn test_export_of_another_user_is_not_visible() {
    let mut app = setup_app().await;
    let owner = create_user(app.conn(), "grace").await;
    let intruder = create_user(app.conn(), "heidi").await;
    let request = app
        .state
        .export_service
        .request_export(owner.id, ExportFormat::Json, types(&["user"]), &context())
        .await
        .unwrap();
    app.run_jobs().await;

    let exports = &app.state.export_service;
    assert!(matches!(
        exports.get_export(request.id, intruder.id).await,
        Err(AppError::OwnershipMismatch(_))
    ));
    assert!(matches!(
        exports.download_export(request.id, intruder.id, &context()).await,
        Err(AppError::OwnershipMismatch(_))
    ));
    assert!(matches!(
        exports.delete_export(request.id, intruder.id, &context()).await,
        Err(AppError::OwnershipMismatch(_))
    ));
    assert!(matches!(
        exports.get_export(Uuid::new_v4(), owner.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_export_removes_file() {
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "ivan").await;
    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Json, types(&["user"]), &context())
        .await
        .unwrap();
    app.run_jobs().await;

    app.state
        .export_service
        .delete_export(request.id, user.id, &context())
        .await
        .unwrap();

    assert_eq!(app.storage.len().await, 0);
    assert!(matches!(
        app.state.export_service.get_export(request.id, user.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_registered_domain_is_exportable() {
    // Arrange
    let domains = DataDomainRegistry::new().register(Arc::new(SubmissionsDomain));
    let mut app = setup_app_with(AppConfig::for_testing(), domains).await;
    let user = create_user(app.conn(), "judy").await;
    assert!(app
        .state
        .export_service
        .supported_data_types()
        .contains(&"submissions".to_string()));

    // Act
    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Json, types(&["submissions"]), &context())
        .await
        .unwrap();
    app.run_jobs().await;

    // Assert
    let download = app
        .state
        .export_service
        .download_export(request.id, user.id, &context())
        .await
        .unwrap();
    let document: Value = serde_json::from_slice(&download.bytes).unwrap();
    assert_eq!(document["submissions"].as_array().unwrap().len(), 2);
    assert_eq!(document["submissions"][0]["problem"], "two-sum");
}

#[tokio::test]
async fn test_processing_twice_does_not_regenerate() {
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "mallory").await;
    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Json, types(&["user"]), &context())
        .await
        .unwrap();
    app.run_jobs().await;

    // 完了済みのものは再処理しない
    app.state
        .export_service
        .process_export(request.id)
        .await
        .unwrap();

    let ready: Vec<_> = app
        .notifier
        .sent()
        .into_iter()
        .filter(|n| n.event == NotificationEvent::ExportReady)
        .collect();
    assert_eq!(ready.len(), 1);
}


#[tokio::test]
async fn test_storage_failure_marks_export_failed() {
    // Arrange
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "niaj").await;
    app.fail_storage_writes(true);
    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Json, types(&["user"]), &context())
        .await
        .unwrap();

    // Act: 再試行を使い切って失敗する
    assert_eq!(app.run_jobs().await, 1);

    // Assert
    let stored = app
        .state
        .export_service
        .repository()
        .find_by_id(request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ExportStatus::Failed);
    assert!(stored.error_message.unwrap().contains("disk full"));
    assert!(stored.processed_at.is_some());
    assert!(stored.file_path.is_none());
    assert!(stored.download_url.is_none());
    assert_eq!(app.storage.len().await, 0);
    assert_eq!(
        app.notifier.events_for(user.id),
        vec![NotificationEvent::ExportFailed]
    );

    // failed は終端状態。再実行しても変わらない
    app.fail_storage_writes(false);
    app.state
        .export_service
        .process_export(request.id)
        .await
        .unwrap();
    let again = app
        .state
        .export_service
        .get_export(request.id, user.id)
        .await
        .unwrap();
    assert_eq!(again.status, ExportStatus::Failed);
}

#[tokio::test]
async fn test_sweep_leaves_export_in_progress_alone() {
    // Arrange: 期限を過ぎた状態で処理中になっている
    let app = setup_app().await;
    let user = create_user(app.conn(), "olivia").await;
    let request = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Json, types(&["user"]), &context())
        .await
        .unwrap();
    let mut active: ExportActiveModel = request.clone().into();
    active.expires_at = Set(Utc::now() - Duration::minutes(1));
    active.update(app.conn()).await.unwrap();
    let repository = app.state.export_service.repository();
    assert!(repository.claim_pending(request.id).await.unwrap());

    // Act
    let swept = app.state.export_service.expire_stale_exports().await.unwrap();

    // Assert
    assert_eq!(swept.expired_count, 0);
    let stored = repository.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExportStatus::Processing);
}
