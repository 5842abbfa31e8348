// tests/integration/jobs/maintenance_tests.rs

use crate::common::app_helper::{context, setup_app};
use crate::common::test_data::create_user;
use chrono::{Duration, Utc};
use privacy_backend::features::audit::models::audit_log::{resource, Model as AuditLogModel};
use privacy_backend::features::backup::models::backup_metadata::ActiveModel as BackupActiveModel;
use privacy_backend::features::backup::services::backup::BackupConfig;
use privacy_backend::features::export::models::data_export_request::{
    ActiveModel as ExportActiveModel, ExportFormat, ExportStatus,
};
use privacy_backend::jobs::MaintenanceScheduler;
use sea_orm::{ActiveModelTrait, Set};
use std::time::Duration as StdDuration;
use uuid::Uuid;

#[tokio::test]
async fn test_maintenance_sweep_collects_expired_artifacts() {
    // Arrange
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "alice").await;
    let past = Utc::now() - Duration::hours(1);

    let backup = app
        .state
        .backup_service
        .create_backup(user.id, BackupConfig::default(), &context())
        .await
        .unwrap();
    let mut active: BackupActiveModel = backup.into();
    active.expires_at = Set(past);
    active.update(app.conn()).await.unwrap();

    let export = app
        .state
        .export_service
        .request_export(user.id, ExportFormat::Json, vec!["user".to_string()], &context())
        .await
        .unwrap();
    app.run_jobs().await;
    let completed = app
        .state
        .export_service
        .repository()
        .find_by_id(export.id)
        .await
        .unwrap()
        .unwrap();
    let mut active: ExportActiveModel = completed.into();
    active.expires_at = Set(past);
    active.update(app.conn()).await.unwrap();

    let stale_log = AuditLogModel {
        id: Uuid::new_v4(),
        user_id: Some(user.id),
        session_id: None,
        action: "read".to_string(),
        resource_type: resource::USER.to_string(),
        resource_id: None,
        result: "success".to_string(),
        ip_address: None,
        user_agent: None,
        request_id: None,
        metadata: None,
        old_values: None,
        new_values: None,
        error_message: None,
        created_at: Utc::now() - Duration::days(3000),
    };
    app.state
        .audit_service
        .repository()
        .insert_if_missing(stale_log)
        .await
        .unwrap();
    assert_eq!(app.storage.len().await, 2);

    let scheduler = MaintenanceScheduler::new(
        app.state.backup_service.clone(),
        app.state.export_service.clone(),
        app.state.audit_service.clone(),
        app.state.rate_limiter.clone(),
        app.state.config.policy.audit_retention_days,
        StdDuration::from_secs(3600),
    );

    // Act
    let report = scheduler.run_once().await;

    // Assert
    assert!(report.errors.is_empty());
    assert_eq!(report.backups_deleted, 1);
    assert_eq!(report.exports_expired, 1);
    assert_eq!(report.audit_logs_purged, 1);
    assert_eq!(app.storage.len().await, 0);

    let stored = app
        .state
        .export_service
        .repository()
        .find_by_id(export.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ExportStatus::Expired);

    // 2回目は何も残っていない
    let again = scheduler.run_once().await;
    assert_eq!(again.backups_deleted, 0);
    assert_eq!(again.exports_expired, 0);
    assert_eq!(again.audit_logs_purged, 0);
}
