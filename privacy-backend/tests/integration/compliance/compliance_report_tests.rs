// tests/integration/compliance/compliance_report_tests.rs

use crate::common::app_helper::{context, setup_app, TestApp};
use crate::common::test_data::create_user;
use chrono::{Duration, Utc};
use privacy_backend::error::AppError;
use privacy_backend::features::audit::models::audit_log::resource;
use privacy_backend::features::audit::repositories::audit_log::AuditLogFilter;
use privacy_backend::features::compliance::models::report::RiskLevel;
use privacy_backend::features::consent::models::user_consent::{ConsentStatus, ConsentType};
use privacy_backend::features::consent::services::consent::RecordConsentInput;
use privacy_backend::features::deletion::models::data_deletion_request::DeletionType;
use privacy_backend::features::deletion::services::deletion::DeletionRequestInput;
use privacy_backend::features::export::models::data_export_request::ExportFormat;
use uuid::Uuid;

async fn decide(app: &TestApp, user_id: Uuid, consent_type: ConsentType, status: ConsentStatus) {
    app.state
        .consent_service
        .record_consent(
            user_id,
            RecordConsentInput {
                consent_type,
                status,
                version: "1.0".to_string(),
                consent_text: "Consent text".to_string(),
            },
            &context(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_report_scores_mixed_activity() {
    // Arrange: 同意1件付与・1件拒否、エクスポート1件完了、削除1件未検証
    let mut app = setup_app().await;
    let user = create_user(app.conn(), "alice").await;
    decide(&app, user.id, ConsentType::Marketing, ConsentStatus::Granted).await;
    decide(&app, user.id, ConsentType::Analytics, ConsentStatus::Denied).await;
    app.state
        .export_service
        .request_export(user.id, ExportFormat::Json, vec!["user".to_string()], &context())
        .await
        .unwrap();
    app.run_jobs().await;
    app.state
        .deletion_service
        .request_deletion(
            user.id,
            DeletionRequestInput {
                deletion_type: DeletionType::FullAccount,
                data_types: None,
                reason: None,
            },
            &context(),
        )
        .await
        .unwrap();

    let now = Utc::now();

    // Act
    let report = app
        .state
        .compliance_service
        .generate_report(now - Duration::hours(1), now + Duration::hours(1), &context())
        .await
        .unwrap();

    // Assert
    assert_eq!(report.consent.total_granted, 1);
    assert_eq!(report.consent.total_denied, 1);
    assert_eq!(report.consent.by_type.len(), 2);
    assert_eq!(report.exports.requested, 1);
    assert_eq!(report.exports.completed, 1);
    assert_eq!(report.deletions.requested, 1);
    assert_eq!(report.deletions.open, 1);
    assert_eq!(report.deletions.overdue, 0);

    assert!((report.component_scores.consent - 0.5).abs() < 1e-9);
    assert!((report.component_scores.export - 1.0).abs() < 1e-9);
    assert!(report.component_scores.deletion.abs() < 1e-9);
    assert!((report.component_scores.audit - 1.0).abs() < 1e-9);
    assert!((report.compliance_score - 55.0).abs() < 1e-9);
    assert_eq!(report.risk_assessment.level, RiskLevel::High);
    assert!(!report.risk_assessment.issues.is_empty());

    // レポート生成自体も監査される
    let reads = app
        .state
        .audit_service
        .query(AuditLogFilter {
            resource_type: Some(resource::COMPLIANCE_REPORT.to_string()),
            ..AuditLogFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(reads.total, 1);
}

#[tokio::test]
async fn test_quiet_period_is_fully_compliant() {
    let app = setup_app().await;
    let now = Utc::now();

    let report = app
        .state
        .compliance_service
        .generate_report(now - Duration::days(30), now, &context())
        .await
        .unwrap();

    assert!((report.compliance_score - 100.0).abs() < 1e-9);
    assert_eq!(report.risk_assessment.level, RiskLevel::Low);
}

#[tokio::test]
async fn test_inverted_period_is_rejected() {
    let app = setup_app().await;
    let now = Utc::now();

    let result = app
        .state
        .compliance_service
        .generate_report(now, now - Duration::days(1), &context())
        .await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
}
