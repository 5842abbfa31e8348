// tests/integration/api/admin_api_tests.rs

use crate::common::app_helper::setup_app;
use crate::common::request::{body_json, create_request, get, post};
use crate::common::test_data::create_user;
use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_backup_create_list_and_restore() {
    // Arrange
    let app = setup_app().await;
    let router = app.router();
    let admin_id = Uuid::new_v4();
    let user = create_user(app.conn(), "alice").await;

    // Act
    let res = router
        .clone()
        .oneshot(post(
            "/admin/privacy/backups",
            admin_id,
            &json!({ "user_id": user.id, "include_audit_logs": false, "retention_days": 10 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    let backup_id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(body["data"].get("storage_key").is_none());
    assert_eq!(body["data"]["data_types"], json!(["user", "consents"]));
    assert_eq!(body["data"]["encrypted"], true);

    let res = router
        .clone()
        .oneshot(get(
            &format!("/admin/privacy/backups/users/{}", user.id),
            admin_id,
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let res = router
        .clone()
        .oneshot(post(
            "/admin/privacy/backups/restore",
            admin_id,
            &json!({ "user_id": user.id, "backup_id": backup_id }),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["success"], true);
    assert_eq!(
        body["data"]["restored_data_types"],
        json!(["user", "consents"])
    );

    // 別ユーザーとしての取得は 404
    let res = router
        .clone()
        .oneshot(get(
            &format!("/admin/privacy/backups/{}/users/{}", backup_id, Uuid::new_v4()),
            admin_id,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = router
        .oneshot(create_request::<()>(
            "DELETE",
            &format!("/admin/privacy/backups/{}/users/{}", backup_id, user.id),
            Some(admin_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.storage.len().await, 0);
}

#[tokio::test]
async fn test_audit_log_query_is_paginated() {
    let app = setup_app().await;
    let router = app.router();
    let user = create_user(app.conn(), "bob").await;

    for consent_type in ["marketing", "analytics", "cookies"] {
        router
            .clone()
            .oneshot(post(
                "/privacy/consents",
                user.id,
                &json!({
                    "consent_type": consent_type,
                    "status": "granted",
                    "version": "1.0",
                    "consent_text": "Yes"
                }),
            ))
            .await
            .unwrap();
    }

    let res = router
        .oneshot(get(
            &format!(
                "/admin/privacy/audit-logs?user_id={}&resource_type=user_consent&page=2&per_page=2",
                user.id
            ),
            Uuid::new_v4(),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["total_count"], 3);
    assert_eq!(body["data"]["pagination"]["total_pages"], 2);
    assert_eq!(body["data"]["pagination"]["has_prev"], true);
}

#[tokio::test]
async fn test_audit_purge_validates_retention() {
    let app = setup_app().await;

    let res = app
        .router()
        .oneshot(post(
            "/admin/privacy/audit-logs/purge",
            Uuid::new_v4(),
            &json!({ "retention_days": 0 }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compliance_report_endpoint() {
    let app = setup_app().await;
    let router = app.router();
    let user = create_user(app.conn(), "carol").await;

    router
        .clone()
        .oneshot(post(
            "/privacy/consents",
            user.id,
            &json!({
                "consent_type": "data_processing",
                "status": "granted",
                "version": "1.0",
                "consent_text": "Yes"
            }),
        ))
        .await
        .unwrap();

    let res = router
        .clone()
        .oneshot(get("/admin/privacy/compliance-report", Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["consent"]["total_granted"], 1);
    assert_eq!(body["data"]["compliance_score"], 100.0);
    assert_eq!(body["data"]["risk_assessment"]["level"], "low");

    // 逆転した期間は 400
    let res = router
        .oneshot(get(
            "/admin/privacy/compliance-report?start_date=2026-02-01T00:00:00Z&end_date=2026-01-01T00:00:00Z",
            Uuid::new_v4(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
