// tests/integration/api/privacy_api_tests.rs

use crate::common::app_helper::setup_app;
use crate::common::request::{body_bytes, body_json, create_request, get, post};
use crate::common::test_data::create_user;
use axum::http::{header, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_consent_record_and_withdraw_flow() {
    // Arrange
    let app = setup_app().await;
    let router = app.router();
    let user = create_user(app.conn(), "alice").await;

    // Act: 付与
    let res = router
        .clone()
        .oneshot(post(
            "/privacy/consents",
            user.id,
            &json!({
                "consent_type": "data_processing",
                "status": "granted",
                "version": "1.0",
                "consent_text": "I agree to the processing of my data"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["data"]["consent_type"], "data_processing");
    assert!(body["data"].get("ip_address").is_none());

    let res = router
        .clone()
        .oneshot(get("/privacy/consents/required", user.id))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"]["satisfied"], true);

    // 撤回
    let res = router
        .clone()
        .oneshot(create_request::<()>(
            "POST",
            "/privacy/consents/data_processing/withdraw",
            Some(user.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["status"], "withdrawn");

    // Assert
    let res = router
        .clone()
        .oneshot(get("/privacy/consents/status", user.id))
        .await
        .unwrap();
    let body = body_json(res).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 5);
    let processing = entries
        .iter()
        .find(|e| e["consent_type"] == "data_processing")
        .unwrap();
    assert_eq!(processing["status"], "withdrawn");

    // 二重撤回は 409
    let res = router
        .clone()
        .oneshot(create_request::<()>(
            "POST",
            "/privacy/consents/data_processing/withdraw",
            Some(user.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // 未知の種別は 400
    let res = router
        .oneshot(create_request::<()>(
            "POST",
            "/privacy/consents/telepathy/withdraw",
            Some(user.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_consent_payload_is_bad_request() {
    let app = setup_app().await;
    let user = create_user(app.conn(), "bob").await;

    let res = app
        .router()
        .oneshot(post(
            "/privacy/consents",
            user.id,
            &json!({
                "consent_type": "marketing",
                "status": "granted",
                "version": "",
                "consent_text": "Newsletter"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_request_and_download() {
    // Arrange
    let mut app = setup_app().await;
    let router = app.router();
    let user = create_user(app.conn(), "carol").await;

    // Act: 受付は 202
    let res = router
        .clone()
        .oneshot(post(
            "/privacy/exports",
            user.id,
            &json!({ "format": "json", "data_types": ["user", "consents"] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body = body_json(res).await;
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"]["download_url"].is_null());
    let export_id = body["data"]["id"].as_str().unwrap().to_string();

    // 処理前のダウンロードは 409
    let res = router
        .clone()
        .oneshot(get(&format!("/privacy/exports/{}/download", export_id), user.id))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    app.run_jobs().await;

    let res = router
        .clone()
        .oneshot(get(&format!("/privacy/exports/{}", export_id), user.id))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(
        body["data"]["download_url"],
        format!("/privacy/exports/{}/download", export_id)
    );
    assert!(body["data"].get("file_path").is_none());

    // Assert
    let res = router
        .clone()
        .oneshot(get(&format!("/privacy/exports/{}/download", export_id), user.id))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let disposition = res
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains(&format!("export_{}.json", export_id)));

    let document: Value = serde_json::from_slice(&body_bytes(res).await).unwrap();
    assert_eq!(document["user"]["email"], json!(user.email));
    assert!(document["consents"].as_array().unwrap().is_empty());

    let res = router
        .oneshot(get("/privacy/exports", user.id))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_export_of_another_user_is_not_found() {
    let mut app = setup_app().await;
    let router = app.router();
    let owner = create_user(app.conn(), "dave").await;
    let intruder = create_user(app.conn(), "erin").await;

    let res = router
        .clone()
        .oneshot(post(
            "/privacy/exports",
            owner.id,
            &json!({ "format": "csv", "data_types": ["user"] }),
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    let export_id = body["data"]["id"].as_str().unwrap().to_string();
    app.run_jobs().await;

    let res = router
        .clone()
        .oneshot(get(&format!("/privacy/exports/{}/download", export_id), intruder.id))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // 存在しないIDと同じ応答
    let res = router
        .oneshot(get(&format!("/privacy/exports/{}", Uuid::new_v4()), intruder.id))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_with_unknown_type_is_rejected() {
    let app = setup_app().await;
    let user = create_user(app.conn(), "frank").await;
    let router = app.router();

    let res = router
        .clone()
        .oneshot(post(
            "/privacy/exports",
            user.id,
            &json!({ "format": "xml", "data_types": ["user", "passwords"] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = router
        .oneshot(get("/privacy/exports/types", user.id))
        .await
        .unwrap();
    let body = body_json(res).await;
    let types = body["data"]["data_types"].as_array().unwrap();
    assert!(types.contains(&json!("consents")));
    assert_eq!(body["data"]["formats"], json!(["json", "csv", "xml"]));
}

#[tokio::test]
async fn test_deletion_flow_never_exposes_the_code() {
    // Arrange
    let mut app = setup_app().await;
    let router = app.router();
    let user = create_user(app.conn(), "grace").await;

    // Act
    let res = router
        .clone()
        .oneshot(post(
            "/privacy/deletions",
            user.id,
            &json!({ "deletion_type": "anonymization", "reason": "Privacy" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    let deletion_id = body["data"]["id"].as_str().unwrap().to_string();
    let request_id = Uuid::parse_str(&deletion_id).unwrap();

    // Assert: 応答にコードは載らない
    assert!(body["data"].get("verification_code").is_none());
    assert_eq!(body["data"]["verified"], false);
    assert_eq!(body["data"]["status"], "pending");

    // 誤ったコードは 400
    let res = router
        .clone()
        .oneshot(post(
            &format!("/privacy/deletions/{}/verify", deletion_id),
            user.id,
            &json!({ "code": "000000" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let code = app.notifier.verification_code(request_id).unwrap();
    let res = router
        .clone()
        .oneshot(post(
            &format!("/privacy/deletions/{}/verify", deletion_id),
            user.id,
            &json!({ "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["verified"], true);
    assert!(body["data"].get("verification_code").is_none());

    // 検証後のキャンセルは 409
    let res = router
        .clone()
        .oneshot(create_request::<()>(
            "POST",
            &format!("/privacy/deletions/{}/cancel", deletion_id),
            Some(user.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    app.run_jobs().await;

    let res = router
        .oneshot(get(&format!("/privacy/deletions/{}", deletion_id), user.id))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn test_activity_lists_own_actions() {
    let app = setup_app().await;
    let router = app.router();
    let user = create_user(app.conn(), "heidi").await;

    router
        .clone()
        .oneshot(post(
            "/privacy/consents",
            user.id,
            &json!({
                "consent_type": "analytics",
                "status": "denied",
                "version": "1.0",
                "consent_text": "Analytics"
            }),
        ))
        .await
        .unwrap();

    let res = router
        .oneshot(get("/privacy/activity?limit=10", user.id))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "consent_withdrawn");
    assert_eq!(entries[0]["ip_address"], "203.0.113.7");
}
