// tests/integration/api/middleware_tests.rs

use crate::common::app_helper::{setup_app, setup_app_with};
use crate::common::request::{body_json, create_request, get, post};
use crate::common::test_data::create_user;
use axum::http::StatusCode;
use privacy_backend::config::AppConfig;
use privacy_backend::features::data_domain::DataDomainRegistry;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_reports_database() {
    let app = setup_app().await;
    let router = app.router();

    let req = create_request::<()>("GET", "/health", None, None);
    let res = router.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "ok");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = setup_app().await;
    let router = app.router();

    let req = create_request::<()>("GET", "/privacy/consents", None, None);
    let res = router.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(res).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let app = setup_app().await;
    let router = app.router();

    let mut req = create_request::<()>("GET", "/health", None, None);
    req.headers_mut()
        .insert("x-request-id", "req-from-gateway-42".parse().unwrap());
    let res = router.clone().oneshot(req).await.unwrap();
    assert_eq!(
        res.headers().get("x-request-id").unwrap(),
        "req-from-gateway-42"
    );

    // 付いていなければ生成される
    let req = create_request::<()>("GET", "/health", None, None);
    let res = router.oneshot(req).await.unwrap();
    assert!(!res.headers().get("x-request-id").unwrap().is_empty());
}

#[tokio::test]
async fn test_create_requests_are_rate_limited_per_user() {
    // Arrange
    let mut config = AppConfig::for_testing();
    config.rate_limit_per_hour = 2;
    let app = setup_app_with(config, DataDomainRegistry::new()).await;
    let router = app.router();
    let user = create_user(app.conn(), "alice").await;
    let other = create_user(app.conn(), "bob").await;
    let body = json!({
        "consent_type": "cookies",
        "status": "granted",
        "version": "1.0",
        "consent_text": "Allow cookies"
    });

    // Act
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let res = router
            .clone()
            .oneshot(post("/privacy/consents", user.id, &body))
            .await
            .unwrap();
        statuses.push(res.status());
    }

    // Assert
    assert_eq!(
        statuses,
        vec![StatusCode::CREATED, StatusCode::CREATED, StatusCode::TOO_MANY_REQUESTS]
    );

    // 参照系と他ユーザーは影響を受けない
    let res = router
        .clone()
        .oneshot(get("/privacy/consents", user.id))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = router
        .oneshot(post("/privacy/consents", other.id, &body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}
