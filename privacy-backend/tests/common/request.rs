// tests/common/request.rs
use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
};
use privacy_backend::middleware::identity::USER_ID_HEADER;
use serde::Serialize;
use uuid::Uuid;

/// 呼び出し元ユーザー付きのHTTPリクエストを作成
pub fn create_request<T: Serialize>(
    method: &str,
    uri: &str,
    user_id: Option<Uuid>,
    body: Option<&T>,
) -> Request<Body> {
    let method = Method::from_bytes(method.as_bytes()).unwrap();
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::USER_AGENT, "privacy-backend-tests/1.0")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1");
    if let Some(user_id) = user_id {
        builder = builder.header(USER_ID_HEADER, user_id.to_string());
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn get(uri: &str, user_id: Uuid) -> Request<Body> {
    create_request::<()>("GET", uri, Some(user_id), None)
}

pub fn post<T: Serialize>(uri: &str, user_id: Uuid, body: &T) -> Request<Body> {
    create_request("POST", uri, Some(user_id), Some(body))
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
