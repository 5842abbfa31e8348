// privacy-backend/src/middleware/identity.rs

use crate::error::AppError;
use crate::features::audit::models::audit_log::AuditContext;
use crate::logging::{RequestContext, REQUEST_ID_HEADER};
use axum::http::{request::Parts, HeaderMap};
use uuid::Uuid;

/// 上流の認証レイヤーが付与するヘッダー
pub const USER_ID_HEADER: &str = "x-user-id";
pub const SESSION_ID_HEADER: &str = "x-session-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// 認証済みの呼び出し元。認可は上流で済んでいる前提
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub session_id: Option<String>,
}

impl RequestIdentity {
    pub fn audit_context(&self) -> AuditContext {
        AuditContext {
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            request_id: self.request_id.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// x-user-id ヘッダーからユーザーIDを読む (レート制限でも使う)
pub fn user_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    header_value(headers, USER_ID_HEADER).and_then(|v| Uuid::parse_str(&v).ok())
}

impl<S> axum::extract::FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_user_id = header_value(&parts.headers, USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing caller identity".to_string()))?;
        let user_id = Uuid::parse_str(&raw_user_id)
            .map_err(|_| AppError::Unauthorized("Invalid caller identity".to_string()))?;

        // x-forwarded-for は先頭がクライアント
        let ip_address = header_value(&parts.headers, FORWARDED_FOR_HEADER).and_then(|v| {
            v.split(',')
                .next()
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty())
        });

        let request_id = header_value(&parts.headers, REQUEST_ID_HEADER).or_else(|| {
            parts
                .extensions
                .get::<RequestContext>()
                .map(|ctx| ctx.request_id.clone())
        });

        Ok(Self {
            user_id,
            ip_address,
            user_agent: header_value(&parts.headers, axum::http::header::USER_AGENT.as_str()),
            request_id,
            session_id: header_value(&parts.headers, SESSION_ID_HEADER),
        })
    }
}
