// privacy-backend/src/features/audit/handler.rs

use crate::api::AppState;
use crate::error::AppResult;
use crate::features::audit::dto::{
    ActivityQuery, AuditLogQuery, PurgeAuditLogsRequest, PurgeAuditLogsResponse,
};
use crate::features::audit::models::audit_log::Model as AuditLogModel;
use crate::middleware::RequestIdentity;
use crate::types::{ApiResponse, PaginatedResponse};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

const DEFAULT_ACTIVITY_LIMIT: u64 = 50;

/// 監査ログ検索 (管理者向け)
pub async fn query_audit_logs_handler(
    State(app_state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<AuditLogModel>>>> {
    let (page, per_page) = query.pagination().get_pagination();
    let result = app_state.audit_service.query(query.to_filter()).await?;

    Ok(Json(ApiResponse::success(
        "Audit logs retrieved successfully",
        PaginatedResponse::new(result.entries, page, per_page, result.total),
    )))
}

pub async fn purge_audit_logs_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<PurgeAuditLogsRequest>,
) -> AppResult<Json<ApiResponse<PurgeAuditLogsResponse>>> {
    payload.validate()?;
    let retention_days = payload
        .retention_days
        .unwrap_or(app_state.config.policy.audit_retention_days);

    let deleted_count = app_state
        .audit_service
        .purge_older_than(retention_days)
        .await?;

    Ok(Json(ApiResponse::success(
        "Audit logs purged successfully",
        PurgeAuditLogsResponse {
            retention_days,
            deleted_count,
        },
    )))
}

/// 自分の最近の操作履歴
pub async fn my_activity_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<ApiResponse<Vec<AuditLogModel>>>> {
    let entries = app_state
        .audit_service
        .get_user_activity(
            identity.user_id,
            query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT),
        )
        .await?;

    Ok(Json(ApiResponse::success(
        "Activity retrieved successfully",
        entries,
    )))
}

pub fn audit_router(app_state: AppState) -> Router {
    Router::new()
        .route("/privacy/activity", get(my_activity_handler))
        .route("/admin/privacy/audit-logs", get(query_audit_logs_handler))
        .route(
            "/admin/privacy/audit-logs/purge",
            post(purge_audit_logs_handler),
        )
        .with_state(app_state)
}
