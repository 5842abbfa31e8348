// privacy-backend/src/features/backup/handler.rs

use crate::api::AppState;
use crate::error::AppResult;
use crate::features::backup::dto::{BackupResponse, CreateBackupRequest, RestoreBackupRequest};
use crate::features::backup::services::{CleanupResult, RestoreOptions, RestoreResult};
use crate::middleware::RequestIdentity;
use crate::types::ApiResponse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

pub async fn create_backup_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<CreateBackupRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BackupResponse>>)> {
    payload.validate()?;

    let backup = app_state
        .backup_service
        .create_backup(
            payload.user_id,
            payload.to_config(),
            &identity.audit_context(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Backup created successfully",
            backup.into(),
        )),
    ))
}

pub async fn list_user_backups_handler(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<BackupResponse>>>> {
    let backups = app_state.backup_service.list_user_backups(user_id).await?;

    Ok(Json(ApiResponse::success(
        "Backups retrieved successfully",
        backups.into_iter().map(BackupResponse::from).collect(),
    )))
}

pub async fn get_backup_handler(
    State(app_state): State<AppState>,
    Path((backup_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<BackupResponse>>> {
    let backup = app_state
        .backup_service
        .get_backup(backup_id, user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Backup retrieved successfully",
        backup.into(),
    )))
}

/// 部分的な失敗は 200 のまま errors に載せて返す
pub async fn restore_backup_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<RestoreBackupRequest>,
) -> AppResult<Json<ApiResponse<RestoreResult>>> {
    let result = app_state
        .backup_service
        .restore_data(
            payload.user_id,
            RestoreOptions::from(&payload),
            &identity.audit_context(),
        )
        .await?;

    let message = if result.success {
        "Backup restored successfully"
    } else {
        "Backup restored with errors"
    };
    Ok(Json(ApiResponse::success(message, result)))
}

pub async fn delete_backup_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path((backup_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    app_state
        .backup_service
        .delete_backup(backup_id, user_id, &identity.audit_context())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn cleanup_backups_handler(
    State(app_state): State<AppState>,
) -> AppResult<Json<ApiResponse<CleanupResult>>> {
    let result = app_state.backup_service.cleanup_expired_backups().await?;

    Ok(Json(ApiResponse::success(
        "Expired backups cleaned up",
        result,
    )))
}

pub fn backup_router(app_state: AppState) -> Router {
    Router::new()
        .route("/admin/privacy/backups", post(create_backup_handler))
        .route(
            "/admin/privacy/backups/users/{user_id}",
            get(list_user_backups_handler),
        )
        .route(
            "/admin/privacy/backups/{id}/users/{user_id}",
            get(get_backup_handler).delete(delete_backup_handler),
        )
        .route(
            "/admin/privacy/backups/restore",
            post(restore_backup_handler),
        )
        .route(
            "/admin/privacy/backups/cleanup",
            post(cleanup_backups_handler),
        )
        .with_state(app_state)
}
