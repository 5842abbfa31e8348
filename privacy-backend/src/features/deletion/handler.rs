// privacy-backend/src/features/deletion/handler.rs

use crate::api::AppState;
use crate::error::AppResult;
use crate::features::deletion::dto::{
    DeletionResponse, RequestDeletionRequest, VerifyDeletionRequest,
};
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

/// 削除リクエストを作成する。検証コードは通知経由でのみ届く
pub async fn request_deletion_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<RequestDeletionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<DeletionResponse>>)> {
    payload.validate()?;

    let request = app_state
        .deletion_service
        .request_deletion(identity.user_id, payload.into(), &identity.audit_context())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Deletion requested. Check your notifications for the verification code",
            request.into(),
        )),
    ))
}

pub async fn list_deletions_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> AppResult<Json<ApiResponse<Vec<DeletionResponse>>>> {
    let requests = app_state
        .deletion_service
        .list_deletions(identity.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Deletion requests retrieved successfully",
        requests.into_iter().map(DeletionResponse::from).collect(),
    )))
}

pub async fn get_deletion_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeletionResponse>>> {
    let request = app_state
        .deletion_service
        .get_deletion(id, identity.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Deletion request retrieved successfully",
        request.into(),
    )))
}

pub async fn verify_deletion_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyDeletionRequest>,
) -> AppResult<Json<ApiResponse<DeletionResponse>>> {
    payload.validate()?;

    let request = app_state
        .deletion_service
        .verify_deletion(id, identity.user_id, &payload.code, &identity.audit_context())
        .await?;

    Ok(Json(ApiResponse::success(
        "Deletion request verified and scheduled",
        request.into(),
    )))
}

pub async fn cancel_deletion_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeletionResponse>>> {
    let request = app_state
        .deletion_service
        .cancel_deletion(id, identity.user_id, &identity.audit_context())
        .await?;

    Ok(Json(ApiResponse::success(
        "Deletion request cancelled",
        request.into(),
    )))
}

pub fn deletion_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/privacy/deletions",
            get(list_deletions_handler).post(request_deletion_handler),
        )
        .route("/privacy/deletions/{id}", get(get_deletion_handler))
        .route(
            "/privacy/deletions/{id}/verify",
            post(verify_deletion_handler),
        )
        .route(
            "/privacy/deletions/{id}/cancel",
            post(cancel_deletion_handler),
        )
        .with_state(app_state)
}
