// privacy-backend/src/features/export/handler.rs

use crate::api::AppState;
use crate::error::AppResult;
use crate::features::export::dto::{
    ExportResponse, RequestExportRequest, SupportedDataTypesResponse,
};
use crate::features::export::models::ExportFormat;
use crate::middleware::RequestIdentity;
use crate::types::ApiResponse;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sea_orm::Iterable;
use uuid::Uuid;
use validator::Validate;

/// 受け付けのみ行い、生成はバックグラウンドで進む
pub async fn request_export_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<RequestExportRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ExportResponse>>)> {
    payload.validate()?;

    let request = app_state
        .export_service
        .request_export(
            identity.user_id,
            payload.format,
            payload.data_types,
            &identity.audit_context(),
        )
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(
            "Data export requested",
            request.into(),
        )),
    ))
}

pub async fn list_exports_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> AppResult<Json<ApiResponse<Vec<ExportResponse>>>> {
    let exports = app_state
        .export_service
        .list_exports(identity.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Data exports retrieved successfully",
        exports.into_iter().map(ExportResponse::from).collect(),
    )))
}

pub async fn get_export_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ExportResponse>>> {
    let export = app_state
        .export_service
        .get_export(id, identity.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Data export retrieved successfully",
        export.into(),
    )))
}

pub async fn delete_export_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    app_state
        .export_service
        .delete_export(id, identity.user_id, &identity.audit_context())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_export_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let download = app_state
        .export_service
        .download_export(id, identity.user_id, &identity.audit_context())
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, download.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download.file_name),
            ),
        ],
        download.bytes,
    )
        .into_response())
}

pub async fn supported_data_types_handler(
    State(app_state): State<AppState>,
) -> AppResult<Json<ApiResponse<SupportedDataTypesResponse>>> {
    Ok(Json(ApiResponse::success(
        "Supported export types",
        SupportedDataTypesResponse {
            data_types: app_state.export_service.supported_data_types(),
            formats: ExportFormat::iter().collect(),
        },
    )))
}

pub fn export_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/privacy/exports",
            get(list_exports_handler).post(request_export_handler),
        )
        .route("/privacy/exports/types", get(supported_data_types_handler))
        .route(
            "/privacy/exports/{id}",
            get(get_export_handler).delete(delete_export_handler),
        )
        .route(
            "/privacy/exports/{id}/download",
            get(download_export_handler),
        )
        .with_state(app_state)
}
