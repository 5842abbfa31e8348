// privacy-backend/src/features/consent/handler.rs

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::features::consent::dto::{ConsentResponse, RecordConsentRequest};
use crate::features::consent::models::user_consent::ConsentType;
use crate::features::consent::services::{ConsentStatusEntry, RequiredConsentCheck};
use crate::middleware::RequestIdentity;
use crate::types::ApiResponse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sea_orm::Iterable;
use validator::Validate;

fn parse_consent_type(raw: &str) -> AppResult<ConsentType> {
    ConsentType::iter()
        .find(|t| t.as_str() == raw)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown consent type '{}'", raw)))
}

/// 同意・拒否・撤回を記録する
pub async fn record_consent_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Json(payload): Json<RecordConsentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ConsentResponse>>)> {
    payload.validate()?;

    let consent = app_state
        .consent_service
        .record_consent(identity.user_id, payload.into(), &identity.audit_context())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Consent recorded successfully",
            consent.into(),
        )),
    ))
}

pub async fn list_consents_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> AppResult<Json<ApiResponse<Vec<ConsentResponse>>>> {
    let consents = app_state
        .consent_service
        .list_consents(identity.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Consent history retrieved successfully",
        consents.into_iter().map(ConsentResponse::from).collect(),
    )))
}

pub async fn get_consent_status_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> AppResult<Json<ApiResponse<Vec<ConsentStatusEntry>>>> {
    let status = app_state
        .consent_service
        .get_consent_status(identity.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Consent status retrieved successfully",
        status,
    )))
}

pub async fn check_required_consents_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
) -> AppResult<Json<ApiResponse<RequiredConsentCheck>>> {
    let check = app_state
        .consent_service
        .check_required_consents(identity.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Required consents checked",
        check,
    )))
}

pub async fn withdraw_consent_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Path(consent_type): Path<String>,
) -> AppResult<Json<ApiResponse<ConsentResponse>>> {
    let consent_type = parse_consent_type(&consent_type)?;
    let consent = app_state
        .consent_service
        .withdraw_consent(identity.user_id, consent_type, &identity.audit_context())
        .await?;

    Ok(Json(ApiResponse::success(
        "Consent withdrawn successfully",
        consent.into(),
    )))
}

pub fn consent_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/privacy/consents",
            get(list_consents_handler).post(record_consent_handler),
        )
        .route("/privacy/consents/status", get(get_consent_status_handler))
        .route(
            "/privacy/consents/required",
            get(check_required_consents_handler),
        )
        .route(
            "/privacy/consents/{consent_type}/withdraw",
            post(withdraw_consent_handler),
        )
        .with_state(app_state)
}
