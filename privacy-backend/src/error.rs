// privacy-backend/src/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),

    #[error("Item not found: {0}")]
    NotFound(String),

    /// レコードは存在するが別ユーザーの所有。外部には NotFound と同じ表現で返す
    #[error("Ownership mismatch: {0}")]
    OwnershipMismatch(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Already verified: {0}")]
    AlreadyVerified(String),

    #[error("Invalid verification code")]
    InvalidVerificationCode,

    #[error("Integrity check failed: {0}")]
    IntegrityCheckFailed(String),

    #[error("No active consent: {0}")]
    NoActiveConsent(String),

    /// 検証前の削除処理など、呼び出し側の統合ミス。リトライしない
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Multiple validation errors")]
    ValidationErrors(Vec<String>),

    #[error("Validation failed")]
    ValidationFailure(#[from] ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// ジョブランナーが再試行してよい一時的な失敗かどうか
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::DbErr(_) | AppError::StorageFailure(_))
    }

    /// 監査ログやジョブステータスに記録するためのメッセージ
    pub fn error_message(&self) -> String {
        self.to_string()
    }
}

// axum でエラーをHTTPレスポンスに変換するための実装
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::DbErr(db_err) => {
                tracing::error!(error = %db_err, "Database error");

                let status = match db_err {
                    sea_orm::DbErr::RecordNotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };

                let message = match &db_err {
                    sea_orm::DbErr::RecordNotFound(_) => {
                        "The requested resource was not found".to_string()
                    }
                    _ => "A database error occurred".to_string(),
                };

                (
                    status,
                    ErrorResponse::simple(message, "database_error"),
                )
            }
            // 存在の有無を漏らさないため、所有者不一致は NotFound と同一のレスポンスにする
            AppError::NotFound(message) | AppError::OwnershipMismatch(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::simple(message, "not_found"),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::simple(message, "unauthorized"),
            ),
            AppError::Expired(message) => (
                StatusCode::GONE,
                ErrorResponse::simple(message, "expired"),
            ),
            AppError::NotReady(message) => (
                StatusCode::CONFLICT,
                ErrorResponse::simple(message, "not_ready"),
            ),
            AppError::AlreadyVerified(message) => (
                StatusCode::CONFLICT,
                ErrorResponse::simple(message, "already_verified"),
            ),
            AppError::InvalidVerificationCode => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::simple(
                    "Invalid verification code".to_string(),
                    "invalid_verification_code",
                ),
            ),
            AppError::IntegrityCheckFailed(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::simple(message, "integrity_check_failed"),
            ),
            AppError::NoActiveConsent(message) => (
                StatusCode::CONFLICT,
                ErrorResponse::simple(message, "no_active_consent"),
            ),
            AppError::PreconditionFailed(message) => {
                tracing::error!(message = %message, "Precondition failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::simple(
                        "An internal server error occurred".to_string(),
                        "internal_server_error",
                    ),
                )
            }
            AppError::StorageFailure(message) => {
                tracing::error!(message = %message, "Storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::simple(
                        "A storage error occurred".to_string(),
                        "storage_failure",
                    ),
                )
            }
            AppError::ValidationError(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::simple(message, "validation_error"),
            ),
            AppError::ValidationErrors(errors) => {
                let mut field_errors = HashMap::new();
                for error in &errors {
                    if let Some((field, message)) = error.split_once(": ") {
                        field_errors
                            .entry(field.to_string())
                            .or_insert_with(Vec::new)
                            .push(message.to_string());
                    }
                }
                let errors_array: Vec<serde_json::Value> =
                    errors.iter().map(|e| json!({"message": e})).collect();
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        success: false,
                        error: "Validation failed".to_string(),
                        message: "Validation failed".to_string(),
                        details: None,
                        validation_errors: Some(field_errors),
                        errors: Some(errors_array),
                        error_type: "validation_errors".to_string(),
                    },
                )
            }
            AppError::ValidationFailure(errors) => {
                let field_errors: HashMap<String, Vec<String>> = errors
                    .field_errors()
                    .into_iter()
                    .map(|(field, errors)| {
                        let messages = errors
                            .iter()
                            .map(|e| {
                                e.message
                                    .as_ref()
                                    .map_or_else(|| "Invalid value".to_string(), |m| m.to_string())
                            })
                            .collect();
                        (field.to_string(), messages)
                    })
                    .collect();
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        success: false,
                        error: "Validation failed".to_string(),
                        message: "Validation failed".to_string(),
                        details: None,
                        validation_errors: Some(field_errors),
                        errors: None,
                        error_type: "validation_errors".to_string(),
                    },
                )
            }
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::simple(message, "bad_request"),
            ),
            AppError::Conflict(message) => (
                StatusCode::CONFLICT,
                ErrorResponse::simple(message, "conflict"),
            ),
            AppError::TooManyRequests(message) => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::simple(message, "too_many_requests"),
            ),
            AppError::InternalServerError(message) => {
                tracing::error!(message = %message, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::simple(
                        "An internal server error occurred".to_string(),
                        "internal_server_error",
                    ),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

// Result 型のエイリアス
pub type AppResult<T> = Result<T, AppError>;

/// 統一的なエラーレスポンス構造
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<HashMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<serde_json::Value>>,
    pub error_type: String,
}

impl ErrorResponse {
    fn simple(message: String, error_type: &str) -> Self {
        Self {
            success: false,
            error: message.clone(),
            message,
            details: None,
            validation_errors: None,
            errors: None,
            error_type: error_type.to_string(),
        }
    }
}
