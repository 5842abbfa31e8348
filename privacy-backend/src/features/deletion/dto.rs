// privacy-backend/src/features/deletion/dto.rs

use crate::features::deletion::models::data_deletion_request::{
    DeletionStatus, DeletionType, Model,
};
use crate::features::deletion::services::DeletionRequestInput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestDeletionRequest {
    pub deletion_type: DeletionType,
    #[validate(length(max = 20, message = "At most 20 data types"))]
    pub data_types: Option<Vec<String>>,
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
}

impl From<RequestDeletionRequest> for DeletionRequestInput {
    fn from(request: RequestDeletionRequest) -> Self {
        Self {
            deletion_type: request.deletion_type,
            data_types: request.data_types,
            reason: request.reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyDeletionRequest {
    #[validate(length(min = 1, max = 64, message = "Verification code is required"))]
    pub code: String,
}

/// 削除リクエストの状態。検証コードは含めない
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionResponse {
    pub id: Uuid,
    pub status: DeletionStatus,
    pub deletion_type: DeletionType,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub data_types: Vec<String>,
    pub reason: Option<String>,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub scheduled_for: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for DeletionResponse {
    fn from(model: Model) -> Self {
        Self {
            data_types: model.data_type_list(),
            verified: model.is_verified(),
            id: model.id,
            status: model.status,
            deletion_type: model.deletion_type,
            reason: model.reason,
            verified_at: model.verified_at,
            scheduled_for: model.scheduled_for,
            processed_at: model.processed_at,
            error_message: model.error_message,
            created_at: model.created_at,
        }
    }
}
