// privacy-backend/src/features/consent/dto.rs

use crate::features::consent::models::user_consent::{ConsentStatus, ConsentType, Model};
use crate::features::consent::services::RecordConsentInput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordConsentRequest {
    pub consent_type: ConsentType,
    pub status: ConsentStatus,
    #[validate(length(min = 1, max = 20, message = "Version must be 1-20 characters"))]
    pub version: String,
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Consent text must be 1-10000 characters"
    ))]
    pub consent_text: String,
}

impl From<RecordConsentRequest> for RecordConsentInput {
    fn from(request: RecordConsentRequest) -> Self {
        Self {
            consent_type: request.consent_type,
            status: request.status,
            version: request.version,
            consent_text: request.consent_text,
        }
    }
}

/// 同意レコード (IP/UA は監査ログ側で参照する)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentResponse {
    pub id: Uuid,
    pub consent_type: ConsentType,
    pub status: ConsentStatus,
    pub version: String,
    pub consent_text: String,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for ConsentResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            consent_type: model.consent_type,
            status: model.status,
            version: model.version,
            consent_text: model.consent_text,
            created_at: model.created_at,
        }
    }
}
