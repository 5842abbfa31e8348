// privacy-backend/src/features/deletion/models/data_deletion_request.rs

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl DeletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStatus::Pending => "pending",
            DeletionStatus::Processing => "processing",
            DeletionStatus::Completed => "completed",
            DeletionStatus::Failed => "failed",
            DeletionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum DeletionType {
    #[sea_orm(string_value = "full_account")]
    FullAccount,
    #[sea_orm(string_value = "partial_data")]
    PartialData,
    #[sea_orm(string_value = "anonymization")]
    Anonymization,
}

impl DeletionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionType::FullAccount => "full_account",
            DeletionType::PartialData => "partial_data",
            DeletionType::Anonymization => "anonymization",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "data_deletion_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: DeletionStatus,
    pub deletion_type: DeletionType,
    pub data_types: Option<Json>,
    pub reason: Option<String>,
    #[serde(skip_serializing)]
    pub verification_code: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub scheduled_for: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub backup_reference: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn data_type_list(&self) -> Vec<String> {
        self.data_types
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }

    /// pending かつ未検証の間だけキャンセルできる
    pub fn is_cancellable(&self) -> bool {
        self.status == DeletionStatus::Pending && !self.is_verified()
    }
}
