// privacy-backend/src/features/consent/models/user_consent.rs

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User consent types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    #[sea_orm(string_value = "data_processing")]
    DataProcessing,
    #[sea_orm(string_value = "marketing")]
    Marketing,
    #[sea_orm(string_value = "analytics")]
    Analytics,
    #[sea_orm(string_value = "third_party_sharing")]
    ThirdPartySharing,
    #[sea_orm(string_value = "cookies")]
    Cookies,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::DataProcessing => "data_processing",
            ConsentType::Marketing => "marketing",
            ConsentType::Analytics => "analytics",
            ConsentType::ThirdPartySharing => "third_party_sharing",
            ConsentType::Cookies => "cookies",
        }
    }

    /// Get display name for consent type
    pub fn display_name(&self) -> &'static str {
        match self {
            ConsentType::DataProcessing => "Essential Data Processing",
            ConsentType::Marketing => "Marketing Communications",
            ConsentType::Analytics => "Analytics and Performance",
            ConsentType::ThirdPartySharing => "Third-Party Data Sharing",
            ConsentType::Cookies => "Non-Essential Cookies",
        }
    }
}

impl std::fmt::Display for ConsentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    #[sea_orm(string_value = "granted")]
    Granted,
    #[sea_orm(string_value = "denied")]
    Denied,
    #[sea_orm(string_value = "withdrawn")]
    Withdrawn,
}

impl ConsentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::Granted => "granted",
            ConsentStatus::Denied => "denied",
            ConsentStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, ConsentStatus::Granted)
    }
}

/// 同意台帳の1レコード。作成後は更新しない
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_consents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub consent_type: ConsentType,
    pub status: ConsentStatus,
    pub version: String,
    pub consent_text: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
