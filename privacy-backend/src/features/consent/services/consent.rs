// privacy-backend/src/features/consent/services/consent.rs

use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::{
    resource, AuditAction, AuditContext, AuditLogBuilder,
};
use crate::features::audit::services::AuditLogService;
use crate::features::consent::models::policy::{
    required_consent_table, requirement_for, ConsentRequirement, LegalBasis,
};
use crate::features::consent::models::user_consent::{
    ActiveModel as ConsentActiveModel, ConsentStatus, ConsentType, Model as ConsentModel,
};
use crate::features::consent::repositories::UserConsentRepository;
use crate::log_with_context;
use crate::utils::time;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, Iterable, Set};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RecordConsentInput {
    pub consent_type: ConsentType,
    pub status: ConsentStatus,
    pub version: String,
    pub consent_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredConsentCheck {
    pub satisfied: bool,
    pub missing: Vec<ConsentType>,
    pub outdated: Vec<ConsentType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsentStatusEntry {
    pub consent_type: ConsentType,
    pub display_name: &'static str,
    pub status: Option<ConsentStatus>,
    pub version: Option<String>,
    pub required: bool,
    pub legal_basis: LegalBasis,
    pub updated_at: Option<DateTime<Utc>>,
}

/// 追記専用の同意台帳
#[derive(Clone)]
pub struct ConsentService {
    repository: UserConsentRepository,
    audit: AuditLogService,
    policy_version: String,
}

impl ConsentService {
    pub fn new(db: DatabaseConnection, audit: AuditLogService, policy_version: String) -> Self {
        Self {
            repository: UserConsentRepository::new(db),
            audit,
            policy_version,
        }
    }

    pub fn repository(&self) -> &UserConsentRepository {
        &self.repository
    }

    pub fn policy_version(&self) -> &str {
        &self.policy_version
    }

    /// 同意の決定を新しいレコードとして追記する
    pub async fn record_consent(
        &self,
        user_id: Uuid,
        input: RecordConsentInput,
        context: &AuditContext,
    ) -> AppResult<ConsentModel> {
        if input.version.trim().is_empty() {
            return Err(AppError::ValidationError(
                "version: must not be empty".to_string(),
            ));
        }
        if input.consent_text.trim().is_empty() {
            return Err(AppError::ValidationError(
                "consent_text: must not be empty".to_string(),
            ));
        }

        let record = ConsentActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            consent_type: Set(input.consent_type),
            status: Set(input.status),
            version: Set(input.version),
            consent_text: Set(input.consent_text),
            ip_address: Set(context.ip_address.clone()),
            user_agent: Set(context.user_agent.clone()),
            ..Default::default()
        };
        let record = self.repository.append(user_id, record, time::now()).await?;

        let action = if record.status.is_granted() {
            AuditAction::ConsentGranted
        } else {
            AuditAction::ConsentWithdrawn
        };
        self.audit
            .log(
                AuditLogBuilder::new(action, resource::USER_CONSENT)
                    .user(user_id)
                    .resource_id(record.id)
                    .context(context)
                    .new_values(json!({
                        "consent_type": record.consent_type,
                        "status": record.status,
                        "version": record.version,
                    })),
            )
            .await?;

        log_with_context!(
            tracing::Level::INFO,
            "Consent recorded",
            "user_id" => user_id,
            "consent_type" => record.consent_type.as_str(),
            "status" => record.status.as_str(),
            "version" => &record.version,
        );

        Ok(record)
    }

    pub async fn get_effective_consent(
        &self,
        user_id: Uuid,
        consent_type: ConsentType,
    ) -> AppResult<Option<ConsentModel>> {
        Ok(self.repository.find_latest(user_id, consent_type).await?)
    }

    /// 有効な同意が granted の場合だけ撤回できる。文面とバージョンは直前のものを引き継ぐ
    pub async fn withdraw_consent(
        &self,
        user_id: Uuid,
        consent_type: ConsentType,
        context: &AuditContext,
    ) -> AppResult<ConsentModel> {
        let current = self
            .repository
            .find_latest(user_id, consent_type)
            .await?
            .filter(|c| c.status.is_granted())
            .ok_or_else(|| {
                AppError::NoActiveConsent(format!(
                    "No granted {} consent to withdraw",
                    consent_type
                ))
            })?;

        self.record_consent(
            user_id,
            RecordConsentInput {
                consent_type,
                status: ConsentStatus::Withdrawn,
                version: current.version,
                consent_text: current.consent_text,
            },
            context,
        )
        .await
    }

    pub async fn list_consents(&self, user_id: Uuid) -> AppResult<Vec<ConsentModel>> {
        Ok(self.repository.list_by_user(user_id).await?)
    }

    /// 必須同意が揃っているか、現行ポリシーのバージョンで得られているかを確認
    pub async fn check_required_consents(&self, user_id: Uuid) -> AppResult<RequiredConsentCheck> {
        let mut missing = Vec::new();
        let mut outdated = Vec::new();

        for requirement in required_consent_table().iter().filter(|r| r.required) {
            match self
                .repository
                .find_latest(user_id, requirement.consent_type)
                .await?
            {
                Some(consent) if consent.status.is_granted() => {
                    if consent.version != self.policy_version {
                        outdated.push(requirement.consent_type);
                    }
                }
                _ => missing.push(requirement.consent_type),
            }
        }

        Ok(RequiredConsentCheck {
            satisfied: missing.is_empty() && outdated.is_empty(),
            missing,
            outdated,
        })
    }

    /// 種別ごとの有効な同意の一覧
    pub async fn get_consent_status(&self, user_id: Uuid) -> AppResult<Vec<ConsentStatusEntry>> {
        let history = self.repository.list_by_user(user_id).await?;

        Ok(ConsentType::iter()
            .map(|consent_type| {
                // history は新しい順
                let latest = history.iter().find(|c| c.consent_type == consent_type);
                let requirement = requirement_for(consent_type);
                ConsentStatusEntry {
                    consent_type,
                    display_name: consent_type.display_name(),
                    status: latest.map(|c| c.status),
                    version: latest.map(|c| c.version.clone()),
                    required: requirement.required,
                    legal_basis: requirement.legal_basis,
                    updated_at: latest.map(|c| c.created_at),
                }
            })
            .collect())
    }

    pub fn required_consent_table(&self) -> Vec<ConsentRequirement> {
        required_consent_table().to_vec()
    }
}
