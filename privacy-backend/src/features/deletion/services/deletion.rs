// privacy-backend/src/features/deletion/services/deletion.rs

use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::{
    resource, AuditAction, AuditContext, AuditLogBuilder,
};
use crate::features::audit::services::AuditLogService;
use crate::features::backup::services::backup::{BackupConfig, BackupService};
use crate::features::consent::repositories::UserConsentRepository;
use crate::features::data_domain::DataDomainRegistry;
use crate::features::deletion::models::data_deletion_request::{
    ActiveModel as DeletionActiveModel, DeletionStatus, DeletionType, Model as DeletionModel,
};
use crate::features::deletion::repositories::DataDeletionRequestRepository;
use crate::features::export::services::ExportService;
use crate::features::user::repositories::UserRepository;
use crate::features::user::services::anonymization::{is_anonymized_profile, AnonymizationService};
use crate::infrastructure::crypto;
use crate::infrastructure::notifier::{NotificationEvent, Notifier};
use crate::jobs::{Job, JobSender, RetryPolicy};
use crate::log_with_context;
use crate::utils::time;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, Set};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 部分削除で指定できる組み込みデータ種別
pub const PARTIAL_DELETION_TYPES: [&str; 2] = ["consents", "export_requests"];

#[derive(Debug, Clone)]
pub struct DeletionSettings {
    pub grace_days: i64,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletionRequestInput {
    pub deletion_type: DeletionType,
    pub data_types: Option<Vec<String>>,
    pub reason: Option<String>,
}

/// 削除処理の結果 (監査ログのメタデータになる)
#[derive(Debug, Clone)]
struct DeletionOutcome {
    backup_id: Uuid,
    affected: Map<String, Value>,
}

/// 検証コード付きの削除・匿名化ワークフロー
#[derive(Clone)]
pub struct DeletionService {
    repository: DataDeletionRequestRepository,
    user_repository: UserRepository,
    consent_repository: UserConsentRepository,
    anonymization: AnonymizationService,
    exports: ExportService,
    backups: BackupService,
    audit: AuditLogService,
    notifier: Arc<dyn Notifier>,
    domains: DataDomainRegistry,
    jobs: JobSender,
    settings: DeletionSettings,
}

impl DeletionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: DatabaseConnection,
        audit: AuditLogService,
        backups: BackupService,
        exports: ExportService,
        notifier: Arc<dyn Notifier>,
        domains: DataDomainRegistry,
        jobs: JobSender,
        settings: DeletionSettings,
    ) -> Self {
        Self {
            repository: DataDeletionRequestRepository::new(db.clone()),
            user_repository: UserRepository::new(db.clone()),
            consent_repository: UserConsentRepository::new(db.clone()),
            anonymization: AnonymizationService::new(db),
            exports,
            backups,
            audit,
            notifier,
            domains,
            jobs,
            settings,
        }
    }

    pub fn repository(&self) -> &DataDeletionRequestRepository {
        &self.repository
    }

    fn validate_input(&self, input: &DeletionRequestInput) -> AppResult<Option<Vec<String>>> {
        if input.deletion_type != DeletionType::PartialData {
            return Ok(None);
        }

        let requested = input.data_types.clone().unwrap_or_default();
        if requested.is_empty() {
            return Err(AppError::ValidationError(
                "partial_data deletion requires at least one data type".to_string(),
            ));
        }

        let mut normalized: Vec<String> = Vec::new();
        let mut errors = Vec::new();
        for data_type in &requested {
            let data_type = data_type.trim();
            match data_type {
                "audit_logs" => errors.push(
                    "data_types: audit_logs are retained for compliance and cannot be deleted"
                        .to_string(),
                ),
                "user" => errors.push(
                    "data_types: use full_account or anonymization to remove the profile"
                        .to_string(),
                ),
                t if PARTIAL_DELETION_TYPES.contains(&t) || self.domains.contains(t) => {
                    if !normalized.iter().any(|n| n == t) {
                        normalized.push(t.to_string());
                    }
                }
                other => errors.push(format!("data_types: unsupported data type '{}'", other)),
            }
        }

        if !errors.is_empty() {
            return Err(AppError::ValidationErrors(errors));
        }
        Ok(Some(normalized))
    }

    /// 削除リクエストを作成する。処理は検証後まで始まらない
    pub async fn request_deletion(
        &self,
        user_id: Uuid,
        input: DeletionRequestInput,
        context: &AuditContext,
    ) -> AppResult<DeletionModel> {
        let data_types = self.validate_input(&input)?;
        if self.user_repository.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let now = time::now();
        let verification_code = crypto::generate_verification_code();
        let request = self
            .repository
            .create(DeletionActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                status: Set(DeletionStatus::Pending),
                deletion_type: Set(input.deletion_type),
                data_types: Set(data_types.map(|types| json!(types))),
                reason: Set(input.reason.filter(|r| !r.trim().is_empty())),
                verification_code: Set(verification_code.clone()),
                verified_at: Set(None),
                scheduled_for: Set(now + Duration::days(self.settings.grace_days)),
                processed_at: Set(None),
                error_message: Set(None),
                backup_reference: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .await?;

        self.audit
            .log(
                AuditLogBuilder::new(AuditAction::Create, resource::DATA_DELETION)
                    .user(user_id)
                    .resource_id(request.id)
                    .context(context)
                    .metadata(json!({
                        "deletion_type": request.deletion_type,
                        "data_types": request.data_types,
                        "scheduled_for": request.scheduled_for,
                    })),
            )
            .await?;

        let payload = json!({
            "request_id": request.id,
            "deletion_type": request.deletion_type,
            "verification_code": verification_code,
            "scheduled_for": request.scheduled_for,
        });
        if let Err(e) = self
            .notifier
            .notify(user_id, NotificationEvent::DeletionVerificationRequired, payload)
            .await
        {
            warn!(request_id = %request.id, error = %e, "Verification notification failed");
        }

        log_with_context!(
            tracing::Level::INFO,
            "Data deletion requested",
            "user_id" => user_id,
            "request_id" => request.id,
            "deletion_type" => request.deletion_type.as_str(),
        );
        Ok(request)
    }

    /// 検証コードを確認し、成功したら処理をキューに積む
    pub async fn verify_deletion(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        code: &str,
        context: &AuditContext,
    ) -> AppResult<DeletionModel> {
        let request = self.find_owned(request_id, user_id).await?;

        if request.is_verified() {
            return Err(AppError::AlreadyVerified(
                "Deletion request has already been verified".to_string(),
            ));
        }
        if request.status != DeletionStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Deletion request is {}",
                request.status.as_str()
            )));
        }

        let code = code.trim();
        if code.is_empty() || !crypto::codes_match(code, &request.verification_code) {
            self.audit
                .log_best_effort(
                    AuditLogBuilder::new(AuditAction::Verify, resource::DATA_DELETION)
                        .user(user_id)
                        .resource_id(request.id)
                        .context(context)
                        .failure("Invalid verification code"),
                )
                .await;
            return Err(AppError::InvalidVerificationCode);
        }

        let now = time::now();
        if now > request.scheduled_for {
            return Err(AppError::Expired(
                "Deletion request verification window has passed".to_string(),
            ));
        }

        if !self.repository.mark_verified(request.id, now).await? {
            return Err(AppError::AlreadyVerified(
                "Deletion request has already been verified".to_string(),
            ));
        }

        self.audit
            .log(
                AuditLogBuilder::new(AuditAction::Verify, resource::DATA_DELETION)
                    .user(user_id)
                    .resource_id(request.id)
                    .context(context),
            )
            .await?;

        self.jobs.dispatch(Job::ProcessDeletion(request.id));
        info!(request_id = %request.id, user_id = %user_id, "Deletion request verified");

        self.reload(request.id).await
    }

    /// pending かつ未検証の間だけキャンセルできる
    pub async fn cancel_deletion(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        context: &AuditContext,
    ) -> AppResult<DeletionModel> {
        let request = self.find_owned(request_id, user_id).await?;
        if !request.is_cancellable() || !self.repository.cancel(request.id).await? {
            return Err(AppError::Conflict(
                "Deletion request can no longer be cancelled".to_string(),
            ));
        }

        self.audit
            .log(
                AuditLogBuilder::new(AuditAction::Cancel, resource::DATA_DELETION)
                    .user(user_id)
                    .resource_id(request.id)
                    .context(context),
            )
            .await?;

        info!(request_id = %request.id, user_id = %user_id, "Deletion request cancelled");
        self.reload(request.id).await
    }

    pub async fn list_deletions(&self, user_id: Uuid) -> AppResult<Vec<DeletionModel>> {
        Ok(self.repository.list_by_user(user_id).await?)
    }

    pub async fn get_deletion(&self, request_id: Uuid, user_id: Uuid) -> AppResult<DeletionModel> {
        self.find_owned(request_id, user_id).await
    }

    /// ワーカー本体。未検証のリクエストは処理しない (再試行もしない)
    pub async fn process_deletion(&self, request_id: Uuid) -> AppResult<()> {
        let request = self
            .repository
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Deletion request not found".to_string()))?;

        if !request.is_verified() {
            error!(
                request_id = %request.id,
                "Deletion processing attempted before verification"
            );
            self.audit
                .log_best_effort(
                    AuditLogBuilder::new(
                        completion_action(request.deletion_type),
                        resource::DATA_DELETION,
                    )
                    .user(request.user_id)
                    .resource_id(request.id)
                    .failure("Deletion request has not been verified"),
                )
                .await;
            return Err(AppError::PreconditionFailed(format!(
                "Deletion request {} has not been verified",
                request.id
            )));
        }

        if !self.repository.claim_verified(request.id).await? {
            info!(request_id = %request.id, "Deletion is not pending, skipping");
            return Ok(());
        }

        match self.execute(&request).await {
            Ok(outcome) => self.finish_deletion(&request, outcome).await,
            Err(e) => self.fail_deletion(&request, &e).await,
        }
        Ok(())
    }

    /// 起動時の復旧。processing のまま残ったものを戻し、検証済みの pending を再投入する
    pub async fn requeue_unfinished(&self, started_at: DateTime<Utc>) -> AppResult<usize> {
        let released = self.repository.release_processing(started_at).await?;
        if released > 0 {
            warn!(released, "Released deletions left in processing state");
        }

        let ready = self.repository.find_ready().await?;
        for request in &ready {
            self.jobs.dispatch(Job::ProcessDeletion(request.id));
        }
        Ok(ready.len())
    }

    async fn execute(&self, request: &DeletionModel) -> AppResult<DeletionOutcome> {
        // バックアップが取れなければライブデータには触れない
        let system = AuditContext::system();
        let backup = self
            .settings
            .retry
            .run("deletion_backup", || {
                self.backups
                    .create_backup(request.user_id, BackupConfig::default(), &system)
            })
            .await?;
        self.repository
            .set_backup_reference(request.id, backup.id)
            .await?;

        let affected = self
            .settings
            .retry
            .run("deletion_apply", || self.apply(request))
            .await?;

        Ok(DeletionOutcome {
            backup_id: backup.id,
            affected,
        })
    }

    async fn apply(&self, request: &DeletionModel) -> AppResult<Map<String, Value>> {
        let user_id = request.user_id;
        let mut affected = Map::new();

        match request.deletion_type {
            DeletionType::FullAccount => {
                let consents = self.consent_repository.delete_by_user(user_id).await?;
                let exports = self.exports.purge_user_exports(user_id).await?;
                let users = self.user_repository.delete(user_id).await?;
                affected.insert("consents".to_string(), json!(consents));
                affected.insert("export_requests".to_string(), json!(exports));
                affected.insert("user".to_string(), json!(users));

                // 外部ドメインの削除は完了を待たない
                self.domains.spawn_erase_all(user_id);
                affected.insert("domains_dispatched".to_string(), json!(self.domains.names()));
            }
            DeletionType::Anonymization => {
                let already = match self.user_repository.find_by_id(user_id).await? {
                    Some(user) => is_anonymized_profile(&user),
                    None => return Err(AppError::NotFound("User not found".to_string())),
                };
                self.anonymization.anonymize_user(user_id).await?;
                affected.insert("user".to_string(), json!(1));
                affected.insert("already_anonymized".to_string(), json!(already));
            }
            DeletionType::PartialData => {
                for data_type in request.data_type_list() {
                    let count = match data_type.as_str() {
                        "consents" => self.consent_repository.delete_by_user(user_id).await?,
                        "export_requests" => self.exports.purge_user_exports(user_id).await?,
                        name => match self.domains.get(name) {
                            Some(domain) => domain.erase(user_id).await?,
                            None => {
                                return Err(AppError::ValidationError(format!(
                                    "Unsupported data type '{}'",
                                    name
                                )))
                            }
                        },
                    };
                    affected.insert(data_type, json!(count));
                }
            }
        }

        Ok(affected)
    }

    async fn finish_deletion(&self, request: &DeletionModel, outcome: DeletionOutcome) {
        match self.repository.mark_completed(request.id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(request_id = %request.id, "Deletion left processing state before completion");
                return;
            }
            Err(e) => {
                self.fail_deletion(request, &e.into()).await;
                return;
            }
        }

        self.audit
            .log_best_effort(
                AuditLogBuilder::new(completion_action(request.deletion_type), resource::DATA_DELETION)
                    .user(request.user_id)
                    .resource_id(request.id)
                    .metadata(json!({
                        "deletion_type": request.deletion_type,
                        "backup_reference": outcome.backup_id,
                        "affected": outcome.affected,
                    })),
            )
            .await;

        if let Err(e) = self
            .notifier
            .notify(
                request.user_id,
                NotificationEvent::DeletionCompleted,
                json!({
                    "request_id": request.id,
                    "deletion_type": request.deletion_type,
                }),
            )
            .await
        {
            warn!(request_id = %request.id, error = %e, "Deletion notification failed");
        }

        log_with_context!(
            tracing::Level::INFO,
            "Data deletion completed",
            "request_id" => request.id,
            "user_id" => request.user_id,
            "deletion_type" => request.deletion_type.as_str(),
            "backup_reference" => outcome.backup_id,
        );
    }

    async fn fail_deletion(&self, request: &DeletionModel, cause: &AppError) {
        let message = cause.error_message();
        error!(request_id = %request.id, error = %message, "Data deletion failed");

        if let Err(e) = self.repository.mark_failed(request.id, &message).await {
            error!(request_id = %request.id, error = %e, "Failed to record deletion failure");
        }

        self.audit
            .log_best_effort(
                AuditLogBuilder::new(completion_action(request.deletion_type), resource::DATA_DELETION)
                    .user(request.user_id)
                    .resource_id(request.id)
                    .failure(message),
            )
            .await;

        if let Err(e) = self
            .notifier
            .notify(
                request.user_id,
                NotificationEvent::DeletionFailed,
                json!({ "request_id": request.id }),
            )
            .await
        {
            warn!(request_id = %request.id, error = %e, "Deletion failure notification failed");
        }
    }

    async fn find_owned(&self, request_id: Uuid, user_id: Uuid) -> AppResult<DeletionModel> {
        let request = self
            .repository
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Deletion request not found".to_string()))?;

        if request.user_id != user_id {
            warn!(
                request_id = %request_id,
                requested_by = %user_id,
                "Deletion request ownership mismatch"
            );
            return Err(AppError::OwnershipMismatch(
                "Deletion request not found".to_string(),
            ));
        }
        Ok(request)
    }

    async fn reload(&self, request_id: Uuid) -> AppResult<DeletionModel> {
        self.repository
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Deletion request not found".to_string()))
    }
}

fn completion_action(deletion_type: DeletionType) -> AuditAction {
    match deletion_type {
        DeletionType::Anonymization => AuditAction::Anonymize,
        DeletionType::FullAccount | DeletionType::PartialData => AuditAction::Delete,
    }
}
