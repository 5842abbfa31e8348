// privacy-backend/src/features/backup/services/backup.rs

use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::{
    resource, AuditAction, AuditContext, AuditLogBuilder, AuditResult,
};
use crate::features::audit::repositories::AuditLogRepository;
use crate::features::audit::services::AuditLogService;
use crate::features::backup::models::backup_metadata::{
    ActiveModel as BackupActiveModel, BackupDataType, Model as BackupModel,
};
use crate::features::backup::models::bundle::{BackupBundle, BUNDLE_FORMAT_VERSION};
use crate::features::backup::repositories::BackupMetadataRepository;
use crate::features::consent::repositories::UserConsentRepository;
use crate::features::user::repositories::UserRepository;
use crate::infrastructure::crypto;
use crate::infrastructure::storage::StorageService;
use crate::log_with_context;
use crate::utils::time;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

const BACKUP_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    pub include_audit_logs: bool,
    pub include_user_data: bool,
    pub include_consents: bool,
    pub encrypt_backup: bool,
    /// 0 = 無圧縮, 1-9 = gzip レベル
    pub compression_level: u32,
    /// 未指定ならポリシーの既定値
    pub retention_days: Option<i64>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            include_audit_logs: true,
            include_user_data: true,
            include_consents: true,
            encrypt_backup: true,
            compression_level: 6,
            retention_days: None,
        }
    }
}

impl BackupConfig {
    fn data_types(&self) -> Vec<BackupDataType> {
        let mut types = Vec::new();
        if self.include_user_data {
            types.push(BackupDataType::User);
        }
        if self.include_consents {
            types.push(BackupDataType::Consents);
        }
        if self.include_audit_logs {
            types.push(BackupDataType::AuditLogs);
        }
        types
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreOptions {
    pub backup_id: Uuid,
    /// 未指定ならバックアップに含まれる全種別
    pub data_types: Option<Vec<BackupDataType>>,
    pub verify_integrity: bool,
    pub create_audit_log: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreError {
    pub data_type: BackupDataType,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    pub success: bool,
    pub restored_data_types: Vec<BackupDataType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<RestoreError>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupResult {
    pub deleted_count: u64,
    pub errors: Vec<String>,
}

/// ユーザーデータのスナップショット作成と復元
#[derive(Clone)]
pub struct BackupService {
    repository: BackupMetadataRepository,
    user_repository: UserRepository,
    consent_repository: UserConsentRepository,
    audit_repository: AuditLogRepository,
    audit: AuditLogService,
    storage: Arc<dyn StorageService>,
    master_key: Arc<Vec<u8>>,
    default_retention_days: i64,
}

impl BackupService {
    pub fn new(
        db: DatabaseConnection,
        audit: AuditLogService,
        storage: Arc<dyn StorageService>,
        master_key: Vec<u8>,
        default_retention_days: i64,
    ) -> Self {
        Self {
            repository: BackupMetadataRepository::new(db.clone()),
            user_repository: UserRepository::new(db.clone()),
            consent_repository: UserConsentRepository::new(db.clone()),
            audit_repository: AuditLogRepository::new(db),
            audit,
            storage,
            master_key: Arc::new(master_key),
            default_retention_days,
        }
    }

    /// バックアップを作成する。失敗時はBLOBもメタデータも残さない
    pub async fn create_backup(
        &self,
        user_id: Uuid,
        config: BackupConfig,
        context: &AuditContext,
    ) -> AppResult<BackupModel> {
        match self.create_backup_inner(user_id, &config).await {
            Ok(backup) => {
                // BLOB とメタデータは確定済み。監査ログの失敗で作成結果を覆さない
                self.audit
                    .log_best_effort(
                        AuditLogBuilder::new(AuditAction::Create, resource::DATA_BACKUP)
                            .user(user_id)
                            .resource_id(backup.id)
                            .context(context)
                            .metadata(json!({
                                "size": backup.size,
                                "encrypted": backup.encrypted,
                                "compression_level": backup.compression_level,
                                "data_types": backup.data_types,
                                "expires_at": backup.expires_at,
                            })),
                    )
                    .await;

                log_with_context!(
                    tracing::Level::INFO,
                    "Backup created",
                    "user_id" => user_id,
                    "backup_id" => backup.id,
                    "size" => backup.size,
                    "encrypted" => backup.encrypted,
                );
                Ok(backup)
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Backup creation failed");
                self.audit
                    .log_best_effort(
                        AuditLogBuilder::new(AuditAction::Create, resource::DATA_BACKUP)
                            .user(user_id)
                            .context(context)
                            .failure(e.error_message()),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn create_backup_inner(
        &self,
        user_id: Uuid,
        config: &BackupConfig,
    ) -> AppResult<BackupModel> {
        let data_types = config.data_types();
        if data_types.is_empty() {
            return Err(AppError::ValidationError(
                "At least one data type must be included in a backup".to_string(),
            ));
        }
        if config.compression_level > 9 {
            return Err(AppError::ValidationError(
                "compression_level must be between 0 and 9".to_string(),
            ));
        }
        let retention_days = config.retention_days.unwrap_or(self.default_retention_days);
        if retention_days <= 0 {
            return Err(AppError::ValidationError(
                "retention_days must be positive".to_string(),
            ));
        }

        let backup_id = Uuid::new_v4();
        let created_at = time::now();
        let bundle = self
            .collect_bundle(backup_id, user_id, created_at, &data_types)
            .await?;

        let mut payload = bundle.encode(config.compression_level)?;
        if config.encrypt_backup {
            payload = crypto::encrypt_backup(&self.master_key, backup_id, &payload)?;
        }
        let checksum = crypto::sha256_hex(&payload);

        let storage_key = backup_storage_key(user_id, backup_id, created_at);
        self.storage
            .store(&storage_key, &payload, BACKUP_CONTENT_TYPE)
            .await?;

        let metadata = BackupActiveModel {
            id: Set(backup_id),
            user_id: Set(user_id),
            storage_key: Set(storage_key.clone()),
            size: Set(payload.len() as i64),
            checksum: Set(checksum),
            encrypted: Set(config.encrypt_backup),
            compression_level: Set(config.compression_level as i32),
            data_types: Set(json!(data_types)),
            expires_at: Set(created_at + Duration::days(retention_days)),
            created_at: Set(created_at),
        };

        match self.repository.create(metadata).await {
            Ok(backup) => Ok(backup),
            Err(e) => {
                // メタデータが保存できなければBLOBも消す
                if let Err(cleanup_err) = self.storage.delete(&storage_key).await {
                    warn!(
                        storage_key = %storage_key,
                        error = %cleanup_err,
                        "Failed to remove orphaned backup blob"
                    );
                }
                Err(e.into())
            }
        }
    }

    async fn collect_bundle(
        &self,
        backup_id: Uuid,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        data_types: &[BackupDataType],
    ) -> AppResult<BackupBundle> {
        let mut bundle = BackupBundle {
            format_version: BUNDLE_FORMAT_VERSION,
            backup_id,
            user_id,
            created_at,
            user: None,
            consents: None,
            audit_logs: None,
        };

        for data_type in data_types {
            match data_type {
                BackupDataType::User => {
                    bundle.user = self.user_repository.find_by_id(user_id).await?;
                }
                BackupDataType::Consents => {
                    let mut consents = self.consent_repository.list_by_user(user_id).await?;
                    consents.reverse();
                    bundle.consents = Some(consents);
                }
                BackupDataType::AuditLogs => {
                    bundle.audit_logs =
                        Some(self.audit_repository.find_all_by_user(user_id).await?);
                }
            }
        }

        Ok(bundle)
    }

    /// 所有者・期限を確認してメタデータを返す
    pub async fn get_backup(&self, backup_id: Uuid, user_id: Uuid) -> AppResult<BackupModel> {
        let backup = self
            .repository
            .find_by_id(backup_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Backup not found".to_string()))?;

        if backup.user_id != user_id {
            warn!(
                backup_id = %backup_id,
                requested_by = %user_id,
                "Backup ownership mismatch"
            );
            return Err(AppError::OwnershipMismatch("Backup not found".to_string()));
        }

        if backup.is_expired_at(time::now()) {
            return Err(AppError::Expired("Backup has expired".to_string()));
        }

        Ok(backup)
    }

    pub async fn restore_data(
        &self,
        user_id: Uuid,
        options: RestoreOptions,
        context: &AuditContext,
    ) -> AppResult<RestoreResult> {
        let backup = self.get_backup(options.backup_id, user_id).await?;

        let blob = self.storage.retrieve(&backup.storage_key).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::IntegrityCheckFailed(
                "Backup blob is missing from storage".to_string(),
            ),
            other => other,
        })?;

        if options.verify_integrity {
            let actual = crypto::sha256_hex(&blob);
            if !crypto::codes_match(&backup.checksum, &actual) {
                warn!(
                    backup_id = %backup.id,
                    expected = %backup.checksum,
                    actual = %actual,
                    "Backup checksum mismatch"
                );
                if options.create_audit_log {
                    self.audit
                        .log_best_effort(
                            AuditLogBuilder::new(AuditAction::Restore, resource::DATA_BACKUP)
                                .user(user_id)
                                .resource_id(backup.id)
                                .context(context)
                                .failure("Integrity check failed"),
                        )
                        .await;
                }
                return Err(AppError::IntegrityCheckFailed(format!(
                    "Checksum mismatch for backup {}",
                    backup.id
                )));
            }
        }

        let payload = if backup.encrypted {
            crypto::decrypt_backup(&self.master_key, backup.id, &blob)?
        } else {
            blob
        };
        let bundle = BackupBundle::decode(&payload, backup.compression_level > 0)?;
        if bundle.user_id != user_id || bundle.backup_id != backup.id {
            return Err(AppError::IntegrityCheckFailed(
                "Backup payload does not belong to this backup".to_string(),
            ));
        }

        let available = backup.data_type_list();
        let mut requested = options.data_types.clone().unwrap_or_else(|| available.clone());
        requested.sort();
        requested.dedup();

        let mut restored = Vec::new();
        let mut errors = Vec::new();
        for data_type in BackupDataType::all()
            .into_iter()
            .filter(|t| requested.contains(t))
        {
            let outcome = if available.contains(&data_type) {
                self.restore_type(data_type, &bundle).await
            } else {
                Err(AppError::NotFound(format!(
                    "{} is not included in this backup",
                    data_type.as_str()
                )))
            };

            match outcome {
                Ok(count) => {
                    info!(
                        backup_id = %backup.id,
                        data_type = data_type.as_str(),
                        restored = count,
                        "Data type restored"
                    );
                    restored.push(data_type);
                }
                Err(e) => {
                    warn!(
                        backup_id = %backup.id,
                        data_type = data_type.as_str(),
                        error = %e,
                        "Data type restore failed"
                    );
                    errors.push(RestoreError {
                        data_type,
                        message: e.error_message(),
                    });
                }
            }
        }

        let result = RestoreResult {
            success: errors.is_empty(),
            restored_data_types: restored,
            errors: if errors.is_empty() {
                None
            } else {
                Some(errors)
            },
        };

        if options.create_audit_log {
            let outcome = match (&result.errors, result.restored_data_types.is_empty()) {
                (None, _) => AuditResult::Success,
                (Some(_), false) => AuditResult::Partial,
                (Some(_), true) => AuditResult::Failure,
            };
            self.audit
                .log(
                    AuditLogBuilder::new(AuditAction::Restore, resource::DATA_BACKUP)
                        .user(user_id)
                        .resource_id(backup.id)
                        .context(context)
                        .result(outcome)
                        .metadata(json!({
                            "restored_data_types": result.restored_data_types,
                            "errors": result.errors,
                            "verify_integrity": options.verify_integrity,
                        })),
                )
                .await?;
        }

        Ok(result)
    }

    async fn restore_type(
        &self,
        data_type: BackupDataType,
        bundle: &BackupBundle,
    ) -> AppResult<u64> {
        match data_type {
            BackupDataType::User => {
                let user = bundle.user.clone().ok_or_else(|| {
                    AppError::NotFound("Backup contains no user profile".to_string())
                })?;
                if user.id != bundle.user_id {
                    return Err(AppError::IntegrityCheckFailed(
                        "User profile id does not match backup owner".to_string(),
                    ));
                }
                self.user_repository.upsert(user).await?;
                Ok(1)
            }
            BackupDataType::Consents => {
                let mut inserted = 0;
                for consent in bundle.consents.clone().unwrap_or_default() {
                    if consent.user_id != bundle.user_id {
                        continue;
                    }
                    if self.consent_repository.insert_if_missing(consent).await? {
                        inserted += 1;
                    }
                }
                Ok(inserted)
            }
            BackupDataType::AuditLogs => {
                let mut inserted = 0;
                for entry in bundle.audit_logs.clone().unwrap_or_default() {
                    if entry.user_id != Some(bundle.user_id) {
                        continue;
                    }
                    if self.audit_repository.insert_if_missing(entry).await? {
                        inserted += 1;
                    }
                }
                Ok(inserted)
            }
        }
    }

    /// 期限内のバックアップ一覧 (期限切れは存在しないものとして扱う)
    pub async fn list_user_backups(&self, user_id: Uuid) -> AppResult<Vec<BackupModel>> {
        Ok(self
            .repository
            .find_active_by_user(user_id, time::now())
            .await?)
    }

    pub async fn delete_backup(
        &self,
        backup_id: Uuid,
        user_id: Uuid,
        context: &AuditContext,
    ) -> AppResult<()> {
        let backup = self
            .repository
            .find_by_id(backup_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Backup not found".to_string()))?;
        if backup.user_id != user_id {
            return Err(AppError::OwnershipMismatch("Backup not found".to_string()));
        }

        self.storage.delete(&backup.storage_key).await?;
        self.repository.delete(backup.id).await?;

        self.audit
            .log(
                AuditLogBuilder::new(AuditAction::Delete, resource::DATA_BACKUP)
                    .user(user_id)
                    .resource_id(backup.id)
                    .context(context),
            )
            .await?;

        info!(backup_id = %backup_id, user_id = %user_id, "Backup deleted");
        Ok(())
    }

    /// 期限切れのバックアップをすべて削除する (定期メンテナンス)
    pub async fn cleanup_expired_backups(&self) -> AppResult<CleanupResult> {
        let expired = self.repository.find_expired(time::now()).await?;
        let mut result = CleanupResult::default();

        for backup in expired {
            // BLOB が消せなかった場合はメタデータを残して次回再試行する
            if let Err(e) = self.storage.delete(&backup.storage_key).await {
                result
                    .errors
                    .push(format!("{}: {}", backup.id, e.error_message()));
                continue;
            }
            match self.repository.delete(backup.id).await {
                Ok(_) => result.deleted_count += 1,
                Err(e) => result.errors.push(format!("{}: {}", backup.id, e)),
            }
        }

        if result.deleted_count > 0 || !result.errors.is_empty() {
            self.audit
                .log_best_effort(
                    AuditLogBuilder::new(AuditAction::Purge, resource::DATA_BACKUP)
                        .result(if result.errors.is_empty() {
                            AuditResult::Success
                        } else {
                            AuditResult::Partial
                        })
                        .metadata(json!({
                            "deleted_count": result.deleted_count,
                            "errors": result.errors,
                        })),
                )
                .await;
        }

        info!(
            deleted_count = result.deleted_count,
            error_count = result.errors.len(),
            "Expired backup cleanup completed"
        );
        Ok(result)
    }
}

/// BLOB のキーはバックアップIDと作成時刻で決まる
fn backup_storage_key(user_id: Uuid, backup_id: Uuid, created_at: DateTime<Utc>) -> String {
    format!(
        "backups/{}/{}_{}.bin",
        user_id,
        backup_id,
        created_at.format("%Y%m%dT%H%M%S%6fZ")
    )
}
