// privacy-backend/src/features/export/services/export.rs

use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::{
    resource, AuditAction, AuditContext, AuditLogBuilder,
};
use crate::features::audit::repositories::AuditLogRepository;
use crate::features::audit::services::AuditLogService;
use crate::features::consent::repositories::UserConsentRepository;
use crate::features::data_domain::DataDomainRegistry;
use crate::features::deletion::repositories::DataDeletionRequestRepository;
use crate::features::export::models::data_export_request::{
    ActiveModel as ExportActiveModel, ExportFormat, ExportStatus, Model as ExportModel,
};
use crate::features::export::repositories::{DataExportRequestRepository, ExportArtifact};
use crate::features::export::services::serializer;
use crate::features::user::repositories::UserRepository;
use crate::infrastructure::notifier::{NotificationEvent, Notifier};
use crate::infrastructure::storage::StorageService;
use crate::jobs::{Job, JobSender, RetryPolicy};
use crate::log_with_context;
use crate::utils::time;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, Set};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// 組み込みのエクスポート対象。登録済みの外部ドメイン名も指定できる
pub const BUILTIN_EXPORT_TYPES: [&str; 5] = [
    "user",
    "consents",
    "audit_logs",
    "export_requests",
    "deletion_requests",
];

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub expiry_days: i64,
    pub download_base_url: String,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct ExportDownload {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpireResult {
    pub expired_count: u64,
    pub errors: Vec<String>,
}

/// データエクスポート (データポータビリティ) のワークフロー
#[derive(Clone)]
pub struct ExportService {
    repository: DataExportRequestRepository,
    user_repository: UserRepository,
    consent_repository: UserConsentRepository,
    audit_repository: AuditLogRepository,
    deletion_repository: DataDeletionRequestRepository,
    audit: AuditLogService,
    storage: Arc<dyn StorageService>,
    notifier: Arc<dyn Notifier>,
    domains: DataDomainRegistry,
    jobs: JobSender,
    settings: ExportSettings,
}

impl ExportService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: DatabaseConnection,
        audit: AuditLogService,
        storage: Arc<dyn StorageService>,
        notifier: Arc<dyn Notifier>,
        domains: DataDomainRegistry,
        jobs: JobSender,
        settings: ExportSettings,
    ) -> Self {
        Self {
            repository: DataExportRequestRepository::new(db.clone()),
            user_repository: UserRepository::new(db.clone()),
            consent_repository: UserConsentRepository::new(db.clone()),
            audit_repository: AuditLogRepository::new(db.clone()),
            deletion_repository: DataDeletionRequestRepository::new(db),
            audit,
            storage,
            notifier,
            domains,
            jobs,
            settings,
        }
    }

    pub fn repository(&self) -> &DataExportRequestRepository {
        &self.repository
    }

    /// 指定可能なデータ種別 (組み込み + 登録済みドメイン)
    pub fn supported_data_types(&self) -> Vec<String> {
        BUILTIN_EXPORT_TYPES
            .iter()
            .map(|t| t.to_string())
            .chain(self.domains.names())
            .collect()
    }

    fn validate_data_types(&self, data_types: &[String]) -> AppResult<Vec<String>> {
        if data_types.is_empty() {
            return Err(AppError::ValidationError(
                "At least one data type must be requested".to_string(),
            ));
        }

        let mut normalized: Vec<String> = Vec::new();
        let mut unknown = Vec::new();
        for data_type in data_types {
            let data_type = data_type.trim();
            if !BUILTIN_EXPORT_TYPES.contains(&data_type) && !self.domains.contains(data_type) {
                unknown.push(format!("data_types: unsupported data type '{}'", data_type));
                continue;
            }
            if !normalized.iter().any(|t| t == data_type) {
                normalized.push(data_type.to_string());
            }
        }

        if !unknown.is_empty() {
            return Err(AppError::ValidationErrors(unknown));
        }
        Ok(normalized)
    }

    /// エクスポートを受け付け、処理をキューに積んで即座に返す
    pub async fn request_export(
        &self,
        user_id: Uuid,
        format: ExportFormat,
        data_types: Vec<String>,
        context: &AuditContext,
    ) -> AppResult<ExportModel> {
        let data_types = self.validate_data_types(&data_types)?;
        let now = time::now();

        let request = self
            .repository
            .create(ExportActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                status: Set(ExportStatus::Pending),
                format: Set(format),
                data_types: Set(json!(data_types)),
                file_path: Set(None),
                file_size: Set(None),
                download_url: Set(None),
                expires_at: Set(now + Duration::days(self.settings.expiry_days)),
                processed_at: Set(None),
                error_message: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .await?;

        self.audit
            .log(
                AuditLogBuilder::new(AuditAction::Create, resource::DATA_EXPORT)
                    .user(user_id)
                    .resource_id(request.id)
                    .context(context)
                    .metadata(json!({
                        "format": format,
                        "data_types": request.data_types,
                    })),
            )
            .await?;

        self.jobs.dispatch(Job::ProcessExport(request.id));

        log_with_context!(
            tracing::Level::INFO,
            "Data export requested",
            "user_id" => user_id,
            "request_id" => request.id,
            "format" => format.extension(),
        );
        Ok(request)
    }

    /// ワーカー本体。pending からの遷移は一度だけ行い、結果は必ず記録する
    pub async fn process_export(&self, request_id: Uuid) -> AppResult<()> {
        if !self.repository.claim_pending(request_id).await? {
            info!(request_id = %request_id, "Export is not pending, skipping");
            return Ok(());
        }

        // claim 以降のエラーはすべて failed として記録する
        let request = match self.repository.find_by_id(request_id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                warn!(request_id = %request_id, "Export request vanished after claim");
                return Ok(());
            }
            Err(e) => {
                self.fail_export(request_id, None, &e.into()).await;
                return Ok(());
            }
        };

        let outcome = self
            .settings
            .retry
            .run("export_generation", || self.generate_export(&request))
            .await;

        match outcome {
            Ok(artifact) => self.finish_export(&request, artifact).await,
            Err(e) => self.fail_export(request.id, Some(request.user_id), &e).await,
        }
        Ok(())
    }

    /// 起動時の復旧。前回プロセスで processing のまま残ったものを戻し、pending を再投入する
    pub async fn requeue_unfinished(&self, started_at: DateTime<Utc>) -> AppResult<usize> {
        let released = self.repository.release_processing(started_at).await?;
        if released > 0 {
            warn!(released, "Released exports left in processing state");
        }

        let pending = self.repository.find_pending().await?;
        for request in &pending {
            self.jobs.dispatch(Job::ProcessExport(request.id));
        }
        Ok(pending.len())
    }

    async fn finish_export(&self, request: &ExportModel, artifact: ExportArtifact) {
        match self.repository.mark_completed(request.id, &artifact).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(request_id = %request.id, "Export left processing state before completion");
                self.discard_artifact(request.id, &artifact.file_path).await;
                return;
            }
            Err(e) => {
                self.discard_artifact(request.id, &artifact.file_path).await;
                self.fail_export(request.id, Some(request.user_id), &e.into())
                    .await;
                return;
            }
        }

        self.audit
            .log_best_effort(
                AuditLogBuilder::new(AuditAction::Export, resource::DATA_EXPORT)
                    .user(request.user_id)
                    .resource_id(request.id)
                    .metadata(json!({
                        "format": request.format,
                        "file_size": artifact.file_size,
                        "data_types": request.data_types,
                    })),
            )
            .await;

        let payload = json!({
            "request_id": request.id,
            "download_url": artifact.download_url,
            "expires_at": request.expires_at,
        });
        if let Err(e) = self
            .notifier
            .notify(request.user_id, NotificationEvent::ExportReady, payload)
            .await
        {
            warn!(request_id = %request.id, error = %e, "Export notification failed");
        }

        info!(
            request_id = %request.id,
            user_id = %request.user_id,
            file_size = artifact.file_size,
            "Data export completed"
        );
    }

    async fn discard_artifact(&self, request_id: Uuid, file_path: &str) {
        if let Err(e) = self.storage.delete(file_path).await {
            warn!(request_id = %request_id, error = %e, "Failed to discard export file");
        }
    }

    /// user_id が分からない場合 (claim 直後の読み込み失敗) は通知を送らない
    async fn fail_export(&self, request_id: Uuid, user_id: Option<Uuid>, cause: &AppError) {
        let message = cause.error_message();
        error!(request_id = %request_id, error = %message, "Data export failed");

        if let Err(e) = self.repository.mark_failed(request_id, &message).await {
            error!(request_id = %request_id, error = %e, "Failed to record export failure");
        }

        let mut entry = AuditLogBuilder::new(AuditAction::Export, resource::DATA_EXPORT)
            .resource_id(request_id)
            .failure(message.clone());
        if let Some(user_id) = user_id {
            entry = entry.user(user_id);
        }
        self.audit.log_best_effort(entry).await;

        let Some(user_id) = user_id else {
            return;
        };
        if let Err(e) = self
            .notifier
            .notify(
                user_id,
                NotificationEvent::ExportFailed,
                json!({ "request_id": request_id }),
            )
            .await
        {
            warn!(request_id = %request_id, error = %e, "Export failure notification failed");
        }
    }

    async fn generate_export(&self, request: &ExportModel) -> AppResult<ExportArtifact> {
        let document = self.collect_document(request).await?;
        let bytes = serializer::serialize(&document, request.format)?;

        let key = export_storage_key(request);
        let file_path = self
            .storage
            .store(&key, &bytes, request.format.content_type())
            .await?;

        Ok(ExportArtifact {
            file_path,
            file_size: bytes.len() as i64,
            download_url: format!(
                "{}/{}/download",
                self.settings.download_base_url.trim_end_matches('/'),
                request.id
            ),
        })
    }

    /// {"metadata", 各データ種別...} の文書を組み立てる
    async fn collect_document(&self, request: &ExportModel) -> AppResult<Value> {
        let data_types = request.data_type_list();
        let mut document = Map::new();
        document.insert(
            "metadata".to_string(),
            json!({
                "format_version": EXPORT_FORMAT_VERSION,
                "request_id": request.id,
                "user_id": request.user_id,
                "format": request.format,
                "data_types": data_types,
                "generated_at": time::now(),
            }),
        );

        for data_type in &data_types {
            let section = self.collect_section(request.user_id, data_type).await?;
            document.insert(data_type.clone(), section);
        }

        Ok(Value::Object(document))
    }

    async fn collect_section(&self, user_id: Uuid, data_type: &str) -> AppResult<Value> {
        let value = match data_type {
            "user" => to_value(&self.user_repository.find_by_id(user_id).await?)?,
            "consents" => to_value(&self.consent_repository.list_by_user(user_id).await?)?,
            "audit_logs" => to_value(&self.audit_repository.find_all_by_user(user_id).await?)?,
            "export_requests" => to_value(&self.repository.list_by_user(user_id).await?)?,
            "deletion_requests" => {
                to_value(&self.deletion_repository.list_by_user(user_id).await?)?
            }
            name => match self.domains.get(name) {
                Some(domain) => domain.collect(user_id).await?,
                None => {
                    return Err(AppError::ValidationError(format!(
                        "Unsupported data type '{}'",
                        name
                    )))
                }
            },
        };
        Ok(value)
    }

    /// 完了済みエクスポートのファイルを返す
    pub async fn download_export(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        context: &AuditContext,
    ) -> AppResult<ExportDownload> {
        let request = self.find_owned(request_id, user_id).await?;

        if request.is_expired_at(time::now()) {
            return Err(AppError::Expired("Export has expired".to_string()));
        }
        if request.status != ExportStatus::Completed {
            return Err(AppError::NotReady(format!(
                "Export is {}",
                request.status.as_str()
            )));
        }
        let file_path = request
            .file_path
            .clone()
            .ok_or_else(|| AppError::NotReady("Export file is not available".to_string()))?;

        let bytes = self.storage.retrieve(&file_path).await?;

        self.audit
            .log(
                AuditLogBuilder::new(AuditAction::Read, resource::DATA_EXPORT)
                    .user(user_id)
                    .resource_id(request.id)
                    .context(context)
                    .metadata(json!({ "file_size": bytes.len() })),
            )
            .await?;

        Ok(ExportDownload {
            bytes,
            content_type: request.format.content_type(),
            file_name: format!("export_{}.{}", request.id, request.format.extension()),
        })
    }

    pub async fn get_export(&self, request_id: Uuid, user_id: Uuid) -> AppResult<ExportModel> {
        let request = self.find_owned(request_id, user_id).await?;
        Ok(request.with_effective_status(time::now()))
    }

    pub async fn list_exports(&self, user_id: Uuid) -> AppResult<Vec<ExportModel>> {
        let now = time::now();
        Ok(self
            .repository
            .list_by_user(user_id)
            .await?
            .into_iter()
            .map(|r| r.with_effective_status(now))
            .collect())
    }

    /// レコードとファイルを削除する
    pub async fn delete_export(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        context: &AuditContext,
    ) -> AppResult<()> {
        let request = self.find_owned(request_id, user_id).await?;

        if let Some(path) = &request.file_path {
            self.storage.delete(path).await?;
        }
        self.repository.delete(request.id).await?;

        self.audit
            .log(
                AuditLogBuilder::new(AuditAction::Delete, resource::DATA_EXPORT)
                    .user(user_id)
                    .resource_id(request.id)
                    .context(context),
            )
            .await?;

        info!(request_id = %request_id, user_id = %user_id, "Data export deleted");
        Ok(())
    }

    /// ユーザーの全エクスポートとファイルを削除する (削除ワークフロー用)
    pub async fn purge_user_exports(&self, user_id: Uuid) -> AppResult<u64> {
        for request in self.repository.list_by_user(user_id).await? {
            if let Some(path) = &request.file_path {
                self.storage.delete(path).await?;
            }
        }
        Ok(self.repository.delete_by_user(user_id).await?)
    }

    /// 期限切れエクスポートを expired にしてファイルを回収する (定期メンテナンス)
    pub async fn expire_stale_exports(&self) -> AppResult<ExpireResult> {
        let stale = self.repository.find_stale(time::now()).await?;
        let mut result = ExpireResult::default();

        for request in stale {
            if let Some(path) = &request.file_path {
                if let Err(e) = self.storage.delete(path).await {
                    result
                        .errors
                        .push(format!("{}: {}", request.id, e.error_message()));
                    continue;
                }
            }
            match self.repository.mark_expired(request.id).await {
                Ok(true) => result.expired_count += 1,
                Ok(false) => {}
                Err(e) => result.errors.push(format!("{}: {}", request.id, e)),
            }
        }

        info!(
            expired_count = result.expired_count,
            error_count = result.errors.len(),
            "Stale export sweep completed"
        );
        Ok(result)
    }

    async fn find_owned(&self, request_id: Uuid, user_id: Uuid) -> AppResult<ExportModel> {
        let request = self
            .repository
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Export request not found".to_string()))?;

        if request.user_id != user_id {
            warn!(
                request_id = %request_id,
                requested_by = %user_id,
                "Export ownership mismatch"
            );
            return Err(AppError::OwnershipMismatch(
                "Export request not found".to_string(),
            ));
        }
        Ok(request)
    }
}

fn to_value<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::InternalServerError(format!("Failed to collect export data: {}", e)))
}

fn export_storage_key(request: &ExportModel) -> String {
    format!(
        "exports/{}/{}.{}",
        request.user_id,
        request.id,
        request.format.extension()
    )
}
