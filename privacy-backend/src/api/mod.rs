// privacy-backend/src/api/mod.rs

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::features::audit::handler::audit_router;
use crate::features::audit::services::AuditLogService;
use crate::features::backup::handler::backup_router;
use crate::features::backup::services::BackupService;
use crate::features::compliance::handler::compliance_router;
use crate::features::compliance::services::ComplianceService;
use crate::features::consent::handler::consent_router;
use crate::features::consent::services::ConsentService;
use crate::features::data_domain::DataDomainRegistry;
use crate::features::deletion::handler::deletion_router;
use crate::features::deletion::services::deletion::DeletionSettings;
use crate::features::deletion::services::DeletionService;
use crate::features::export::handler::export_router;
use crate::features::export::services::export::ExportSettings;
use crate::features::export::services::ExportService;
use crate::infrastructure::notifier::Notifier;
use crate::infrastructure::storage::StorageService;
use crate::jobs::{JobQueue, JobReceiver, PrivacyJobHandler};
use crate::logging::{inject_request_context, logging_middleware};
use crate::middleware::{rate_limit_middleware, RateLimiter};
use crate::types::ApiResponse;
use crate::utils::time;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// 統一されたアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub audit_service: AuditLogService,
    pub consent_service: ConsentService,
    pub backup_service: BackupService,
    pub export_service: ExportService,
    pub deletion_service: DeletionService,
    pub compliance_service: ComplianceService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// サービス一式を組み立てる。返される JobReceiver はワーカー (JobRunner) に渡す
    pub fn build(
        db: DatabaseConnection,
        config: AppConfig,
        storage: Arc<dyn StorageService>,
        notifier: Arc<dyn Notifier>,
        domains: DataDomainRegistry,
    ) -> (Self, JobReceiver) {
        let (jobs, receiver) = JobQueue::channel();
        let retry = config.jobs.retry_policy();
        let policy = &config.policy;

        let audit_service = AuditLogService::new(db.clone());
        let consent_service = ConsentService::new(
            db.clone(),
            audit_service.clone(),
            policy.consent_policy_version.clone(),
        );
        let backup_service = BackupService::new(
            db.clone(),
            audit_service.clone(),
            storage.clone(),
            config.backup_encryption_key.clone(),
            policy.backup_retention_days,
        );
        let export_service = ExportService::new(
            db.clone(),
            audit_service.clone(),
            storage,
            notifier.clone(),
            domains.clone(),
            jobs.clone(),
            ExportSettings {
                expiry_days: policy.export_expiry_days,
                download_base_url: config.download_base_url.clone(),
                retry,
            },
        );
        let deletion_service = DeletionService::new(
            db.clone(),
            audit_service.clone(),
            backup_service.clone(),
            export_service.clone(),
            notifier,
            domains,
            jobs,
            DeletionSettings {
                grace_days: policy.deletion_grace_days,
                retry,
            },
        );
        let compliance_service =
            ComplianceService::new(db.clone(), audit_service.clone(), policy.score_weights);
        let rate_limiter = RateLimiter::per_hour(config.rate_limit_per_hour);

        let state = Self {
            config: Arc::new(config),
            db,
            audit_service,
            consent_service,
            backup_service,
            export_service,
            deletion_service,
            compliance_service,
            rate_limiter,
        };
        (state, receiver)
    }

    /// 前回プロセスで未完了だったジョブを永続化された状態から再投入する。
    /// ワーカー起動前に呼ぶこと
    pub async fn recover_jobs(&self) -> AppResult<usize> {
        let started_at = time::now();
        let exports = self.export_service.requeue_unfinished(started_at).await?;
        let deletions = self.deletion_service.requeue_unfinished(started_at).await?;
        tracing::info!(exports, deletions, "Recovered unfinished jobs");
        Ok(exports + deletions)
    }

    pub fn job_handler(&self) -> PrivacyJobHandler {
        PrivacyJobHandler::new(self.export_service.clone(), self.deletion_service.clone())
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
}

pub async fn health_handler(
    State(app_state): State<AppState>,
) -> AppResult<Json<ApiResponse<HealthStatus>>> {
    let database = match app_state.db.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            "unavailable"
        }
    };

    Ok(Json(ApiResponse::success(
        "Service is running",
        HealthStatus {
            status: "ok",
            database,
        },
    )))
}

/// CORS ミドルウェア設定
pub fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let allow_origin = match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(
                origin = allowed_origin,
                "Invalid CORS origin, cross-origin requests disabled"
            );
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// アプリケーション全体のルーター
pub fn app_router(app_state: AppState) -> Router {
    // 利用者向けの作成系エンドポイントだけレート制限する
    let user_routes = Router::new()
        .merge(consent_router(app_state.clone()))
        .merge(export_router(app_state.clone()))
        .merge(deletion_router(app_state.clone()))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let timeout = Duration::from_secs(app_state.config.server.request_timeout_secs);
    let cors = cors_layer(&app_state.config.cors_allowed_origin);

    let health = Router::new()
        .route("/health", get(health_handler))
        .with_state(app_state.clone());

    Router::new()
        .merge(health)
        .merge(user_routes)
        .merge(audit_router(app_state.clone()))
        .merge(backup_router(app_state.clone()))
        .merge(compliance_router(app_state))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(axum_middleware::from_fn(inject_request_context))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
}
