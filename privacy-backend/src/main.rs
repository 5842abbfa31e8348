// privacy-backend/src/main.rs
use migration::Migrator;
use privacy_backend::api::{app_router, AppState};
use privacy_backend::config::AppConfig;
use privacy_backend::db::create_db_pool;
use privacy_backend::features::data_domain::DataDomainRegistry;
use privacy_backend::infrastructure::notifier::TracingNotifier;
use privacy_backend::infrastructure::storage::create_storage_service;
use privacy_backend::jobs::{JobRunner, MaintenanceScheduler};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // トレーシングの設定
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "privacy_backend=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Starting Privacy Backend server...");

    // 設定を読み込む
    let app_config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded: {:?}", app_config);

    // データベース接続を作成
    let db_pool = create_db_pool(&app_config).await?;
    tracing::info!("Database pool created successfully.");

    Migrator::up(&db_pool, None).await?;
    tracing::info!("Database migrations applied.");

    let storage = create_storage_service(&app_config.storage);
    let notifier = Arc::new(TracingNotifier);
    let max_workers = app_config.jobs.max_workers;
    let sweep_interval = Duration::from_secs(app_config.sweep_interval_secs);
    let server_addr = app_config.server_addr();

    let (app_state, job_receiver) = AppState::build(
        db_pool,
        app_config,
        storage,
        notifier,
        DataDomainRegistry::new(),
    );

    let recovered = app_state.recover_jobs().await?;
    tracing::info!("Re-enqueued {} unfinished jobs.", recovered);

    // バックグラウンド処理
    let job_runner = JobRunner::start(
        job_receiver,
        Arc::new(app_state.job_handler()),
        max_workers,
    );
    let maintenance = MaintenanceScheduler::new(
        app_state.backup_service.clone(),
        app_state.export_service.clone(),
        app_state.audit_service.clone(),
        app_state.rate_limiter.clone(),
        app_state.config.policy.audit_retention_days,
        sweep_interval,
    )
    .start();

    // ルーターの設定
    let app_router = app_router(app_state);

    // サーバーの起動
    tracing::info!("Router configured. Server listening on {}", server_addr);

    let listener = TcpListener::bind(&server_addr).await?;
    axum::serve(listener, app_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining background work...");
    maintenance.shutdown().await;
    job_runner.shutdown().await;
    tracing::info!("Shutdown complete.");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
