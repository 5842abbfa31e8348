// tests/common/app_helper.rs

use crate::common::{
    self, db::TestDatabase, mock_storage::FaultyStorage, notifier::RecordingNotifier,
};
use axum::Router;
use privacy_backend::api::{app_router, AppState};
use privacy_backend::config::AppConfig;
use privacy_backend::features::audit::models::audit_log::AuditContext;
use privacy_backend::features::data_domain::DataDomainRegistry;
use privacy_backend::infrastructure::storage::InMemoryStorage;
use privacy_backend::jobs::{drain, JobReceiver};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub struct TestApp {
    pub db: TestDatabase,
    pub state: AppState,
    pub storage: Arc<InMemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
    faulty_storage: Arc<FaultyStorage>,
    domains: DataDomainRegistry,
    receiver: JobReceiver,
}

impl TestApp {
    pub fn conn(&self) -> &DatabaseConnection {
        &self.db.connection
    }

    pub fn router(&self) -> Router {
        app_router(self.state.clone())
    }

    /// キューに積まれたジョブをその場で実行する
    pub async fn run_jobs(&mut self) -> usize {
        let handler = self.state.job_handler();
        drain(&mut self.receiver, &handler).await
    }

    /// 以降のストレージ書き込みを失敗させる
    pub fn fail_storage_writes(&self, fail: bool) {
        self.faulty_storage.set_fail_writes(fail);
    }

    /// プロセスの再起動を再現する。キュー上のジョブは失われ、DB とストレージは残る
    pub fn restart(&mut self) {
        let (state, receiver) = AppState::build(
            self.db.connection.clone(),
            self.state.config.as_ref().clone(),
            self.faulty_storage.clone(),
            self.notifier.clone(),
            self.domains.clone(),
        );
        self.state = state;
        self.receiver = receiver;
    }
}

pub fn context() -> AuditContext {
    AuditContext::with_client(
        Some("203.0.113.7".to_string()),
        Some("privacy-backend-tests/1.0".to_string()),
    )
}

pub async fn setup_app() -> TestApp {
    setup_app_with(AppConfig::for_testing(), DataDomainRegistry::new()).await
}

pub async fn setup_app_with(config: AppConfig, domains: DataDomainRegistry) -> TestApp {
    common::init_test_env();

    let db = TestDatabase::new().await;
    let storage = Arc::new(InMemoryStorage::new());
    let faulty_storage = Arc::new(FaultyStorage::new(storage.clone()));
    let notifier = Arc::new(RecordingNotifier::default());

    let (state, receiver) = AppState::build(
        db.connection.clone(),
        config,
        faulty_storage.clone(),
        notifier.clone(),
        domains.clone(),
    );

    TestApp {
        db,
        state,
        storage,
        notifier,
        faulty_storage,
        domains,
        receiver,
    }
}
