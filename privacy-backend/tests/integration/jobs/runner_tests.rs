// tests/integration/jobs/runner_tests.rs

use crate::common::app_helper::context;
use crate::common::db::TestDatabase;
use crate::common::notifier::RecordingNotifier;
use crate::common::{init_test_env, test_data::create_user};
use privacy_backend::api::AppState;
use privacy_backend::config::AppConfig;
use privacy_backend::features::data_domain::DataDomainRegistry;
use privacy_backend::features::export::models::data_export_request::{ExportFormat, ExportStatus};
use privacy_backend::infrastructure::storage::InMemoryStorage;
use privacy_backend::jobs::JobRunner;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_runner_completes_queued_export() {
    // Arrange: バックグラウンドワーカーを起動
    init_test_env();
    let db = TestDatabase::new().await;
    let (state, receiver) = AppState::build(
        db.connection.clone(),
        AppConfig::for_testing(),
        Arc::new(InMemoryStorage::new()),
        Arc::new(RecordingNotifier::default()),
        DataDomainRegistry::new(),
    );
    let runner = JobRunner::start(receiver, Arc::new(state.job_handler()), 2);
    let user = create_user(&db.connection, "alice").await;

    // Act
    let request = state
        .export_service
        .request_export(user.id, ExportFormat::Json, vec!["user".to_string()], &context())
        .await
        .unwrap();

    // Assert: 完了するまで待つ
    let mut status = ExportStatus::Pending;
    for _ in 0..100 {
        status = state
            .export_service
            .get_export(request.id, user.id)
            .await
            .unwrap()
            .status;
        if status == ExportStatus::Completed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    runner.shutdown().await;

    assert_eq!(status, ExportStatus::Completed);
}
