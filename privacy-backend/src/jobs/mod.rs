// privacy-backend/src/jobs/mod.rs

//! バックグラウンドジョブ: キュー、ワーカープール、リトライ、定期メンテナンス

pub mod queue;
pub mod retry;
pub mod runner;
pub mod scheduler;

pub use queue::{Job, JobQueue, JobReceiver, JobSender};
pub use retry::RetryPolicy;
pub use runner::{drain, JobHandler, JobRunner, PrivacyJobHandler};
pub use scheduler::{MaintenanceHandle, MaintenanceReport, MaintenanceScheduler};

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub max_workers: usize,
    pub max_retries: u32,
    pub retry_base_ms: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_retries: 3,
            retry_base_ms: 500,
        }
    }
}

impl JobConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_ms))
    }
}
