// privacy-backend/src/jobs/runner.rs

use crate::error::AppResult;
use crate::features::deletion::services::DeletionService;
use crate::features::export::services::ExportService;
use crate::jobs::queue::{Job, JobReceiver};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job) -> AppResult<()>;
}

/// エクスポート/削除ワークフローへの振り分け
#[derive(Clone)]
pub struct PrivacyJobHandler {
    exports: ExportService,
    deletions: DeletionService,
}

impl PrivacyJobHandler {
    pub fn new(exports: ExportService, deletions: DeletionService) -> Self {
        Self { exports, deletions }
    }
}

#[async_trait]
impl JobHandler for PrivacyJobHandler {
    async fn handle(&self, job: Job) -> AppResult<()> {
        match job {
            Job::ProcessExport(id) => self.exports.process_export(id).await,
            Job::ProcessDeletion(id) => self.deletions.process_deletion(id).await,
        }
    }
}

/// 1 ジョブを実行して結果をログに残す。エラーはここで止める
async fn execute(handler: &dyn JobHandler, job: Job) {
    let started = Instant::now();
    tracing::info!(job = job.kind(), request_id = %job.request_id(), "Job started");

    match handler.handle(job).await {
        Ok(()) => tracing::info!(
            job = job.kind(),
            request_id = %job.request_id(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Job finished"
        ),
        Err(e) => tracing::error!(
            job = job.kind(),
            request_id = %job.request_id(),
            retryable = e.is_retryable(),
            error = %e,
            "Job failed"
        ),
    }
}

/// キューを消費するワーカープール
pub struct JobRunner {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl JobRunner {
    pub fn start(receiver: JobReceiver, handler: Arc<dyn JobHandler>, max_workers: usize) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(Self::worker_pool(
            receiver,
            handler,
            max_workers.max(1),
            shutdown_rx,
        ));
        Self {
            shutdown_tx,
            handle,
        }
    }

    async fn worker_pool(
        mut receiver: JobReceiver,
        handler: Arc<dyn JobHandler>,
        max_workers: usize,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(max_workers = max_workers, "Job runner started");
        let semaphore = Arc::new(Semaphore::new(max_workers));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Job runner shutting down");
                    break;
                }
                job = receiver.recv() => {
                    let Some(job) = job else {
                        tracing::info!("Job queue closed");
                        break;
                    };
                    let permit = match Arc::clone(&semaphore).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        execute(handler.as_ref(), job).await;
                        drop(permit);
                    });
                }
            }
        }

        // 実行中のジョブが終わるまで待つ
        let _ = semaphore.acquire_many(max_workers as u32).await;
        tracing::info!("Job runner stopped");
    }

    /// 新しいジョブの受け付けを止め、実行中のジョブの完了を待つ。
    /// キューに残ったジョブは破棄され、次回起動時に AppState::recover_jobs で再投入される
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Job runner task panicked");
        }
    }
}

/// キューに溜まっているジョブをその場で順に実行する (テスト・CLI 用)
pub async fn drain(receiver: &mut JobReceiver, handler: &dyn JobHandler) -> usize {
    let mut processed = 0;
    while let Some(job) = receiver.try_recv() {
        execute(handler, job).await;
        processed += 1;
    }
    processed
}
