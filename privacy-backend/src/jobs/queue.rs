// privacy-backend/src/jobs/queue.rs

use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    ProcessExport(Uuid),
    ProcessDeletion(Uuid),
}

impl Job {
    pub fn kind(&self) -> &'static str {
        match self {
            Job::ProcessExport(_) => "process_export",
            Job::ProcessDeletion(_) => "process_deletion",
        }
    }

    pub fn request_id(&self) -> Uuid {
        match self {
            Job::ProcessExport(id) | Job::ProcessDeletion(id) => *id,
        }
    }
}

/// サービスが保持する送信側。リクエスト処理をブロックしない
#[derive(Clone, Debug)]
pub struct JobSender {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobSender {
    /// ジョブを投入する。ランナーが停止していれば false
    pub fn dispatch(&self, job: Job) -> bool {
        match self.tx.send(job) {
            Ok(()) => {
                tracing::debug!(job = job.kind(), request_id = %job.request_id(), "Job enqueued");
                true
            }
            Err(_) => {
                tracing::warn!(
                    job = job.kind(),
                    request_id = %job.request_id(),
                    "Job queue is closed, job dropped"
                );
                false
            }
        }
    }
}

pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl JobReceiver {
    pub async fn recv(&mut self) -> Option<Job> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Job> {
        self.rx.try_recv().ok()
    }
}

pub struct JobQueue;

impl JobQueue {
    pub fn channel() -> (JobSender, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (JobSender { tx }, JobReceiver { rx })
    }
}
