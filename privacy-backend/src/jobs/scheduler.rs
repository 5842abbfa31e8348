// privacy-backend/src/jobs/scheduler.rs

use crate::features::audit::services::AuditLogService;
use crate::features::backup::services::BackupService;
use crate::features::export::services::ExportService;
use crate::middleware::rate_limit::RateLimiter;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 1 回分の定期メンテナンス結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    pub backups_deleted: u64,
    pub exports_expired: u64,
    pub audit_logs_purged: u64,
    pub rate_limit_entries_swept: usize,
    pub errors: Vec<String>,
}

/// 期限切れバックアップ・エクスポートの回収と監査ログの保持期間処理
#[derive(Clone)]
pub struct MaintenanceScheduler {
    backups: BackupService,
    exports: ExportService,
    audit: AuditLogService,
    rate_limiter: RateLimiter,
    audit_retention_days: i64,
    interval: Duration,
}

pub struct MaintenanceHandle {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl MaintenanceHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Maintenance scheduler task panicked");
        }
    }
}

impl MaintenanceScheduler {
    pub fn new(
        backups: BackupService,
        exports: ExportService,
        audit: AuditLogService,
        rate_limiter: RateLimiter,
        audit_retention_days: i64,
        interval: Duration,
    ) -> Self {
        Self {
            backups,
            exports,
            audit,
            rate_limiter,
            audit_retention_days,
            interval,
        }
    }

    pub fn start(self) -> MaintenanceHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.interval.as_secs(),
                "Maintenance scheduler started"
            );
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            tracing::info!("Maintenance scheduler stopped");
        });

        MaintenanceHandle {
            shutdown_tx,
            handle,
        }
    }

    /// 各スイープを順に実行する。1 つが失敗しても残りは続ける
    pub async fn run_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match self.backups.cleanup_expired_backups().await {
            Ok(result) => {
                report.backups_deleted = result.deleted_count;
                report.errors.extend(result.errors);
            }
            Err(e) => report.errors.push(format!("backup cleanup: {}", e)),
        }

        match self.exports.expire_stale_exports().await {
            Ok(result) => {
                report.exports_expired = result.expired_count;
                report.errors.extend(result.errors);
            }
            Err(e) => report.errors.push(format!("export expiry: {}", e)),
        }

        match self.audit.purge_older_than(self.audit_retention_days).await {
            Ok(deleted) => report.audit_logs_purged = deleted,
            Err(e) => report.errors.push(format!("audit purge: {}", e)),
        }

        report.rate_limit_entries_swept = self.rate_limiter.store().sweep_expired().await;

        if report.errors.is_empty() {
            tracing::info!(
                backups_deleted = report.backups_deleted,
                exports_expired = report.exports_expired,
                audit_logs_purged = report.audit_logs_purged,
                rate_limit_entries_swept = report.rate_limit_entries_swept,
                "Maintenance sweep completed"
            );
        } else {
            tracing::warn!(
                error_count = report.errors.len(),
                errors = ?report.errors,
                "Maintenance sweep completed with errors"
            );
        }
        report
    }
}
