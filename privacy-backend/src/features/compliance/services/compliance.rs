// privacy-backend/src/features/compliance/services/compliance.rs

use crate::config::ScoreWeights;
use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::{
    resource, AuditAction, AuditContext, AuditLogBuilder,
};
use crate::features::audit::repositories::AuditLogRepository;
use crate::features::audit::services::AuditLogService;
use crate::features::compliance::models::report::{
    build_report, AuditObservation, ComplianceReport, ReportInputs, RequestOutcome,
};
use crate::features::consent::repositories::UserConsentRepository;
use crate::features::deletion::models::data_deletion_request::{
    DeletionStatus, Model as DeletionModel,
};
use crate::features::deletion::repositories::DataDeletionRequestRepository;
use crate::features::export::models::data_export_request::{ExportStatus, Model as ExportModel};
use crate::features::export::repositories::DataExportRequestRepository;
use crate::utils::time;
use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use serde_json::json;
use tracing::info;

/// リクエストへの応答期限 (GDPR: 1か月)
pub const RESPONSE_DEADLINE_DAYS: i64 = 30;

#[derive(Clone)]
pub struct ComplianceService {
    consent_repository: UserConsentRepository,
    export_repository: DataExportRequestRepository,
    deletion_repository: DataDeletionRequestRepository,
    audit_repository: AuditLogRepository,
    audit: AuditLogService,
    weights: ScoreWeights,
}

impl ComplianceService {
    pub fn new(db: DatabaseConnection, audit: AuditLogService, weights: ScoreWeights) -> Self {
        Self {
            consent_repository: UserConsentRepository::new(db.clone()),
            export_repository: DataExportRequestRepository::new(db.clone()),
            deletion_repository: DataDeletionRequestRepository::new(db.clone()),
            audit_repository: AuditLogRepository::new(db),
            audit,
            weights,
        }
    }

    /// 期間内のデータを集めてレポートを作る
    pub async fn generate_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        context: &AuditContext,
    ) -> AppResult<ComplianceReport> {
        if start > end {
            return Err(AppError::ValidationError(
                "start_date must not be after end_date".to_string(),
            ));
        }

        let inputs = self.collect_inputs(start, end, time::now()).await?;
        let report = build_report(&inputs, &self.weights);

        self.audit
            .log(
                AuditLogBuilder::new(AuditAction::Read, resource::COMPLIANCE_REPORT)
                    .context(context)
                    .metadata(json!({
                        "period_start": start,
                        "period_end": end,
                        "compliance_score": report.compliance_score,
                        "risk_level": report.risk_assessment.level,
                    })),
            )
            .await?;

        info!(
            period_start = %start,
            period_end = %end,
            score = report.compliance_score,
            "Compliance report generated"
        );
        Ok(report)
    }

    async fn collect_inputs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        generated_at: DateTime<Utc>,
    ) -> AppResult<ReportInputs> {
        let consent_decisions = self
            .consent_repository
            .find_between(start, end)
            .await?
            .into_iter()
            .map(|c| (c.consent_type, c.status))
            .collect();

        let exports = self
            .export_repository
            .find_between(start, end)
            .await?
            .iter()
            .map(|r| export_outcome(r, generated_at))
            .collect();

        let deletions = self
            .deletion_repository
            .find_between(start, end)
            .await?
            .iter()
            .map(|r| deletion_outcome(r, generated_at))
            .collect();

        let audit_entries = self
            .audit_repository
            .find_actions_between(start, end)
            .await?
            .into_iter()
            .map(|(action, resource_type, result)| AuditObservation {
                action,
                resource_type,
                result,
            })
            .collect();

        Ok(ReportInputs {
            period_start: start,
            period_end: end,
            generated_at,
            consent_decisions,
            exports,
            deletions,
            audit_entries,
        })
    }
}

fn is_overdue(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    created_at + Duration::days(RESPONSE_DEADLINE_DAYS) < now
}

fn export_outcome(request: &ExportModel, now: DateTime<Utc>) -> RequestOutcome {
    match request.status {
        ExportStatus::Completed => RequestOutcome::Completed,
        ExportStatus::Failed => RequestOutcome::Failed,
        // 期限切れは、生成済みだったかどうかで判定する
        ExportStatus::Expired => {
            if request.processed_at.is_some() && request.error_message.is_none() {
                RequestOutcome::Completed
            } else {
                RequestOutcome::Failed
            }
        }
        ExportStatus::Pending | ExportStatus::Processing => RequestOutcome::Open {
            overdue: is_overdue(request.created_at, now),
        },
    }
}

fn deletion_outcome(request: &DeletionModel, now: DateTime<Utc>) -> RequestOutcome {
    match request.status {
        DeletionStatus::Completed => RequestOutcome::Completed,
        DeletionStatus::Failed => RequestOutcome::Failed,
        DeletionStatus::Cancelled => RequestOutcome::Cancelled,
        // 未検証のものはユーザー側の操作待ちなので期限超過に数えない
        DeletionStatus::Pending | DeletionStatus::Processing => RequestOutcome::Open {
            overdue: request.is_verified() && is_overdue(request.created_at, now),
        },
    }
}
