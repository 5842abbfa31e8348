// privacy-backend/src/features/compliance/models/report.rs

//! コンプライアンスレポートの集計。入力が同じなら結果も同じになる純粋関数

use crate::config::ScoreWeights;
use crate::features::audit::models::audit_log::resource;
use crate::features::consent::models::user_consent::{ConsentStatus, ConsentType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 監査対象とみなすリソース種別 (プライバシーリクエスト系)
const AUDITED_RESOURCES: [&str; 3] = [
    resource::USER_CONSENT,
    resource::DATA_EXPORT,
    resource::DATA_DELETION,
];

const FULFILLMENT_THRESHOLD: f64 = 0.9;
const CONSENT_GRANT_THRESHOLD: f64 = 0.5;

/// 未処理リクエストの重み。期限超過 > 失敗 > 期限内の未完了
const OVERDUE_WEIGHT: u64 = 3;
const FAILED_WEIGHT: u64 = 2;
const OPEN_WEIGHT: u64 = 1;
/// この点数以上でリスクを1段階、2段階引き上げる
const BACKLOG_ESCALATE_ONCE: u64 = 2;
const BACKLOG_ESCALATE_TWICE: u64 = 6;

/// エクスポート/削除リクエストの集計上の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Completed,
    Failed,
    Cancelled,
    /// 未完了。overdue は応答期限を過ぎているか
    Open { overdue: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditObservation {
    pub action: String,
    pub resource_type: String,
    pub result: String,
}

#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub consent_decisions: Vec<(ConsentType, ConsentStatus)>,
    pub exports: Vec<RequestOutcome>,
    pub deletions: Vec<RequestOutcome>,
    pub audit_entries: Vec<AuditObservation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentTypeStats {
    pub granted: u64,
    pub denied: u64,
    pub withdrawn: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentMetrics {
    pub by_type: BTreeMap<String, ConsentTypeStats>,
    pub total_granted: u64,
    pub total_withdrawn: u64,
    pub total_denied: u64,
    pub grant_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentMetrics {
    pub requested: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub open: u64,
    pub overdue: u64,
    pub fulfillment_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditMetrics {
    pub total: u64,
    pub failures: u64,
    pub by_resource_type: BTreeMap<String, u64>,
    pub by_action: BTreeMap<String, u64>,
    pub coverage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub consent: f64,
    pub export: f64,
    pub deletion: f64,
    pub audit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 60.0 {
            RiskLevel::High
        } else if score < 80.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn escalate(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium | RiskLevel::High => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub consent: ConsentMetrics,
    pub exports: FulfillmentMetrics,
    pub deletions: FulfillmentMetrics,
    pub audit: AuditMetrics,
    pub component_scores: ComponentScores,
    pub compliance_score: f64,
    pub recommendations: Vec<String>,
    pub risk_assessment: RiskAssessment,
}

/// 分母 0 は「対象なし = 問題なし」として 1.0
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        1.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn consent_metrics(decisions: &[(ConsentType, ConsentStatus)]) -> ConsentMetrics {
    let mut by_type: BTreeMap<String, ConsentTypeStats> = BTreeMap::new();
    for (consent_type, status) in decisions {
        let stats = by_type.entry(consent_type.as_str().to_string()).or_default();
        match status {
            ConsentStatus::Granted => stats.granted += 1,
            ConsentStatus::Denied => stats.denied += 1,
            ConsentStatus::Withdrawn => stats.withdrawn += 1,
        }
    }

    let total_granted = by_type.values().map(|s| s.granted).sum();
    let total_denied = by_type.values().map(|s| s.denied).sum();
    let total_withdrawn = by_type.values().map(|s| s.withdrawn).sum();

    ConsentMetrics {
        by_type,
        total_granted,
        total_withdrawn,
        total_denied,
        grant_rate: ratio(total_granted, decisions.len() as u64),
    }
}

fn fulfillment_metrics(outcomes: &[RequestOutcome]) -> FulfillmentMetrics {
    let mut metrics = FulfillmentMetrics {
        requested: outcomes.len() as u64,
        completed: 0,
        failed: 0,
        cancelled: 0,
        open: 0,
        overdue: 0,
        fulfillment_rate: 1.0,
    };

    for outcome in outcomes {
        match outcome {
            RequestOutcome::Completed => metrics.completed += 1,
            RequestOutcome::Failed => metrics.failed += 1,
            RequestOutcome::Cancelled => metrics.cancelled += 1,
            RequestOutcome::Open { overdue } => {
                metrics.open += 1;
                if *overdue {
                    metrics.overdue += 1;
                }
            }
        }
    }

    // ユーザーが取り消したものは分母に含めない
    metrics.fulfillment_rate = ratio(metrics.completed, metrics.requested - metrics.cancelled);
    metrics
}

fn audit_metrics(entries: &[AuditObservation], privacy_requests: u64) -> AuditMetrics {
    let mut by_resource_type: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_action: BTreeMap<String, u64> = BTreeMap::new();
    let mut failures = 0;
    let mut audited = 0;

    for entry in entries {
        *by_resource_type.entry(entry.resource_type.clone()).or_default() += 1;
        *by_action.entry(entry.action.clone()).or_default() += 1;
        if entry.result == "failure" {
            failures += 1;
        }
        if AUDITED_RESOURCES.contains(&entry.resource_type.as_str()) {
            audited += 1;
        }
    }

    AuditMetrics {
        total: entries.len() as u64,
        failures,
        by_resource_type,
        by_action,
        coverage: ratio(audited, privacy_requests).min(1.0),
    }
}

fn backlog_points(metrics: &FulfillmentMetrics) -> u64 {
    metrics.overdue * OVERDUE_WEIGHT
        + metrics.failed * FAILED_WEIGHT
        + (metrics.open - metrics.overdue) * OPEN_WEIGHT
}

pub fn build_report(inputs: &ReportInputs, weights: &ScoreWeights) -> ComplianceReport {
    let consent = consent_metrics(&inputs.consent_decisions);
    let exports = fulfillment_metrics(&inputs.exports);
    let deletions = fulfillment_metrics(&inputs.deletions);
    let privacy_requests =
        inputs.consent_decisions.len() as u64 + exports.requested + deletions.requested;
    let audit = audit_metrics(&inputs.audit_entries, privacy_requests);

    let component_scores = ComponentScores {
        consent: consent.grant_rate,
        export: exports.fulfillment_rate,
        deletion: deletions.fulfillment_rate,
        audit: audit.coverage,
    };

    let weighted = weights.consent * component_scores.consent
        + weights.export * component_scores.export
        + weights.deletion * component_scores.deletion
        + weights.audit * component_scores.audit;
    let compliance_score = round2((weighted * 100.0).clamp(0.0, 100.0));

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if consent.grant_rate < CONSENT_GRANT_THRESHOLD {
        issues.push(format!(
            "Consent grant rate is {:.1}%",
            consent.grant_rate * 100.0
        ));
        recommendations.push(
            "Review consent prompts and policy wording; most consent decisions are refusals"
                .to_string(),
        );
    }
    if exports.fulfillment_rate < FULFILLMENT_THRESHOLD {
        issues.push(format!(
            "Export fulfillment rate is {:.1}% ({} of {} completed)",
            exports.fulfillment_rate * 100.0,
            exports.completed,
            exports.requested
        ));
        recommendations.push("Investigate failed and stalled data export jobs".to_string());
    }
    if deletions.fulfillment_rate < FULFILLMENT_THRESHOLD {
        issues.push(format!(
            "Deletion fulfillment rate is {:.1}% ({} of {} completed)",
            deletions.fulfillment_rate * 100.0,
            deletions.completed,
            deletions.requested - deletions.cancelled
        ));
        recommendations.push(
            "Follow up on unverified or failed deletion requests".to_string(),
        );
    }
    if audit.coverage < 1.0 {
        issues.push(format!(
            "Audit coverage is {:.1}% of privacy requests",
            audit.coverage * 100.0
        ));
        recommendations.push("Ensure every privacy request produces an audit entry".to_string());
    }

    for (kind, metrics) in [("export", &exports), ("deletion", &deletions)] {
        if metrics.failed > 0 {
            issues.push(format!("{} {} request(s) failed", metrics.failed, kind));
            recommendations.push(format!("Resolve and resubmit failed {} requests", kind));
        }
        let pending = metrics.open - metrics.overdue;
        if pending > 0 {
            issues.push(format!("{} {} request(s) are still open", pending, kind));
        }
    }

    let overdue = exports.overdue + deletions.overdue;
    if overdue > 0 {
        issues.push(format!(
            "{} privacy request(s) are past the response deadline",
            overdue
        ));
        recommendations.push(
            "Process overdue export and deletion requests within the statutory response window"
                .to_string(),
        );
    }

    let backlog = backlog_points(&exports) + backlog_points(&deletions);
    let mut level = RiskLevel::from_score(compliance_score);
    if backlog >= BACKLOG_ESCALATE_ONCE {
        level = level.escalate();
    }
    if backlog >= BACKLOG_ESCALATE_TWICE {
        level = level.escalate();
    }

    if recommendations.is_empty() {
        recommendations.push("No action required; continue regular monitoring".to_string());
    }

    ComplianceReport {
        period_start: inputs.period_start,
        period_end: inputs.period_end,
        generated_at: inputs.generated_at,
        consent,
        exports,
        deletions,
        audit,
        component_scores,
        compliance_score,
        recommendations,
        risk_assessment: RiskAssessment { level, issues },
    }
}
