// privacy-backend/src/config/policy.rs

use serde::{Deserialize, Serialize};

/// コンプライアンススコアの重み (合計 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub consent: f64,
    pub export: f64,
    pub deletion: f64,
    pub audit: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            consent: 0.3,
            export: 0.3,
            deletion: 0.3,
            audit: 0.1,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.consent + self.export + self.deletion + self.audit
    }
}

/// プロダクトポリシーとして設定可能な保持期間・猶予期間
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyPolicyConfig {
    pub export_expiry_days: i64,
    pub deletion_grace_days: i64,
    pub backup_retention_days: i64,
    pub audit_retention_days: i64,
    pub consent_policy_version: String,
    pub score_weights: ScoreWeights,
}

impl Default for PrivacyPolicyConfig {
    fn default() -> Self {
        Self {
            export_expiry_days: 30,
            deletion_grace_days: 7,
            backup_retention_days: 30,
            audit_retention_days: 2555, // 7 years
            consent_policy_version: "1.0".to_string(),
            score_weights: ScoreWeights::default(),
        }
    }
}

impl PrivacyPolicyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.export_expiry_days <= 0 {
            return Err("EXPORT_EXPIRY_DAYS must be positive".to_string());
        }
        if self.deletion_grace_days <= 0 {
            return Err("DELETION_GRACE_DAYS must be positive".to_string());
        }
        if self.backup_retention_days <= 0 || self.audit_retention_days <= 0 {
            return Err("Retention periods must be positive".to_string());
        }
        let weights = &self.score_weights;
        if [weights.consent, weights.export, weights.deletion, weights.audit]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err("Compliance weights must not be negative".to_string());
        }
        if (weights.total() - 1.0).abs() > 1e-6 {
            return Err(format!(
                "Compliance weights must sum to 1.0 (got {:.3})",
                weights.total()
            ));
        }
        Ok(())
    }
}
