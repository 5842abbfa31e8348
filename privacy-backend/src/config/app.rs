// privacy-backend/src/config/app.rs

use super::policy::{PrivacyPolicyConfig, ScoreWeights};
use crate::infrastructure::storage::{StorageBackend, StorageConfig};
use crate::jobs::JobConfig;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Clone)]
pub struct AppConfig {
    pub environment: String,
    pub server: ServerConfig,
    pub database_url: String,
    pub storage: StorageConfig,
    /// ダウンロードURLのプレフィックス (例: https://api.example.com/privacy/exports)
    pub download_base_url: String,
    /// バックアップ鍵導出用のマスターキー (32 bytes)
    pub backup_encryption_key: Vec<u8>,
    pub policy: PrivacyPolicyConfig,
    pub jobs: JobConfig,
    pub sweep_interval_secs: u64,
    pub rate_limit_per_hour: usize,
    pub cors_allowed_origin: String,
}

// マスターキーをログに出さない
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("server", &self.server)
            .field("storage", &self.storage)
            .field("download_base_url", &self.download_base_url)
            .field("backup_encryption_key", &"<redacted>")
            .field("policy", &self.policy)
            .field("jobs", &self.jobs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("rate_limit_per_hour", &self.rate_limit_per_hour)
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .finish()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("Invalid {} value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok(); // .env ファイルを読み込む (存在しなくてもエラーにしない)

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        let backup_encryption_key = match env::var("BACKUP_ENCRYPTION_KEY") {
            Ok(encoded) => {
                let key = STANDARD
                    .decode(encoded.trim())
                    .map_err(|_| "BACKUP_ENCRYPTION_KEY must be base64")?;
                if key.len() != 32 {
                    return Err("BACKUP_ENCRYPTION_KEY must decode to 32 bytes".to_string());
                }
                key
            }
            Err(_) if is_production => {
                return Err("BACKUP_ENCRYPTION_KEY must be set in production".to_string())
            }
            Err(_) => {
                tracing::warn!(
                    "BACKUP_ENCRYPTION_KEY not set; using an ephemeral key. Encrypted backups will not survive a restart"
                );
                let mut key = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut key);
                key
            }
        };

        let policy = PrivacyPolicyConfig {
            export_expiry_days: env_or("EXPORT_EXPIRY_DAYS", 30)?,
            deletion_grace_days: env_or("DELETION_GRACE_DAYS", 7)?,
            backup_retention_days: env_or("BACKUP_RETENTION_DAYS", 30)?,
            audit_retention_days: env_or("AUDIT_RETENTION_DAYS", 2555)?,
            consent_policy_version: env::var("CONSENT_POLICY_VERSION")
                .unwrap_or_else(|_| "1.0".to_string()),
            score_weights: ScoreWeights {
                consent: env_or("COMPLIANCE_WEIGHT_CONSENT", 0.3)?,
                export: env_or("COMPLIANCE_WEIGHT_EXPORT", 0.3)?,
                deletion: env_or("COMPLIANCE_WEIGHT_DELETION", 0.3)?,
                audit: env_or("COMPLIANCE_WEIGHT_AUDIT", 0.1)?,
            },
        };
        policy.validate()?;

        Ok(Self {
            environment,
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env_or("PORT", 5000)?,
                request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
            },
            database_url: env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            storage: StorageConfig {
                backend: StorageBackend::Local,
                root_path: env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data".to_string()),
            },
            download_base_url: env::var("DOWNLOAD_BASE_URL")
                .unwrap_or_else(|_| "/privacy/exports".to_string()),
            backup_encryption_key,
            policy,
            jobs: JobConfig {
                max_workers: env_or("JOB_WORKERS", 4)?,
                max_retries: env_or("JOB_MAX_RETRIES", 3)?,
                retry_base_ms: env_or("JOB_RETRY_BASE_MS", 500)?,
            },
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", 3600)?,
            rate_limit_per_hour: env_or("RATE_LIMIT_PER_HOUR", 20)?,
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGINS")
                .or_else(|_| env::var("FRONTEND_URL"))
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// テスト用の設定を作成
    pub fn for_testing() -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                request_timeout_secs: 30,
            },
            database_url: "sqlite::memory:".to_string(),
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                root_path: "./test-data".to_string(),
            },
            download_base_url: "/privacy/exports".to_string(),
            backup_encryption_key: vec![7u8; 32],
            policy: PrivacyPolicyConfig::default(),
            jobs: JobConfig {
                max_workers: 2,
                max_retries: 2,
                retry_base_ms: 10,
            },
            sweep_interval_secs: 3600,
            rate_limit_per_hour: 1000,
            cors_allowed_origin: "http://localhost:3000".to_string(),
        }
    }
}

// Backward compatibility
pub type Config = AppConfig;
