// privacy-backend/src/features/backup/services/mod.rs

pub mod backup;

pub use backup::{
    BackupConfig, BackupService, CleanupResult, RestoreError, RestoreOptions, RestoreResult,
};
