// privacy-backend/src/features/backup/models/mod.rs

pub mod backup_metadata;
pub mod bundle;

pub use backup_metadata::BackupDataType;
pub use bundle::BackupBundle;
