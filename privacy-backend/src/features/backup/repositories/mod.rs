// privacy-backend/src/features/backup/repositories/mod.rs

pub mod backup_metadata;

pub use backup_metadata::BackupMetadataRepository;
