// privacy-backend/src/features/export/services/mod.rs

pub mod export;
pub mod serializer;

pub use export::{ExportDownload, ExportService, ExpireResult};
