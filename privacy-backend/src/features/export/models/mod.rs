// privacy-backend/src/features/export/models/mod.rs

pub mod data_export_request;

pub use data_export_request::{ExportFormat, ExportStatus};
