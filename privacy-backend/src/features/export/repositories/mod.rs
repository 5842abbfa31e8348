// privacy-backend/src/features/export/repositories/mod.rs

pub mod data_export_request;

pub use data_export_request::{DataExportRequestRepository, ExportArtifact};
