// privacy-backend/src/features/compliance/services/mod.rs

pub mod compliance;

pub use compliance::ComplianceService;
