// privacy-backend/src/features/audit/models/mod.rs

pub mod audit_log;

pub use audit_log::{AuditAction, AuditLogBuilder, AuditResult};
