// privacy-backend/src/features/audit/repositories/mod.rs

pub mod audit_log;

pub use audit_log::{AuditLogFilter, AuditLogRepository};
