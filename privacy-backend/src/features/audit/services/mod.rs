// privacy-backend/src/features/audit/services/mod.rs

pub mod audit_log;

pub use audit_log::{AuditLogService, AuditQueryResult};
