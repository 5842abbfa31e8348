// tests/integration/audit/mod.rs

pub mod audit_log_tests;
