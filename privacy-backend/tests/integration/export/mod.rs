// tests/integration/export/mod.rs

pub mod export_workflow_tests;
