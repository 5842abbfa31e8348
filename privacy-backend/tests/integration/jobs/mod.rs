// tests/integration/jobs/mod.rs

pub mod maintenance_tests;
pub mod runner_tests;
