// tests/integration/consent/mod.rs
