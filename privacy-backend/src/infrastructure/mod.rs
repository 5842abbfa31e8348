// privacy-backend/src/infrastructure/mod.rs

pub mod crypto;
pub mod notifier;
pub mod storage;
