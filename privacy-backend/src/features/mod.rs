// privacy-backend/src/features/mod.rs

pub mod audit;
pub mod backup;
pub mod compliance;
pub mod consent;
pub mod data_domain;
pub mod deletion;
pub mod export;
pub mod user;
