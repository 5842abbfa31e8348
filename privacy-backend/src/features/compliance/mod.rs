// privacy-backend/src/features/compliance/mod.rs

pub mod handler;
pub mod models;
pub mod services;
