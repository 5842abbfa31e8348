// privacy-backend/src/features/user/mod.rs

pub mod models;
pub mod repositories;
pub mod services;
