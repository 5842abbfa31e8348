// privacy-backend/src/features/export/mod.rs

pub mod dto;
pub mod handler;
pub mod models;
pub mod repositories;
pub mod services;
