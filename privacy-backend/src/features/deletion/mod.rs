// privacy-backend/src/features/deletion/mod.rs

pub mod dto;
pub mod handler;
pub mod models;
pub mod repositories;
pub mod services;
