// privacy-backend/src/features/user/models/mod.rs

pub mod user;
