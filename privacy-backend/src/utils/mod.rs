// privacy-backend/src/utils/mod.rs

pub mod time;
