// privacy-backend/src/features/user/repositories/mod.rs

pub mod user;

pub use user::{NewUser, UserRepository};
