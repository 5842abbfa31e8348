// privacy-backend/src/config/mod.rs

pub mod app;
pub mod policy;

pub use app::{AppConfig, Config, ServerConfig};
pub use policy::{PrivacyPolicyConfig, ScoreWeights};
