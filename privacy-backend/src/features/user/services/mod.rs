// privacy-backend/src/features/user/services/mod.rs

pub mod anonymization;

pub use anonymization::{AnonymizationService, AnonymizedIdentity};
