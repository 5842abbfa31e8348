// privacy-backend/src/features/consent/models/mod.rs

pub mod policy;
pub mod user_consent;

pub use policy::{required_consent_table, ConsentRequirement, LegalBasis};
pub use user_consent::{ConsentStatus, ConsentType};
