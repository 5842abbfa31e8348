// privacy-backend/src/features/consent/repositories/mod.rs

pub mod user_consent;

pub use user_consent::UserConsentRepository;
