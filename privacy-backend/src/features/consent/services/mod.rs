// privacy-backend/src/features/consent/services/mod.rs

pub mod consent;

pub use consent::{ConsentService, ConsentStatusEntry, RecordConsentInput, RequiredConsentCheck};
