// privacy-backend/src/features/deletion/services/mod.rs

pub mod deletion;

pub use deletion::{DeletionRequestInput, DeletionService};
