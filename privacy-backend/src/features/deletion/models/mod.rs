// privacy-backend/src/features/deletion/models/mod.rs

pub mod data_deletion_request;

pub use data_deletion_request::{DeletionStatus, DeletionType};
