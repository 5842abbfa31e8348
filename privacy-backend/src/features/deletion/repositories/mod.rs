// privacy-backend/src/features/deletion/repositories/mod.rs

pub mod data_deletion_request;

pub use data_deletion_request::DataDeletionRequestRepository;
