// privacy-backend/src/lib.rs
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod infrastructure;
pub mod jobs;
pub mod logging;
pub mod middleware;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::ApiResponse;
