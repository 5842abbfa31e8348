// privacy-backend/src/middleware/mod.rs

pub mod identity;
pub mod rate_limit;

pub use identity::RequestIdentity;
pub use rate_limit::{rate_limit_middleware, RateLimiter, TtlStore};
