mod error;
mod service;

pub use error::CacheServiceError;
pub use service::CacheService;
