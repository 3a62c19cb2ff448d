pub mod config;
pub mod error;
pub mod ids;
pub mod keying;
pub mod pagination;
pub mod types;

pub use error::{Result, RuntimeError};
