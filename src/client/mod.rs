// File: ./src/client/mod.rs
pub mod core;
pub mod error;
pub mod tls;

pub use self::core::{DEFAULT_TIMEOUT, PackClient};
pub use self::error::ApiError;
