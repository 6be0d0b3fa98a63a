pub mod errors;
pub mod middleware;
pub mod persistence;
pub mod types;
pub mod validation;

pub use errors::{AppError, AppResult, ConfigurationError, ErrorCode, RepositoryError};
pub use types::*;
