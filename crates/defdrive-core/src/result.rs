//! Convenience result type alias for DefDrive.

use crate::error::AppError;

/// A specialized `Result` type for DefDrive operations.
pub type AppResult<T> = Result<T, AppError>;
