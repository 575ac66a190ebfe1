//! Convenience result type alias for hotplug.

use crate::error::AppError;

/// A specialized `Result` type for hotplug operations.
pub type AppResult<T> = Result<T, AppError>;
