//! Result alias used across the workspace.

use crate::shared::AppError;

/// Convenience alias for fallible operations in the core.
pub type AppResult<T> = Result<T, AppError>;
