//! Application error taxonomy.
//!
//! Collaborator-facing error kinds: `NotFound` for absent ids,
//! `Conflict` for unique-name violations, `Validation` for rejected
//! input (graph or policy documents), `Authorization` for visibility and
//! enforcement failures, and `Database`/`Internal` for infrastructure
//! faults. A deny *decision* is a normal return value, never an error.

use thiserror::Error;

/// Errors surfaced by the core services and repositories.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database access failed (also covers failed audit commits).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The caller is not permitted to perform the operation.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input failed validation; carries the diagnostic text.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A unique constraint (policy or workflow name) was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Discriminant-only mirror of [`AppError`] for matching and mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`AppError::Database`].
    Database,
    /// See [`AppError::Authorization`].
    Authorization,
    /// See [`AppError::Configuration`].
    Configuration,
    /// See [`AppError::Validation`].
    Validation,
    /// See [`AppError::Conflict`].
    Conflict,
    /// See [`AppError::NotFound`].
    NotFound,
    /// See [`AppError::Internal`].
    Internal,
}

impl From<&AppError> for ErrorKind {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Database(_) => ErrorKind::Database,
            AppError::Authorization(_) => ErrorKind::Authorization,
            AppError::Configuration(_) => ErrorKind::Configuration,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl AppError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from(self)
    }
}
