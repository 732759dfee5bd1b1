//! Repository Error Extension Trait
//!
//! Eliminates identical error mapping patterns across repository
//! implementations. Provides standardized error handling with operation
//! context and logging. Unique-constraint violations map to `Conflict`
//! so name collisions surface as such to collaborators.

use crate::shared::{AppError, AppResult};
use tracing::error;

/// Extension trait for standardized repository error handling.
///
/// ```ignore
/// sqlx::query_as::<_, Policy>("SELECT ... FROM abac_policies WHERE id = $1")
///     .bind(policy_id)
///     .fetch_optional(pool)
///     .await
///     .map_db_error("fetch", "policy")?
/// ```
pub trait RepositoryErrorExt<T> {
    /// Maps database errors with operation and entity context.
    ///
    /// `operation` is the database operation being performed ("fetch",
    /// "create", "update", "delete"); `entity` the entity type operated
    /// on ("policy", "workflow", "access_log").
    fn map_db_error(self, operation: &str, entity: &str) -> AppResult<T>;
}

impl<T> RepositoryErrorExt<T> for Result<T, sqlx::Error> {
    fn map_db_error(self, operation: &str, entity: &str) -> AppResult<T> {
        self.map_err(|e| {
            error!(
                operation = %operation,
                entity = %entity,
                error = %e,
                "Database error during {} {}",
                operation,
                entity
            );

            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(format!(
                        "{} violates a unique constraint",
                        entity
                    ));
                }
            }

            AppError::Database(e)
        })
    }
}
