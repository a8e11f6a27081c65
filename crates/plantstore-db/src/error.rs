//! Typed error surface for the persistence layer.
//!
//! Every query function returns `Result<_, StoreError>` so callers can
//! pattern-match the outcome into a response instead of inspecting raw
//! database errors.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Failure reported by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected the statement with a constraint violation
    /// (unique, foreign key, not-null, or check).
    #[error("constraint violation: {0}")]
    Integrity(#[source] sqlx::Error),

    /// Any other database failure.
    #[error("{context}: {source}")]
    Unexpected {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// Classify a sqlx error, attaching a static context string to the
    /// unexpected branch.
    pub(crate) fn from_sqlx(context: &'static str, source: sqlx::Error) -> Self {
        let is_integrity = matches!(
            &source,
            sqlx::Error::Database(db) if matches!(
                db.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            )
        );

        if is_integrity {
            Self::Integrity(source)
        } else {
            Self::Unexpected { context, source }
        }
    }

    /// Whether this is a constraint violation reported by the database.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}
