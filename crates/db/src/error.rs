use docbase_core::error::CoreError;

/// Errors returned by the repository layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A model rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// PostgreSQL SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Turn a unique-index race on `(chapter_id, sort_order)` into the same
/// `Conflict` the pre-check reports.
pub(crate) fn map_position_conflict(err: sqlx::Error, chapter_id: i64, sort_order: i32) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return DbError::Core(CoreError::Conflict(format!(
                "sort_order {sort_order} is already used in chapter {chapter_id}"
            )));
        }
    }
    DbError::Sqlx(err)
}
