//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Mutations run in a transaction
//! that also appends the matching `operation_log` row, so a failed
//! operation leaves no trace in either the data or the log.

pub mod category_repo;
pub mod chapter_repo;
pub mod comment_repo;
pub mod content_repo;
pub mod operation_log_repo;

pub use category_repo::DocumentCategoryRepo;
pub use chapter_repo::DocumentChapterRepo;
pub use comment_repo::CommentRepo;
pub use content_repo::DocumentContentRepo;
pub use operation_log_repo::OperationLogRepo;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool};

use docbase_core::audit::{self, Actor};
use docbase_core::error::CoreError;
use docbase_core::operation_log::OperationLog;
use docbase_core::record::RecordStatus;
use docbase_core::store::DeleteReport;
use docbase_core::types::{to_epoch_millis, DbId, Timestamp};

use crate::error::DbError;

/// Current time as used for `created_at` / `updated_at`.
pub(crate) fn now() -> Timestamp {
    chrono::Utc::now()
}

/// Validate and insert the log entry for `operation` on `module` row `id`.
pub(crate) async fn append_log(
    conn: &mut PgConnection,
    actor: &Actor,
    operation: i32,
    module: &str,
    id: DbId,
    now: Timestamp,
) -> Result<OperationLog, DbError> {
    let entry = OperationLog::record(0, &audit::entry(actor, operation, module, id), now)?;
    OperationLogRepo::insert(conn, &entry).await
}

/// Lock a row for the rest of the transaction, reporting a missing one as
/// `NotFound`. `table` doubles as the entity name in the error.
pub(crate) async fn lock_row<R>(
    conn: &mut PgConnection,
    table: &'static str,
    columns: &str,
    id: DbId,
) -> Result<R, DbError>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let query = format!("SELECT {columns} FROM {table} WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, R>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::Core(CoreError::NotFound { entity: table, id }))
}

/// Status of a parent row, or `ReferenceNotFound` when it does not exist.
/// The row is share-locked so it cannot vanish before commit.
pub(crate) async fn parent_status(
    conn: &mut PgConnection,
    table: &'static str,
    id: DbId,
) -> Result<RecordStatus, DbError> {
    let query = format!("SELECT status FROM {table} WHERE id = $1 FOR SHARE");
    let status = sqlx::query_scalar::<_, i16>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(CoreError::ReferenceNotFound { entity: table, id })?;
    Ok(RecordStatus::from_id(status)?)
}

/// Plain status toggle shared by every table with a `BaseRecord`.
/// `updated_at` never moves backwards.
pub(crate) async fn set_status<R>(
    pool: &PgPool,
    table: &'static str,
    columns: &str,
    id: DbId,
    status: RecordStatus,
    actor: &Actor,
) -> Result<R, DbError>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let now = now();
    let mut tx = pool.begin().await?;
    let query = format!(
        "UPDATE {table} SET status = $2, updated_at = GREATEST(updated_at, $3) \
         WHERE id = $1 RETURNING {columns}"
    );
    let row = sqlx::query_as::<_, R>(&query)
        .bind(id)
        .bind(status.id())
        .bind(to_epoch_millis(now))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CoreError::NotFound { entity: table, id })?;
    append_log(&mut tx, actor, audit::status_operation(status), table, id, now).await?;
    tx.commit().await?;

    tracing::info!(table, id, status = status.id(), "Status changed");
    Ok(row)
}

/// Disable `ids` in `table` as part of a delete.
pub(crate) async fn disable_rows(
    conn: &mut PgConnection,
    table: &'static str,
    ids: &[DbId],
    now: Timestamp,
) -> Result<(), DbError> {
    if ids.is_empty() {
        return Ok(());
    }
    let query = format!(
        "UPDATE {table} SET status = $2, updated_at = GREATEST(updated_at, $3) \
         WHERE id = ANY($1)"
    );
    sqlx::query(&query)
        .bind(ids)
        .bind(RecordStatus::Disabled.id())
        .bind(to_epoch_millis(now))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Disable every row named in `report` and log a DELETE for the target
/// (first category, else first chapter) and a DISABLE per cascaded row.
pub(crate) async fn apply_delete(
    conn: &mut PgConnection,
    report: &DeleteReport,
    actor: &Actor,
    now: Timestamp,
) -> Result<(), DbError> {
    use docbase_core::audit::{modules, operation_codes};

    let (target_module, target_id, cascaded_chapters) =
        match (report.categories.first(), report.chapters.first()) {
            (Some(&id), _) => (modules::CATEGORY, id, &report.chapters[..]),
            (None, Some(&id)) => (modules::CHAPTER, id, &report.chapters[1..]),
            (None, None) => {
                return Err(CoreError::Internal("delete report names no target".into()).into());
            }
        };

    disable_rows(conn, modules::CATEGORY, &report.categories, now).await?;
    disable_rows(conn, modules::CHAPTER, &report.chapters, now).await?;
    disable_rows(conn, modules::CONTENT, &report.contents, now).await?;

    append_log(conn, actor, operation_codes::DELETE, target_module, target_id, now).await?;
    for &id in cascaded_chapters {
        append_log(conn, actor, operation_codes::DISABLE, modules::CHAPTER, id, now).await?;
    }
    for &id in &report.contents {
        append_log(conn, actor, operation_codes::DISABLE, modules::CONTENT, id, now).await?;
    }
    Ok(())
}

/// Ids of the enabled content items in any of `chapter_ids`.
pub(crate) async fn enabled_contents_of(
    conn: &mut PgConnection,
    chapter_ids: &[DbId],
) -> Result<Vec<DbId>, DbError> {
    let ids = sqlx::query_scalar::<_, DbId>(
        "SELECT id FROM document_content \
         WHERE chapter_id = ANY($1) AND status = 1 \
         ORDER BY id FOR UPDATE",
    )
    .bind(chapter_ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

/// Convert fetched rows into entities, failing on the first corrupt row.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DbError>
where
    T: TryFrom<R, Error = CoreError>,
{
    rows.into_iter()
        .map(T::try_from)
        .collect::<Result<Vec<T>, CoreError>>()
        .map_err(DbError::from)
}
