//! Repository for the append-only `operation_log` table.
//!
//! Only insert and read operations exist. The table also carries a trigger
//! that rejects UPDATE and DELETE, so raw SQL cannot rewrite history either.

use sqlx::{PgConnection, PgPool};

use docbase_core::config::ModelConfig;
use docbase_core::error::CoreError;
use docbase_core::operation_log::{immutable, CreateOperationLog, OperationLog, OperationLogFilter};
use docbase_core::pagination::{clamp_limit, clamp_offset};
use docbase_core::record::RecordStatus;
use docbase_core::types::{to_epoch_millis, DbId};

use super::{convert_all, now};
use crate::error::DbError;
use crate::models::operation_log::OperationLogRow;

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `operation_log` SELECT queries.
const COLUMNS: &str = "\
    id, user_id, operation, content, ip, module, oper_time, \
    status, created_at, updated_at";

/// Column list for INSERT (excludes auto-generated `id`).
const INSERT_COLUMNS: &str = "\
    user_id, operation, content, ip, module, oper_time, \
    status, created_at, updated_at";

// ---------------------------------------------------------------------------
// OperationLogRepo
// ---------------------------------------------------------------------------

/// Provides append and query operations for the operation log.
pub struct OperationLogRepo;

impl OperationLogRepo {
    /// Append an entry on its own. Never depends on the state of other
    /// tables.
    pub async fn create(pool: &PgPool, input: &CreateOperationLog) -> Result<OperationLog, DbError> {
        let entry = OperationLog::record(0, input, now())?;
        let mut conn = pool.acquire().await?;
        let saved = Self::insert(&mut conn, &entry).await?;
        tracing::debug!(id = saved.id, module = %saved.module, operation = saved.operation, "Operation logged");
        Ok(saved)
    }

    /// Insert an already validated entry; its `id` is ignored.
    pub(crate) async fn insert(
        conn: &mut PgConnection,
        entry: &OperationLog,
    ) -> Result<OperationLog, DbError> {
        let query = format!(
            "INSERT INTO operation_log ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, OperationLogRow>(&query)
            .bind(entry.user_id)
            .bind(entry.operation)
            .bind(&entry.detail)
            .bind(&entry.ip)
            .bind(&entry.module)
            .bind(to_epoch_millis(entry.oper_time))
            .bind(entry.record.status().id())
            .bind(to_epoch_millis(entry.record.created_at()))
            .bind(to_epoch_millis(entry.record.updated_at()))
            .fetch_one(&mut *conn)
            .await?;
        Ok(OperationLog::try_from(row)?)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OperationLog>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM operation_log WHERE id = $1");
        let row = sqlx::query_as::<_, OperationLogRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(OperationLog::try_from).transpose()?)
    }

    /// Query entries with filtering and pagination, ordered by
    /// `(oper_time, id)`.
    pub async fn query(
        pool: &PgPool,
        config: &ModelConfig,
        filter: &OperationLogFilter,
    ) -> Result<Vec<OperationLog>, DbError> {
        filter.validate()?;
        let limit = clamp_limit(filter.limit, config.default_page_size, config.max_page_size);
        let offset = clamp_offset(filter.offset);

        let (where_clause, bind_values, bind_idx) = build_log_filter(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM operation_log {where_clause} \
             ORDER BY oper_time ASC, id ASC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let mut q = sqlx::query_as::<_, OperationLogRow>(&query);
        for value in &bind_values {
            q = match value {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
            };
        }
        let rows = q.bind(limit).bind(offset).fetch_all(pool).await?;
        convert_all(rows)
    }

    /// Count entries matching the filter (for pagination metadata).
    pub async fn count(pool: &PgPool, filter: &OperationLogFilter) -> Result<i64, DbError> {
        filter.validate()?;
        let (where_clause, bind_values, _) = build_log_filter(filter);
        let query = format!("SELECT COUNT(*)::BIGINT AS count FROM operation_log {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for value in &bind_values {
            q = match value {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
            };
        }
        Ok(q.fetch_one(pool).await?)
    }

    /// Log entries cannot be edited.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        _input: &CreateOperationLog,
    ) -> Result<OperationLog, DbError> {
        Self::ensure_exists(pool, id).await?;
        tracing::warn!(id, "Rejected update of operation log entry");
        Err(immutable(id).into())
    }

    /// Log entries cannot be disabled or re-enabled.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        _status: RecordStatus,
    ) -> Result<OperationLog, DbError> {
        Self::ensure_exists(pool, id).await?;
        tracing::warn!(id, "Rejected status change of operation log entry");
        Err(immutable(id).into())
    }

    /// Log entries cannot be deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<(), DbError> {
        Self::ensure_exists(pool, id).await?;
        tracing::warn!(id, "Rejected delete of operation log entry");
        Err(immutable(id).into())
    }

    /// `NotFound` for a missing entry, so callers can tell it from a
    /// protected one.
    async fn ensure_exists(pool: &PgPool, id: DbId) -> Result<(), DbError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM operation_log WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        if !found {
            return Err(CoreError::NotFound {
                entity: "operation_log",
                id,
            }
            .into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built log queries.
#[derive(Debug, PartialEq)]
enum BindValue {
    BigInt(i64),
    Text(String),
}

/// Build a WHERE clause and bind values from the filter.
///
/// Returns `(where_clause, bind_values, next_bind_index)`. The clause is
/// empty when no filter is set, otherwise it starts with `WHERE `.
fn build_log_filter(filter: &OperationLogFilter) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(user_id) = filter.user_id {
        conditions.push(format!("user_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(user_id));
    }

    if let Some(ref module) = filter.module {
        conditions.push(format!("module = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(module.clone()));
    }

    if let Some(from) = filter.from {
        conditions.push(format!("oper_time >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(to_epoch_millis(from)));
    }

    if let Some(to) = filter.to {
        conditions.push(format!("oper_time <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(to_epoch_millis(to)));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (where_clause, bind_values, bind_idx)
}
