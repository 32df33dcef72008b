use serde::Serialize;
use sqlx::FromRow;

use docbase_core::error::CoreError;
use docbase_core::operation_log::OperationLog;
use docbase_core::types::{from_epoch_millis, DbId, StatusId};

use super::restore_record;

/// A row from the `operation_log` table. `content` holds the detail text.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OperationLogRow {
    pub id: DbId,
    pub user_id: DbId,
    pub operation: i32,
    pub content: String,
    pub ip: String,
    pub module: String,
    pub oper_time: i64,
    pub status: StatusId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<OperationLogRow> for OperationLog {
    type Error = CoreError;

    fn try_from(row: OperationLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            record: restore_record(row.created_at, row.updated_at, row.status)?,
            oper_time: from_epoch_millis(row.oper_time)?,
            id: row.id,
            user_id: row.user_id,
            operation: row.operation,
            detail: row.content,
            ip: row.ip,
            module: row.module,
        })
    }
}
