//! Operation log access. Entries can be appended and read, nothing else.

use crate::error::CoreError;
use crate::operation_log::{immutable, sort_key, CreateOperationLog, OperationLog, OperationLogFilter};
use crate::pagination::{clamp_limit, clamp_offset, paginate};
use crate::record::RecordStatus;
use crate::types::DbId;

use super::ModelStore;

impl ModelStore {
    /// Append an entry. Never depends on the state of other entities.
    pub fn record_operation(&mut self, input: &CreateOperationLog) -> Result<OperationLog, CoreError> {
        let entry = OperationLog::record(self.seq.operation_log, input, self.now())?;
        self.commit_log(entry.clone());
        tracing::debug!(id = entry.id, module = %entry.module, operation = entry.operation, "Operation logged");
        Ok(entry)
    }

    pub fn operation_log(&self, id: DbId) -> Option<&OperationLog> {
        self.operation_logs.get(&id)
    }

    /// Entries matching `filter`, ordered by `(oper_time, id)`.
    pub fn query_operation_logs(
        &self,
        filter: &OperationLogFilter,
    ) -> Result<Vec<&OperationLog>, CoreError> {
        filter.validate()?;
        let mut rows: Vec<&OperationLog> = self
            .operation_logs
            .values()
            .filter(|entry| filter.matches(entry))
            .collect();
        rows.sort_by_key(|entry| sort_key(entry));
        let limit = clamp_limit(
            filter.limit,
            self.config.default_page_size,
            self.config.max_page_size,
        );
        Ok(paginate(rows, limit, clamp_offset(filter.offset)))
    }

    /// Log entries cannot be edited.
    pub fn update_operation_log(
        &mut self,
        id: DbId,
        _input: &CreateOperationLog,
    ) -> Result<OperationLog, CoreError> {
        self.existing_log(id)?;
        tracing::warn!(id, "Rejected update of operation log entry");
        Err(immutable(id))
    }

    /// Log entries cannot be disabled or re-enabled.
    pub fn set_operation_log_status(
        &mut self,
        id: DbId,
        _status: RecordStatus,
    ) -> Result<OperationLog, CoreError> {
        self.existing_log(id)?;
        tracing::warn!(id, "Rejected status change of operation log entry");
        Err(immutable(id))
    }

    /// Log entries cannot be deleted.
    pub fn delete_operation_log(&mut self, id: DbId) -> Result<(), CoreError> {
        self.existing_log(id)?;
        tracing::warn!(id, "Rejected delete of operation log entry");
        Err(immutable(id))
    }

    fn existing_log(&self, id: DbId) -> Result<&OperationLog, CoreError> {
        self.operation_logs.get(&id).ok_or(CoreError::NotFound {
            entity: "operation_log",
            id,
        })
    }
}
