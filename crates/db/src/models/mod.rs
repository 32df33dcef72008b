//! Database row types and their conversion into `docbase_core` entities.
//!
//! Rows mirror the table layout exactly: `status` is SMALLINT and every
//! timestamp is BIGINT epoch milliseconds. Converting a row re-checks the
//! record invariants, so a corrupted row surfaces as an error instead of a
//! silently inconsistent entity.

pub mod category;
pub mod chapter;
pub mod comment;
pub mod content;
pub mod operation_log;

use docbase_core::error::CoreError;
use docbase_core::record::{BaseRecord, RecordStatus};
use docbase_core::types::{from_epoch_millis, StatusId};

/// Rebuild a [`BaseRecord`] from its stored columns.
pub(crate) fn restore_record(
    created_at: i64,
    updated_at: i64,
    status: StatusId,
) -> Result<BaseRecord, CoreError> {
    BaseRecord::restore(
        from_epoch_millis(created_at)?,
        from_epoch_millis(updated_at)?,
        RecordStatus::from_id(status)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn restores_valid_record() {
        let record = restore_record(1_000, 2_000, 1).unwrap();
        assert!(record.is_enabled());
        assert_eq!(record.updated_at().timestamp_millis(), 2_000);
    }

    #[test]
    fn rejects_unknown_status() {
        assert_matches!(restore_record(1_000, 1_000, 2), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_update_before_create() {
        assert_matches!(
            restore_record(2_000, 1_000, 1),
            Err(CoreError::InvariantViolation(_))
        );
    }
}
