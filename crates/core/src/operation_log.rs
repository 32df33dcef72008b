//! Append-only operation log.
//!
//! Entries are written once and never updated or deleted. No referential
//! integrity is enforced against users or content: a log entry is evidence
//! of history and must outlive whatever it mentions.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::record::BaseRecord;
use crate::types::{DbId, Timestamp};
use crate::validation;

pub const MAX_MODULE_LENGTH: usize = 50;
pub const MAX_DETAIL_LENGTH: usize = 2_000;

/// A row from the `operation_log` table. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationLog {
    pub id: DbId,
    pub user_id: DbId,
    /// Operation code, see [`crate::audit::operation_codes`].
    pub operation: i32,
    /// Human-readable detail of what happened.
    pub detail: String,
    /// Originating IP address; empty for system-originated entries.
    pub ip: String,
    pub module: String,
    /// When the operation happened. Independent of `record.created_at` so
    /// that historical events can be replayed into the log.
    pub oper_time: Timestamp,
    #[serde(flatten)]
    pub record: BaseRecord,
}

/// DTO for appending an entry.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateOperationLog {
    pub user_id: DbId,
    #[validate(range(min = 0, message = "must be non-negative"))]
    pub operation: i32,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub detail: String,
    #[validate(ip(message = "must be an IPv4 or IPv6 address"))]
    pub ip: Option<String>,
    #[validate(
        length(min = 1, max = 50, message = "must be between 1 and 50 characters"),
        custom(function = "validation::not_blank")
    )]
    pub module: String,
    /// Defaults to the moment the entry is written.
    pub oper_time: Option<Timestamp>,
}

impl OperationLog {
    pub fn record(id: DbId, input: &CreateOperationLog, now: Timestamp) -> Result<Self, CoreError> {
        validation::check(input)?;
        Ok(Self {
            id,
            user_id: input.user_id,
            operation: input.operation,
            detail: input.detail.clone(),
            ip: input.ip.clone().unwrap_or_default(),
            module: input.module.trim().to_string(),
            oper_time: input.oper_time.unwrap_or(now),
            record: BaseRecord::new(now),
        })
    }
}

/// The error returned by every attempt to change a log entry.
pub fn immutable(id: DbId) -> CoreError {
    CoreError::ImmutableRecord { id }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Filter parameters for reading the log. Time bounds are inclusive and
/// apply to `oper_time`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationLogFilter {
    pub user_id: Option<DbId>,
    pub module: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OperationLogFilter {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(CoreError::Validation(format!(
                    "time range start {from} is after end {to}"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, entry: &OperationLog) -> bool {
        self.user_id.map_or(true, |u| entry.user_id == u)
            && self.module.as_deref().map_or(true, |m| entry.module == m)
            && self.from.map_or(true, |from| entry.oper_time >= from)
            && self.to.map_or(true, |to| entry.oper_time <= to)
    }
}

/// Log ordering: by `oper_time`, ties broken by id.
pub fn sort_key(entry: &OperationLog) -> (Timestamp, DbId) {
    (entry.oper_time, entry.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn input(module: &str, ip: Option<&str>) -> CreateOperationLog {
        CreateOperationLog {
            user_id: 3,
            operation: 1,
            detail: "create document_category #1".into(),
            ip: ip.map(str::to_string),
            module: module.into(),
            oper_time: None,
        }
    }

    // -- record --------------------------------------------------------------

    #[test]
    fn oper_time_defaults_to_now() {
        let entry = OperationLog::record(1, &input("comment", None), t0()).unwrap();
        assert_eq!(entry.oper_time, t0());
        assert_eq!(entry.ip, "");
    }

    #[test]
    fn historical_oper_time_kept() {
        let past = t0() - Duration::days(30);
        let mut dto = input("comment", Some("10.0.0.1"));
        dto.oper_time = Some(past);
        let entry = OperationLog::record(1, &dto, t0()).unwrap();
        assert_eq!(entry.oper_time, past);
        assert_eq!(entry.record.created_at(), t0());
    }

    #[test]
    fn ipv6_accepted_garbage_rejected() {
        assert!(OperationLog::record(1, &input("comment", Some("::1")), t0()).is_ok());
        assert_matches!(
            OperationLog::record(1, &input("comment", Some("not-an-ip")), t0()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn blank_module_rejected() {
        assert!(OperationLog::record(1, &input(" ", None), t0()).is_err());
        assert!(OperationLog::record(1, &input(&"m".repeat(MAX_MODULE_LENGTH + 1), None), t0()).is_err());
    }

    #[test]
    fn negative_operation_rejected() {
        let mut dto = input("comment", None);
        dto.operation = -1;
        assert!(OperationLog::record(1, &dto, t0()).is_err());
    }

    // -- filter --------------------------------------------------------------

    #[test]
    fn filter_matches_all_criteria() {
        let entry = OperationLog::record(1, &input("comment", None), t0()).unwrap();
        let filter = OperationLogFilter {
            user_id: Some(3),
            module: Some("comment".into()),
            from: Some(t0()),
            to: Some(t0()),
            ..Default::default()
        };
        assert!(filter.matches(&entry));
        let other_user = OperationLogFilter {
            user_id: Some(4),
            ..Default::default()
        };
        assert!(!other_user.matches(&entry));
        let too_late = OperationLogFilter {
            from: Some(t0() + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!too_late.matches(&entry));
    }

    #[test]
    fn inverted_range_rejected() {
        let filter = OperationLogFilter {
            from: Some(t0()),
            to: Some(t0() - Duration::seconds(1)),
            ..Default::default()
        };
        assert_matches!(filter.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn immutable_error_names_entry() {
        assert_matches!(immutable(9), CoreError::ImmutableRecord { id: 9 });
    }
}
