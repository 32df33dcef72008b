use crate::error::CoreError;

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// `parent_id` value of a comment that replies to nothing.
pub const TOP_LEVEL_PARENT: DbId = 0;

/// Convert a timestamp to its persisted form (epoch milliseconds).
pub fn to_epoch_millis(ts: Timestamp) -> i64 {
    ts.timestamp_millis()
}

/// Convert persisted epoch milliseconds back into a timestamp.
pub fn from_epoch_millis(millis: i64) -> Result<Timestamp, CoreError> {
    chrono::DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        CoreError::Validation(format!("Timestamp {millis} is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn epoch_millis_round_trip_keeps_millisecond_precision() {
        let ts = chrono::Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(to_epoch_millis(ts), 1_700_000_000_123);
        assert_eq!(from_epoch_millis(1_700_000_000_123).unwrap(), ts);
    }

    #[test]
    fn out_of_range_millis_rejected() {
        assert!(from_epoch_millis(i64::MAX).is_err());
    }
}
