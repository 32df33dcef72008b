//! Audit and visibility fields shared by every persisted entity.
//!
//! Entities embed a [`BaseRecord`] rather than inheriting from a common type.
//! `created_at` is fixed at construction; `updated_at` only moves forward.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{StatusId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Soft-delete / visibility flag. Persisted as SMALLINT 0/1.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum RecordStatus {
    Disabled = 0,
    #[default]
    Enabled = 1,
}

impl RecordStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
        match id {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Enabled),
            other => Err(CoreError::Validation(format!(
                "Unknown status id {other}. Must be 0 (disabled) or 1 (enabled)"
            ))),
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

impl From<RecordStatus> for StatusId {
    fn from(value: RecordStatus) -> Self {
        value as StatusId
    }
}

impl TryFrom<StatusId> for RecordStatus {
    type Error = CoreError;

    fn try_from(value: StatusId) -> Result<Self, Self::Error> {
        Self::from_id(value)
    }
}

// ---------------------------------------------------------------------------
// BaseRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseRecord {
    created_at: Timestamp,
    updated_at: Timestamp,
    status: RecordStatus,
}

impl BaseRecord {
    /// A fresh, enabled record stamped at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self::with_status(now, RecordStatus::Enabled)
    }

    pub fn with_status(now: Timestamp, status: RecordStatus) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            status,
        }
    }

    /// Rehydrate a record loaded from storage.
    pub fn restore(
        created_at: Timestamp,
        updated_at: Timestamp,
        status: RecordStatus,
    ) -> Result<Self, CoreError> {
        if updated_at < created_at {
            return Err(CoreError::InvariantViolation(format!(
                "updated_at ({updated_at}) precedes created_at ({created_at})"
            )));
        }
        Ok(Self {
            created_at,
            updated_at,
            status,
        })
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn is_enabled(&self) -> bool {
        self.status.is_enabled()
    }

    /// Refresh `updated_at`. A clock that runs backwards never drags
    /// `updated_at` below its previous value.
    pub fn touch(&mut self, now: Timestamp) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Set the status and refresh `updated_at`, even when unchanged.
    pub fn set_status(&mut self, status: RecordStatus, now: Timestamp) {
        self.status = status;
        self.touch(now);
    }

    /// `created_at` is write-once: echoing the current value is accepted,
    /// anything else is rejected.
    pub fn set_created_at(&mut self, created_at: Timestamp) -> Result<(), CoreError> {
        if created_at != self.created_at {
            return Err(CoreError::InvariantViolation(
                "created_at cannot be changed after creation".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
