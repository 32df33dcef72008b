//! In-memory reference store for the document model.
//!
//! Each table is a flat `BTreeMap` arena keyed by id, with its own id
//! sequence starting at 1 (0 is reserved for "no parent"). The store is the
//! single enforcement point for cross-entity rules: parent references,
//! sibling ordering, reply eligibility, delete policy and audit emission.
//!
//! The store is passive and synchronous. Callers that share it across
//! threads serialize access themselves (e.g. behind a mutex); every
//! operation either applies completely or leaves the store untouched.

mod comments;
mod containment;
mod log;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::{self, Actor};
use crate::category::DocumentCategory;
use crate::chapter::DocumentChapter;
use crate::clock::{Clock, SystemClock};
use crate::comment::Comment;
use crate::config::ModelConfig;
use crate::content::DocumentContent;
use crate::error::CoreError;
use crate::operation_log::OperationLog;
use crate::record::{BaseRecord, RecordStatus};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Public result types
// ---------------------------------------------------------------------------

/// What to do when deleting a category or chapter that still has enabled
/// descendants. Deletion is always a soft delete (status = DISABLED).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Fail with [`CoreError::HasActiveChildren`].
    Reject,
    /// Disable every enabled descendant along with the target.
    Cascade,
}

/// An entity returned together with the status of its containing parent,
/// so callers can see when something was placed under a disabled parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithParent<T> {
    pub entity: T,
    pub parent_status: RecordStatus,
}

/// Rows disabled by a delete, target first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub categories: Vec<DbId>,
    pub chapters: Vec<DbId>,
    pub contents: Vec<DbId>,
}

impl DeleteReport {
    pub fn total(&self) -> usize {
        self.categories.len() + self.chapters.len() + self.contents.len()
    }
}

// ---------------------------------------------------------------------------
// Entity plumbing
// ---------------------------------------------------------------------------

/// Common access to the embedded [`BaseRecord`] and audit module name.
pub(crate) trait Tracked: Clone {
    /// Table name, used in errors and as the audit module.
    const MODULE: &'static str;

    fn record(&self) -> &BaseRecord;
    fn record_mut(&mut self) -> &mut BaseRecord;
}

macro_rules! impl_tracked {
    ($ty:ty, $module:expr) => {
        impl Tracked for $ty {
            const MODULE: &'static str = $module;

            fn record(&self) -> &BaseRecord {
                &self.record
            }

            fn record_mut(&mut self) -> &mut BaseRecord {
                &mut self.record
            }
        }
    };
}

impl_tracked!(DocumentCategory, audit::modules::CATEGORY);
impl_tracked!(DocumentChapter, audit::modules::CHAPTER);
impl_tracked!(DocumentContent, audit::modules::CONTENT);
impl_tracked!(Comment, audit::modules::COMMENT);

/// Look up a row for mutation, reporting a missing one as `NotFound`.
fn existing<T: Tracked>(table: &BTreeMap<DbId, T>, id: DbId) -> Result<&T, CoreError> {
    table.get(&id).ok_or(CoreError::NotFound {
        entity: T::MODULE,
        id,
    })
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Sequences {
    category: DbId,
    chapter: DbId,
    content: DbId,
    comment: DbId,
    operation_log: DbId,
}

impl Default for Sequences {
    fn default() -> Self {
        Self {
            category: 1,
            chapter: 1,
            content: 1,
            comment: 1,
            operation_log: 1,
        }
    }
}

pub struct ModelStore {
    config: ModelConfig,
    clock: Arc<dyn Clock>,
    seq: Sequences,
    categories: BTreeMap<DbId, DocumentCategory>,
    chapters: BTreeMap<DbId, DocumentChapter>,
    contents: BTreeMap<DbId, DocumentContent>,
    comments: BTreeMap<DbId, Comment>,
    operation_logs: BTreeMap<DbId, OperationLog>,
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("config", &self.config)
            .field("categories", &self.categories.len())
            .field("chapters", &self.chapters.len())
            .field("contents", &self.contents.len())
            .field("comments", &self.comments.len())
            .field("operation_logs", &self.operation_logs.len())
            .finish()
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::assemble(ModelConfig::default(), Arc::new(SystemClock))
    }
}

impl ModelStore {
    /// Fails with `Validation` when `config` is inconsistent (zero step or
    /// page sizes).
    pub fn new(config: ModelConfig) -> Result<Self, CoreError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ModelConfig, clock: Arc<dyn Clock>) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::assemble(config, clock))
    }

    fn assemble(config: ModelConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            seq: Sequences::default(),
            categories: BTreeMap::new(),
            chapters: BTreeMap::new(),
            contents: BTreeMap::new(),
            comments: BTreeMap::new(),
            operation_logs: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Build (and validate) the log entry for a mutation before anything is
    /// changed, so a malformed actor cannot leave an unlogged mutation.
    fn pending_log(
        &self,
        actor: &Actor,
        operation: i32,
        module: &str,
        id: DbId,
        now: Timestamp,
    ) -> Result<OperationLog, CoreError> {
        let input = audit::entry(actor, operation, module, id);
        OperationLog::record(self.seq.operation_log, &input, now)
    }

    /// Like [`Self::pending_log`] for a batch; ids are assigned in order.
    fn pending_logs(
        &self,
        actor: &Actor,
        entries: &[(i32, &str, DbId)],
        now: Timestamp,
    ) -> Result<Vec<OperationLog>, CoreError> {
        entries
            .iter()
            .zip(self.seq.operation_log..)
            .map(|(&(operation, module, id), log_id)| {
                let input = audit::entry(actor, operation, module, id);
                OperationLog::record(log_id, &input, now)
            })
            .collect()
    }

    fn commit_log(&mut self, entry: OperationLog) {
        self.seq.operation_log = entry.id + 1;
        self.operation_logs.insert(entry.id, entry);
    }

    /// Shared status toggle: always refreshes `updated_at`, never cascades.
    fn set_status_in<T: Tracked>(
        &mut self,
        select: fn(&mut Self) -> &mut BTreeMap<DbId, T>,
        id: DbId,
        status: RecordStatus,
        actor: &Actor,
    ) -> Result<T, CoreError> {
        let now = self.now();
        let log = self.pending_log(actor, audit::status_operation(status), T::MODULE, id, now)?;
        let row = select(self).get_mut(&id).ok_or(CoreError::NotFound {
            entity: T::MODULE,
            id,
        })?;
        row.record_mut().set_status(status, now);
        let updated = row.clone();
        self.commit_log(log);
        tracing::info!(module = T::MODULE, id, status = status.id(), "Status changed");
        Ok(updated)
    }
}
