//! Audit event emission for store mutations.
//!
//! Every mutating store operation names the [`Actor`] performing it and
//! appends one operation log entry at the point of mutation. Failed
//! operations append nothing.

use serde::Deserialize;

use crate::operation_log::CreateOperationLog;
use crate::record::RecordStatus;
use crate::types::DbId;

/// Operation codes stored in `operation_log.operation`.
pub mod operation_codes {
    pub const CREATE: i32 = 1;
    pub const UPDATE: i32 = 2;
    pub const DISABLE: i32 = 3;
    pub const ENABLE: i32 = 4;
    pub const MOVE: i32 = 5;
    pub const DELETE: i32 = 6;
    pub const REINDEX: i32 = 7;
}

/// Module names stored in `operation_log.module`; one per table.
pub mod modules {
    pub const CATEGORY: &str = "document_category";
    pub const CHAPTER: &str = "document_chapter";
    pub const CONTENT: &str = "document_content";
    pub const COMMENT: &str = "comment";
}

/// Map an operation code to its verb. Unknown codes map to `"unknown"`.
pub fn operation_name(code: i32) -> &'static str {
    match code {
        operation_codes::CREATE => "create",
        operation_codes::UPDATE => "update",
        operation_codes::DISABLE => "disable",
        operation_codes::ENABLE => "enable",
        operation_codes::MOVE => "move",
        operation_codes::DELETE => "delete",
        operation_codes::REINDEX => "reindex",
        _ => "unknown",
    }
}

/// Operation code for a status change.
pub fn status_operation(status: RecordStatus) -> i32 {
    match status {
        RecordStatus::Enabled => operation_codes::ENABLE,
        RecordStatus::Disabled => operation_codes::DISABLE,
    }
}

/// Who performed an operation and from where.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Actor {
    pub user_id: DbId,
    /// Originating IP address, if known.
    pub ip: Option<String>,
}

impl Actor {
    pub fn user(user_id: DbId, ip: impl Into<String>) -> Self {
        Self {
            user_id,
            ip: Some(ip.into()),
        }
    }

    /// Internal actor for maintenance jobs (user 0, no ip).
    pub fn system() -> Self {
        Self {
            user_id: 0,
            ip: None,
        }
    }
}

/// Build the log entry describing `operation` on `module` row `id`.
pub fn entry(actor: &Actor, operation: i32, module: &str, id: DbId) -> CreateOperationLog {
    CreateOperationLog {
        user_id: actor.user_id,
        operation,
        detail: format!("{} {module} #{id}", operation_name(operation)),
        ip: actor.ip.clone(),
        module: module.to_string(),
        oper_time: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_names() {
        assert_eq!(operation_name(operation_codes::CREATE), "create");
        assert_eq!(operation_name(operation_codes::REINDEX), "reindex");
        assert_eq!(operation_name(99), "unknown");
    }

    #[test]
    fn entry_describes_operation() {
        let actor = Actor::user(5, "192.168.1.20");
        let log = entry(&actor, operation_codes::MOVE, modules::CHAPTER, 12);
        assert_eq!(log.user_id, 5);
        assert_eq!(log.module, "document_chapter");
        assert_eq!(log.detail, "move document_chapter #12");
        assert_eq!(log.ip.as_deref(), Some("192.168.1.20"));
    }

    #[test]
    fn system_actor_has_no_ip() {
        let log = entry(&Actor::system(), operation_codes::REINDEX, modules::CONTENT, 1);
        assert_eq!(log.user_id, 0);
        assert!(log.ip.is_none());
    }
}
