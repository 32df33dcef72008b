//! Comments anchored to a content item, threaded by `parent_id`.
//!
//! Parent links are plain ids into the flat comment table, never object
//! references. A link is only ever set at creation time and must point at a
//! comment that already exists on the same content item, so the reply graph
//! is acyclic by construction.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::record::{BaseRecord, RecordStatus};
use crate::types::{DbId, Timestamp, TOP_LEVEL_PARENT};
use crate::validation;

pub const MAX_BODY_LENGTH: usize = 5_000;

/// A row from the `comment` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub content_id: DbId,
    pub user_id: DbId,
    pub body: String,
    /// Id of the comment this replies to, [`TOP_LEVEL_PARENT`] for none.
    pub parent_id: DbId,
    #[serde(flatten)]
    pub record: BaseRecord,
}

/// DTO for creating a comment. A missing or zero `parent_id` makes a
/// top-level comment.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateComment {
    pub content_id: DbId,
    pub user_id: DbId,
    #[validate(
        length(min = 1, max = 5000, message = "must be between 1 and 5000 characters"),
        custom(function = "validation::not_blank")
    )]
    pub body: String,
    pub parent_id: Option<DbId>,
    pub status: Option<RecordStatus>,
}

/// DTO for editing a comment.
///
/// `parent_id` is accepted only so that clients echoing the full record are
/// not rejected; it must equal the stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateComment {
    #[validate(
        length(min = 1, max = 5000, message = "must be between 1 and 5000 characters"),
        custom(function = "validation::not_blank")
    )]
    pub body: Option<String>,
    pub parent_id: Option<DbId>,
}

impl CreateComment {
    /// The effective parent id, normalising `None` to [`TOP_LEVEL_PARENT`].
    pub fn parent(&self) -> DbId {
        self.parent_id.unwrap_or(TOP_LEVEL_PARENT)
    }
}

impl Comment {
    /// Build a comment. The parent must already have been checked with
    /// [`validate_parent`].
    pub fn create(id: DbId, input: &CreateComment, now: Timestamp) -> Result<Self, CoreError> {
        validation::check(input)?;
        if input.parent() < TOP_LEVEL_PARENT {
            return Err(CoreError::Validation(format!(
                "parent_id must be non-negative, got {}",
                input.parent()
            )));
        }
        if input.parent() == id {
            return Err(CoreError::InvalidParent(
                "a comment cannot reply to itself".into(),
            ));
        }
        Ok(Self {
            id,
            content_id: input.content_id,
            user_id: input.user_id,
            body: input.body.clone(),
            parent_id: input.parent(),
            record: BaseRecord::with_status(now, input.status.unwrap_or_default()),
        })
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id == TOP_LEVEL_PARENT
    }

    pub fn apply(&mut self, input: &UpdateComment, now: Timestamp) -> Result<(), CoreError> {
        validation::check(input)?;
        if let Some(parent_id) = input.parent_id {
            if parent_id != self.parent_id {
                return Err(CoreError::InvariantViolation(format!(
                    "parent_id of comment {} cannot change from {} to {parent_id}",
                    self.id, self.parent_id
                )));
            }
        }
        if let Some(body) = &input.body {
            self.body = body.clone();
        }
        self.record.touch(now);
        Ok(())
    }
}

/// Check that a proposed parent is eligible for a reply on `content_id`.
///
/// `parent` is the looked-up comment for `parent_id`, or `None` if no such
/// comment exists. Top-level comments need no parent.
pub fn validate_parent(
    content_id: DbId,
    parent_id: DbId,
    parent: Option<&Comment>,
) -> Result<(), CoreError> {
    if parent_id < TOP_LEVEL_PARENT {
        return Err(CoreError::Validation(format!(
            "parent_id must be non-negative, got {parent_id}"
        )));
    }
    if parent_id == TOP_LEVEL_PARENT {
        return Ok(());
    }
    let parent = parent.ok_or(CoreError::ReferenceNotFound {
        entity: "comment",
        id: parent_id,
    })?;
    if parent.content_id != content_id {
        return Err(CoreError::InvalidParent(format!(
            "comment {parent_id} belongs to content {} not {content_id}",
            parent.content_id
        )));
    }
    if !parent.record.is_enabled() {
        return Err(CoreError::InvalidParent(format!(
            "comment {parent_id} is disabled"
        )));
    }
    Ok(())
}

/// Number of parent links between a comment and its thread root (0 for a
/// top-level comment).
///
/// The walk is bounded by `limit` steps; exceeding it means the stored
/// links form a cycle, which creation rules make impossible, so it is
/// reported as an invariant violation rather than looping forever.
pub fn reply_depth<'a, F>(start: &'a Comment, limit: usize, lookup: F) -> Result<usize, CoreError>
where
    F: Fn(DbId) -> Option<&'a Comment>,
{
    let mut current = start;
    let mut depth = 0;
    while !current.is_top_level() {
        if depth >= limit {
            return Err(CoreError::InvariantViolation(format!(
                "reply chain from comment {} does not terminate",
                start.id
            )));
        }
        current = lookup(current.parent_id).ok_or(CoreError::ReferenceNotFound {
            entity: "comment",
            id: current.parent_id,
        })?;
        depth += 1;
    }
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashMap;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn comment(id: DbId, content_id: DbId, parent_id: DbId) -> Comment {
        let input = CreateComment {
            content_id,
            user_id: 7,
            body: format!("comment {id}"),
            parent_id: Some(parent_id),
            status: None,
        };
        Comment::create(id, &input, t0()).unwrap()
    }

    // -- create --------------------------------------------------------------

    #[test]
    fn missing_parent_means_top_level() {
        let input = CreateComment {
            content_id: 1,
            user_id: 2,
            body: "nice".into(),
            ..Default::default()
        };
        let c = Comment::create(1, &input, t0()).unwrap();
        assert!(c.is_top_level());
        assert_eq!(c.parent_id, TOP_LEVEL_PARENT);
    }

    #[test]
    fn blank_body_rejected() {
        let input = CreateComment {
            content_id: 1,
            user_id: 2,
            body: "  ".into(),
            ..Default::default()
        };
        assert_matches!(Comment::create(1, &input, t0()), Err(CoreError::Validation(_)));
    }

    #[test]
    fn negative_parent_rejected() {
        let input = CreateComment {
            content_id: 1,
            user_id: 2,
            body: "hi".into(),
            parent_id: Some(-4),
            status: None,
        };
        assert_matches!(Comment::create(1, &input, t0()), Err(CoreError::Validation(_)));
    }

    #[test]
    fn self_reply_rejected() {
        let input = CreateComment {
            content_id: 1,
            user_id: 2,
            body: "hi".into(),
            parent_id: Some(3),
            status: None,
        };
        assert_matches!(Comment::create(3, &input, t0()), Err(CoreError::InvalidParent(_)));
    }

    // -- apply ---------------------------------------------------------------

    #[test]
    fn echoed_parent_accepted() {
        let mut c = comment(2, 1, 1);
        let update = UpdateComment {
            body: Some("edited".into()),
            parent_id: Some(1),
        };
        c.apply(&update, t0() + Duration::seconds(1)).unwrap();
        assert_eq!(c.body, "edited");
    }

    #[test]
    fn reparenting_is_invariant_violation() {
        let mut c = comment(2, 1, 1);
        let update = UpdateComment {
            body: Some("edited".into()),
            parent_id: Some(0),
        };
        assert_matches!(
            c.apply(&update, t0() + Duration::seconds(1)),
            Err(CoreError::InvariantViolation(_))
        );
        assert_eq!(c.body, "comment 2");
        assert_eq!(c.parent_id, 1);
    }

    // -- validate_parent -----------------------------------------------------

    #[test]
    fn top_level_needs_no_parent() {
        assert!(validate_parent(1, TOP_LEVEL_PARENT, None).is_ok());
    }

    #[test]
    fn unknown_parent_is_reference_not_found() {
        assert_matches!(
            validate_parent(1, 42, None),
            Err(CoreError::ReferenceNotFound { entity: "comment", id: 42 })
        );
    }

    #[test]
    fn negative_parent_id_is_validation_error() {
        assert_matches!(validate_parent(1, -4, None), Err(CoreError::Validation(_)));
    }

    #[test]
    fn parent_on_other_content_is_invalid() {
        let parent = comment(1, 99, 0);
        assert_matches!(
            validate_parent(1, 1, Some(&parent)),
            Err(CoreError::InvalidParent(_))
        );
    }

    #[test]
    fn disabled_parent_is_invalid() {
        let mut parent = comment(1, 1, 0);
        parent
            .record
            .set_status(RecordStatus::Disabled, t0() + Duration::seconds(1));
        assert_matches!(
            validate_parent(1, 1, Some(&parent)),
            Err(CoreError::InvalidParent(_))
        );
    }

    // -- reply_depth ---------------------------------------------------------

    #[test]
    fn depth_follows_chain_to_root() {
        let all: HashMap<DbId, Comment> = [comment(1, 1, 0), comment(2, 1, 1), comment(3, 1, 2)]
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let depth = reply_depth(&all[&3], all.len(), |id| all.get(&id)).unwrap();
        assert_eq!(depth, 2);
        assert_eq!(reply_depth(&all[&1], all.len(), |id| all.get(&id)).unwrap(), 0);
    }

    #[test]
    fn corrupted_cycle_detected() {
        // Only reachable through hand-built data; creation never allows it.
        let mut a = comment(1, 1, 0);
        a.parent_id = 2;
        let b = comment(2, 1, 1);
        let all: HashMap<DbId, Comment> = [a, b].into_iter().map(|c| (c.id, c)).collect();
        assert_matches!(
            reply_depth(&all[&1], all.len(), |id| all.get(&id)),
            Err(CoreError::InvariantViolation(_))
        );
    }
}
