use serde::Serialize;
use sqlx::FromRow;

use docbase_core::comment::Comment;
use docbase_core::error::CoreError;
use docbase_core::types::{DbId, StatusId};

use super::restore_record;

/// A row from the `comment` table. `parent_id = 0` marks a top-level comment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommentRow {
    pub id: DbId,
    pub content_id: DbId,
    pub user_id: DbId,
    pub content: String,
    pub parent_id: DbId,
    pub status: StatusId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<CommentRow> for Comment {
    type Error = CoreError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        if row.parent_id == row.id {
            return Err(CoreError::InvariantViolation(format!(
                "comment {} is stored as a reply to itself",
                row.id
            )));
        }
        Ok(Self {
            record: restore_record(row.created_at, row.updated_at, row.status)?,
            id: row.id,
            content_id: row.content_id,
            user_id: row.user_id,
            body: row.content,
            parent_id: row.parent_id,
        })
    }
}
