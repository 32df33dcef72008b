use serde::Serialize;
use sqlx::FromRow;

use docbase_core::chapter::DocumentChapter;
use docbase_core::error::CoreError;
use docbase_core::types::{DbId, StatusId};

use super::restore_record;

/// A row from the `document_chapter` table. `content` holds the summary.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentChapterRow {
    pub id: DbId,
    pub category_id: DbId,
    pub title: String,
    pub content: String,
    pub sort_order: i32,
    pub status: StatusId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<DocumentChapterRow> for DocumentChapter {
    type Error = CoreError;

    fn try_from(row: DocumentChapterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            record: restore_record(row.created_at, row.updated_at, row.status)?,
            id: row.id,
            category_id: row.category_id,
            title: row.title,
            summary: row.content,
            sort_order: row.sort_order,
        })
    }
}
