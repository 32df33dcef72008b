use serde::Serialize;
use sqlx::FromRow;

use docbase_core::content::DocumentContent;
use docbase_core::error::CoreError;
use docbase_core::types::{DbId, StatusId};

use super::restore_record;

/// A row from the `document_content` table. `content` holds the body.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentContentRow {
    pub id: DbId,
    pub chapter_id: DbId,
    pub title: String,
    pub content: String,
    pub sort_order: i32,
    pub status: StatusId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<DocumentContentRow> for DocumentContent {
    type Error = CoreError;

    fn try_from(row: DocumentContentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            record: restore_record(row.created_at, row.updated_at, row.status)?,
            id: row.id,
            chapter_id: row.chapter_id,
            title: row.title,
            body: row.content,
            sort_order: row.sort_order,
        })
    }
}
