use serde::Serialize;
use sqlx::FromRow;

use docbase_core::category::DocumentCategory;
use docbase_core::error::CoreError;
use docbase_core::types::{DbId, StatusId};

use super::restore_record;

/// A row from the `document_category` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentCategoryRow {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub sort_order: i32,
    pub status: StatusId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<DocumentCategoryRow> for DocumentCategory {
    type Error = CoreError;

    fn try_from(row: DocumentCategoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            record: restore_record(row.created_at, row.updated_at, row.status)?,
            id: row.id,
            name: row.name,
            description: row.description,
            sort_order: row.sort_order,
        })
    }
}
