//! Document category: the top level of the containment tree.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::record::{BaseRecord, RecordStatus};
use crate::types::{DbId, Timestamp};
use crate::validation;

/// Maximum length of a category name in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of a category description in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// A row from the `document_category` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentCategory {
    pub id: DbId,
    pub name: String,
    pub description: String,
    /// Display position among sibling categories.
    pub sort_order: i32,
    #[serde(flatten)]
    pub record: BaseRecord,
}

/// DTO for creating a new category.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateDocumentCategory {
    #[validate(
        length(min = 1, max = 100, message = "must be between 1 and 100 characters"),
        custom(function = "validation::not_blank")
    )]
    pub name: String,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    /// Create the record disabled instead of the default enabled.
    pub status: Option<RecordStatus>,
}

/// DTO for updating a category.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDocumentCategory {
    #[validate(
        length(min = 1, max = 100, message = "must be between 1 and 100 characters"),
        custom(function = "validation::not_blank")
    )]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

impl DocumentCategory {
    /// Build a new category from a validated create DTO.
    pub fn create(
        id: DbId,
        input: &CreateDocumentCategory,
        default_sort_order: i32,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        validation::check(input)?;
        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            description: input.description.clone().unwrap_or_default(),
            sort_order: input.sort_order.unwrap_or(default_sort_order),
            record: BaseRecord::with_status(now, input.status.unwrap_or_default()),
        })
    }

    /// Apply a patch. Validation runs before any field is touched.
    pub fn apply(&mut self, input: &UpdateDocumentCategory, now: Timestamp) -> Result<(), CoreError> {
        validation::check(input)?;
        if let Some(name) = &input.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = &input.description {
            self.description = description.clone();
        }
        if let Some(sort_order) = input.sort_order {
            self.sort_order = sort_order;
        }
        self.record.touch(now);
        Ok(())
    }
}
