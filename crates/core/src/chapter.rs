//! Document chapter: a titled subsection owned by exactly one category.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::record::{BaseRecord, RecordStatus};
use crate::types::{DbId, Timestamp};
use crate::validation;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_SUMMARY_LENGTH: usize = 2_000;

/// A row from the `document_chapter` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentChapter {
    pub id: DbId,
    pub category_id: DbId,
    pub title: String,
    /// Short introduction shown above the chapter's content items.
    pub summary: String,
    pub sort_order: i32,
    #[serde(flatten)]
    pub record: BaseRecord,
}

/// DTO for creating a new chapter.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateDocumentChapter {
    pub category_id: DbId,
    #[validate(
        length(min = 1, max = 200, message = "must be between 1 and 200 characters"),
        custom(function = "validation::not_blank")
    )]
    pub title: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub summary: Option<String>,
    pub sort_order: Option<i32>,
    pub status: Option<RecordStatus>,
}

/// DTO for updating a chapter. Re-parenting goes through a dedicated move.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDocumentChapter {
    #[validate(
        length(min = 1, max = 200, message = "must be between 1 and 200 characters"),
        custom(function = "validation::not_blank")
    )]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub summary: Option<String>,
    pub sort_order: Option<i32>,
}

impl DocumentChapter {
    pub fn create(
        id: DbId,
        input: &CreateDocumentChapter,
        default_sort_order: i32,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        validation::check(input)?;
        Ok(Self {
            id,
            category_id: input.category_id,
            title: input.title.trim().to_string(),
            summary: input.summary.clone().unwrap_or_default(),
            sort_order: input.sort_order.unwrap_or(default_sort_order),
            record: BaseRecord::with_status(now, input.status.unwrap_or_default()),
        })
    }

    pub fn apply(&mut self, input: &UpdateDocumentChapter, now: Timestamp) -> Result<(), CoreError> {
        validation::check(input)?;
        if let Some(title) = &input.title {
            self.title = title.trim().to_string();
        }
        if let Some(summary) = &input.summary {
            self.summary = summary.clone();
        }
        if let Some(sort_order) = input.sort_order {
            self.sort_order = sort_order;
        }
        self.record.touch(now);
        Ok(())
    }

    /// Re-point the chapter at another category. Content items follow
    /// implicitly since they reference the chapter, not the category.
    pub fn move_to(&mut self, category_id: DbId, now: Timestamp) {
        self.category_id = category_id;
        self.record.touch(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn create(category_id: DbId, title: &str) -> CreateDocumentChapter {
        CreateDocumentChapter {
            category_id,
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn create_keeps_parent_reference() {
        let ch = DocumentChapter::create(4, &create(2, "Intro"), 10, t0()).unwrap();
        assert_eq!(ch.id, 4);
        assert_eq!(ch.category_id, 2);
        assert_eq!(ch.title, "Intro");
    }

    #[test]
    fn blank_title_rejected() {
        assert_matches!(
            DocumentChapter::create(1, &create(1, " "), 0, t0()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn long_summary_rejected() {
        let input = CreateDocumentChapter {
            summary: Some("s".repeat(MAX_SUMMARY_LENGTH + 1)),
            ..create(1, "Intro")
        };
        assert!(DocumentChapter::create(1, &input, 0, t0()).is_err());
    }

    #[test]
    fn move_refreshes_updated_at() {
        let mut ch = DocumentChapter::create(1, &create(1, "Intro"), 0, t0()).unwrap();
        ch.move_to(9, t0() + Duration::seconds(3));
        assert_eq!(ch.category_id, 9);
        assert_eq!(ch.record.updated_at(), t0() + Duration::seconds(3));
    }

    #[test]
    fn empty_patch_still_touches() {
        let mut ch = DocumentChapter::create(1, &create(1, "Intro"), 0, t0()).unwrap();
        ch.apply(&UpdateDocumentChapter::default(), t0() + Duration::seconds(1))
            .unwrap();
        assert_eq!(ch.title, "Intro");
        assert_eq!(ch.record.updated_at(), t0() + Duration::seconds(1));
    }
}
