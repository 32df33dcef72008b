//! Document content: the paged body items ordered within a chapter.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::record::{BaseRecord, RecordStatus};
use crate::types::{DbId, Timestamp};
use crate::validation;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_BODY_LENGTH: usize = 100_000;

/// A row from the `document_content` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentContent {
    pub id: DbId,
    pub chapter_id: DbId,
    pub title: String,
    pub body: String,
    /// Position within the chapter; unique among siblings.
    pub sort_order: i32,
    #[serde(flatten)]
    pub record: BaseRecord,
}

/// DTO for creating a content item. `sort_order` is auto-assigned after
/// the last sibling when omitted.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateDocumentContent {
    pub chapter_id: DbId,
    #[validate(
        length(min = 1, max = 200, message = "must be between 1 and 200 characters"),
        custom(function = "validation::not_blank")
    )]
    pub title: String,
    #[validate(length(max = 100000, message = "must be at most 100000 characters"))]
    pub body: Option<String>,
    pub sort_order: Option<i32>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDocumentContent {
    #[validate(
        length(min = 1, max = 200, message = "must be between 1 and 200 characters"),
        custom(function = "validation::not_blank")
    )]
    pub title: Option<String>,
    #[validate(length(max = 100000, message = "must be at most 100000 characters"))]
    pub body: Option<String>,
    pub sort_order: Option<i32>,
}

impl DocumentContent {
    /// `sort_order` must already be resolved (and checked for uniqueness) by
    /// the caller, which sees the sibling set.
    pub fn create(
        id: DbId,
        input: &CreateDocumentContent,
        sort_order: i32,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        validation::check(input)?;
        Ok(Self {
            id,
            chapter_id: input.chapter_id,
            title: input.title.trim().to_string(),
            body: input.body.clone().unwrap_or_default(),
            sort_order,
            record: BaseRecord::with_status(now, input.status.unwrap_or_default()),
        })
    }

    pub fn apply(&mut self, input: &UpdateDocumentContent, now: Timestamp) -> Result<(), CoreError> {
        validation::check(input)?;
        if let Some(title) = &input.title {
            self.title = title.trim().to_string();
        }
        if let Some(body) = &input.body {
            self.body = body.clone();
        }
        if let Some(sort_order) = input.sort_order {
            self.sort_order = sort_order;
        }
        self.record.touch(now);
        Ok(())
    }
}

/// Next free position after the current maximum, or `step` for an empty
/// parent. Fails with `Conflict` when no position is left above the maximum.
pub fn next_sort_order<I>(sibling_orders: I, step: i32) -> Result<i32, CoreError>
where
    I: IntoIterator<Item = i32>,
{
    match sibling_orders.into_iter().max() {
        None => Ok(step),
        Some(max) => max.checked_add(step).ok_or_else(|| {
            CoreError::Conflict(format!(
                "no sort_order left after {max}; reindex or pass an explicit position"
            ))
        }),
    }
}

/// Reject a position already held by another sibling.
pub fn ensure_sort_order_free<'a, I>(
    chapter_id: DbId,
    sort_order: i32,
    exclude_id: Option<DbId>,
    siblings: I,
) -> Result<(), CoreError>
where
    I: IntoIterator<Item = &'a DocumentContent>,
{
    let taken = siblings
        .into_iter()
        .any(|c| c.sort_order == sort_order && Some(c.id) != exclude_id);
    if taken {
        return Err(CoreError::Conflict(format!(
            "sort_order {sort_order} is already used in chapter {chapter_id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn item(id: DbId, sort_order: i32) -> DocumentContent {
        let input = CreateDocumentContent {
            chapter_id: 1,
            title: format!("Page {id}"),
            ..Default::default()
        };
        DocumentContent::create(id, &input, sort_order, t0()).unwrap()
    }

    // -- next_sort_order -----------------------------------------------------

    #[test]
    fn next_sort_order_empty_chapter_uses_step() {
        assert_eq!(next_sort_order(std::iter::empty(), 10).unwrap(), 10);
    }

    #[test]
    fn next_sort_order_after_max() {
        assert_eq!(next_sort_order([10, 30, 20], 10).unwrap(), 40);
    }

    #[test]
    fn next_sort_order_reaches_max_exactly() {
        assert_eq!(next_sort_order([i32::MAX - 10], 10).unwrap(), i32::MAX);
    }

    #[test]
    fn next_sort_order_overflow_conflicts() {
        assert_matches!(next_sort_order([i32::MAX - 1], 10), Err(CoreError::Conflict(_)));
        assert_matches!(next_sort_order([i32::MAX], 1), Err(CoreError::Conflict(_)));
    }

    // -- ensure_sort_order_free ----------------------------------------------

    #[test]
    fn duplicate_position_conflicts() {
        let siblings = [item(1, 10), item(2, 20)];
        assert_matches!(
            ensure_sort_order_free(1, 20, None, &siblings),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn own_position_is_not_a_conflict() {
        let siblings = [item(1, 10), item(2, 20)];
        assert!(ensure_sort_order_free(1, 20, Some(2), &siblings).is_ok());
        assert!(ensure_sort_order_free(1, 15, None, &siblings).is_ok());
    }

    // -- validation ----------------------------------------------------------

    #[test]
    fn oversized_body_rejected() {
        let input = CreateDocumentContent {
            chapter_id: 1,
            title: "Welcome".into(),
            body: Some("x".repeat(MAX_BODY_LENGTH + 1)),
            ..Default::default()
        };
        assert!(DocumentContent::create(1, &input, 10, t0()).is_err());
    }
}
