//! Category → chapter → content operations.

use crate::audit::{modules, operation_codes, Actor};
use crate::category::{CreateDocumentCategory, DocumentCategory, UpdateDocumentCategory};
use crate::chapter::{CreateDocumentChapter, DocumentChapter, UpdateDocumentChapter};
use crate::content::{
    ensure_sort_order_free, next_sort_order, CreateDocumentContent, DocumentContent,
    UpdateDocumentContent,
};
use crate::error::CoreError;
use crate::pagination::{paginate, ListParams};
use crate::record::RecordStatus;
use crate::types::DbId;

use super::{existing, DeletePolicy, DeleteReport, ModelStore, WithParent};

impl ModelStore {
    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    pub fn create_category(
        &mut self,
        input: &CreateDocumentCategory,
        actor: &Actor,
    ) -> Result<DocumentCategory, CoreError> {
        let now = self.now();
        let id = self.seq.category;
        let default_sort = match input.sort_order {
            Some(requested) => requested,
            None => next_sort_order(
                self.categories.values().map(|c| c.sort_order),
                self.config.sort_order_step,
            )?,
        };
        let category = DocumentCategory::create(id, input, default_sort, now)?;
        let log = self.pending_log(actor, operation_codes::CREATE, modules::CATEGORY, id, now)?;

        self.seq.category += 1;
        self.categories.insert(id, category.clone());
        self.commit_log(log);
        tracing::info!(id, name = %category.name, "Category created");
        Ok(category)
    }

    pub fn category(&self, id: DbId) -> Option<&DocumentCategory> {
        self.categories.get(&id)
    }

    /// Categories ordered by `(sort_order, id)`.
    pub fn list_categories(&self, params: &ListParams) -> Vec<&DocumentCategory> {
        let mut rows: Vec<&DocumentCategory> = self
            .categories
            .values()
            .filter(|c| params.include_disabled || c.record.is_enabled())
            .collect();
        rows.sort_by_key(|c| (c.sort_order, c.id));
        let (limit, offset) = params.window(&self.config);
        paginate(rows, limit, offset)
    }

    pub fn update_category(
        &mut self,
        id: DbId,
        input: &UpdateDocumentCategory,
        actor: &Actor,
    ) -> Result<DocumentCategory, CoreError> {
        let now = self.now();
        let mut updated = existing(&self.categories, id)?.clone();
        updated.apply(input, now)?;
        let log = self.pending_log(actor, operation_codes::UPDATE, modules::CATEGORY, id, now)?;

        self.categories.insert(id, updated.clone());
        self.commit_log(log);
        tracing::info!(id, "Category updated");
        Ok(updated)
    }

    /// Plain status toggle. Children are left exactly as they are; use
    /// [`Self::delete_category`] for policy-checked removal.
    pub fn set_category_status(
        &mut self,
        id: DbId,
        status: RecordStatus,
        actor: &Actor,
    ) -> Result<DocumentCategory, CoreError> {
        self.set_status_in::<DocumentCategory>(|s| &mut s.categories, id, status, actor)
    }

    /// Soft-delete a category under the given policy.
    pub fn delete_category(
        &mut self,
        id: DbId,
        policy: DeletePolicy,
        actor: &Actor,
    ) -> Result<DeleteReport, CoreError> {
        existing(&self.categories, id)?;
        let chapter_ids: Vec<DbId> = self
            .chapters
            .values()
            .filter(|ch| ch.category_id == id)
            .map(|ch| ch.id)
            .collect();

        let report = DeleteReport {
            categories: vec![id],
            chapters: self.enabled_chapters_of(id),
            contents: self.enabled_contents_of(&chapter_ids),
        };
        let active = report.chapters.len() + report.contents.len();
        if active > 0 && policy == DeletePolicy::Reject {
            tracing::warn!(id, active, "Category delete rejected: active children");
            return Err(CoreError::HasActiveChildren {
                entity: modules::CATEGORY,
                id,
                active_children: active,
            });
        }

        self.apply_delete(&report, actor)?;
        tracing::info!(id, cascaded = active, "Category deleted");
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Chapters
    // -----------------------------------------------------------------------

    /// Create a chapter. The category must exist; a disabled category is
    /// accepted and reported through `parent_status`.
    pub fn create_chapter(
        &mut self,
        input: &CreateDocumentChapter,
        actor: &Actor,
    ) -> Result<WithParent<DocumentChapter>, CoreError> {
        let parent_status = self.category_status(input.category_id)?;
        let now = self.now();
        let id = self.seq.chapter;
        let default_sort = match input.sort_order {
            Some(requested) => requested,
            None => next_sort_order(
                self.chapters
                    .values()
                    .filter(|ch| ch.category_id == input.category_id)
                    .map(|ch| ch.sort_order),
                self.config.sort_order_step,
            )?,
        };
        let chapter = DocumentChapter::create(id, input, default_sort, now)?;
        let log = self.pending_log(actor, operation_codes::CREATE, modules::CHAPTER, id, now)?;

        self.seq.chapter += 1;
        self.chapters.insert(id, chapter.clone());
        self.commit_log(log);
        if !parent_status.is_enabled() {
            tracing::warn!(id, category_id = chapter.category_id, "Chapter created under disabled category");
        }
        tracing::info!(id, category_id = chapter.category_id, title = %chapter.title, "Chapter created");
        Ok(WithParent {
            entity: chapter,
            parent_status,
        })
    }

    pub fn chapter(&self, id: DbId) -> Option<&DocumentChapter> {
        self.chapters.get(&id)
    }

    /// Chapters of one category ordered by `(sort_order, id)`.
    pub fn list_chapters(&self, category_id: DbId, params: &ListParams) -> Vec<&DocumentChapter> {
        let mut rows: Vec<&DocumentChapter> = self
            .chapters
            .values()
            .filter(|ch| ch.category_id == category_id)
            .filter(|ch| params.include_disabled || ch.record.is_enabled())
            .collect();
        rows.sort_by_key(|ch| (ch.sort_order, ch.id));
        let (limit, offset) = params.window(&self.config);
        paginate(rows, limit, offset)
    }

    pub fn update_chapter(
        &mut self,
        id: DbId,
        input: &UpdateDocumentChapter,
        actor: &Actor,
    ) -> Result<DocumentChapter, CoreError> {
        let now = self.now();
        let mut updated = existing(&self.chapters, id)?.clone();
        updated.apply(input, now)?;
        let log = self.pending_log(actor, operation_codes::UPDATE, modules::CHAPTER, id, now)?;

        self.chapters.insert(id, updated.clone());
        self.commit_log(log);
        tracing::info!(id, "Chapter updated");
        Ok(updated)
    }

    /// Re-point a chapter at another category. Its content items move with
    /// it untouched. Repeating the same move is harmless.
    pub fn move_chapter(
        &mut self,
        id: DbId,
        category_id: DbId,
        actor: &Actor,
    ) -> Result<WithParent<DocumentChapter>, CoreError> {
        let mut moved = existing(&self.chapters, id)?.clone();
        let parent_status = self.category_status(category_id)?;
        let now = self.now();
        let log = self.pending_log(actor, operation_codes::MOVE, modules::CHAPTER, id, now)?;

        let from = moved.category_id;
        moved.move_to(category_id, now);
        self.chapters.insert(id, moved.clone());
        self.commit_log(log);
        tracing::info!(id, from, to = category_id, "Chapter moved");
        Ok(WithParent {
            entity: moved,
            parent_status,
        })
    }

    pub fn set_chapter_status(
        &mut self,
        id: DbId,
        status: RecordStatus,
        actor: &Actor,
    ) -> Result<DocumentChapter, CoreError> {
        self.set_status_in::<DocumentChapter>(|s| &mut s.chapters, id, status, actor)
    }

    pub fn delete_chapter(
        &mut self,
        id: DbId,
        policy: DeletePolicy,
        actor: &Actor,
    ) -> Result<DeleteReport, CoreError> {
        existing(&self.chapters, id)?;
        let report = DeleteReport {
            chapters: vec![id],
            contents: self.enabled_contents_of(&[id]),
            ..DeleteReport::default()
        };
        let active = report.contents.len();
        if active > 0 && policy == DeletePolicy::Reject {
            tracing::warn!(id, active, "Chapter delete rejected: active children");
            return Err(CoreError::HasActiveChildren {
                entity: modules::CHAPTER,
                id,
                active_children: active,
            });
        }

        self.apply_delete(&report, actor)?;
        tracing::info!(id, cascaded = active, "Chapter deleted");
        Ok(report)
    }

    /// Status of the category that contains chapter `id`.
    pub fn chapter_parent_status(&self, id: DbId) -> Result<RecordStatus, CoreError> {
        let chapter = existing(&self.chapters, id)?;
        self.category_status(chapter.category_id)
    }

    // -----------------------------------------------------------------------
    // Contents
    // -----------------------------------------------------------------------

    /// Create a content item. Without an explicit `sort_order` it is placed
    /// after the last sibling; an explicit position must be free.
    pub fn create_content(
        &mut self,
        input: &CreateDocumentContent,
        actor: &Actor,
    ) -> Result<WithParent<DocumentContent>, CoreError> {
        let parent_status = self.chapter_status(input.chapter_id)?;
        let now = self.now();
        let id = self.seq.content;
        let sort_order = match input.sort_order {
            Some(requested) => {
                ensure_sort_order_free(
                    input.chapter_id,
                    requested,
                    None,
                    self.siblings_in(input.chapter_id),
                )?;
                requested
            }
            None => next_sort_order(
                self.siblings_in(input.chapter_id).map(|c| c.sort_order),
                self.config.sort_order_step,
            )?,
        };
        let content = DocumentContent::create(id, input, sort_order, now)?;
        let log = self.pending_log(actor, operation_codes::CREATE, modules::CONTENT, id, now)?;

        self.seq.content += 1;
        self.contents.insert(id, content.clone());
        self.commit_log(log);
        if !parent_status.is_enabled() {
            tracing::warn!(id, chapter_id = content.chapter_id, "Content created under disabled chapter");
        }
        tracing::info!(id, chapter_id = content.chapter_id, sort_order, "Content created");
        Ok(WithParent {
            entity: content,
            parent_status,
        })
    }

    pub fn content(&self, id: DbId) -> Option<&DocumentContent> {
        self.contents.get(&id)
    }

    /// Content items of one chapter ordered by `(sort_order, id)`.
    pub fn list_contents(&self, chapter_id: DbId, params: &ListParams) -> Vec<&DocumentContent> {
        let mut rows: Vec<&DocumentContent> = self
            .siblings_in(chapter_id)
            .filter(|c| params.include_disabled || c.record.is_enabled())
            .collect();
        rows.sort_by_key(|c| (c.sort_order, c.id));
        let (limit, offset) = params.window(&self.config);
        paginate(rows, limit, offset)
    }

    pub fn update_content(
        &mut self,
        id: DbId,
        input: &UpdateDocumentContent,
        actor: &Actor,
    ) -> Result<DocumentContent, CoreError> {
        let now = self.now();
        let mut updated = existing(&self.contents, id)?.clone();
        if let Some(requested) = input.sort_order {
            ensure_sort_order_free(
                updated.chapter_id,
                requested,
                Some(id),
                self.siblings_in(updated.chapter_id),
            )?;
        }
        updated.apply(input, now)?;
        let log = self.pending_log(actor, operation_codes::UPDATE, modules::CONTENT, id, now)?;

        self.contents.insert(id, updated.clone());
        self.commit_log(log);
        tracing::info!(id, "Content updated");
        Ok(updated)
    }

    pub fn set_content_status(
        &mut self,
        id: DbId,
        status: RecordStatus,
        actor: &Actor,
    ) -> Result<DocumentContent, CoreError> {
        self.set_status_in::<DocumentContent>(|s| &mut s.contents, id, status, actor)
    }

    /// Renumber every content item of a chapter to `step, 2*step, ...` in
    /// display order. Only rows whose position changes are touched; their
    /// ids are returned.
    pub fn reindex_contents(&mut self, chapter_id: DbId, actor: &Actor) -> Result<Vec<DbId>, CoreError> {
        self.chapter_status(chapter_id)?;
        let step = self.config.sort_order_step;
        let mut ordered: Vec<(i32, DbId)> = self
            .siblings_in(chapter_id)
            .map(|c| (c.sort_order, c.id))
            .collect();
        ordered.sort_unstable();

        let mut moves: Vec<(DbId, i32)> = Vec::new();
        for (index, (current, id)) in ordered.into_iter().enumerate() {
            let target = i32::try_from(index + 1)
                .ok()
                .and_then(|n| n.checked_mul(step))
                .ok_or_else(|| {
                    CoreError::Conflict(format!(
                        "chapter {chapter_id} has too many items to reindex with step {step}"
                    ))
                })?;
            if target != current {
                moves.push((id, target));
            }
        }

        let now = self.now();
        let log = self.pending_log(actor, operation_codes::REINDEX, modules::CHAPTER, chapter_id, now)?;
        for &(id, target) in &moves {
            if let Some(row) = self.contents.get_mut(&id) {
                row.sort_order = target;
                row.record.touch(now);
            }
        }
        self.commit_log(log);
        tracing::info!(chapter_id, changed = moves.len(), "Contents reindexed");
        Ok(moves.into_iter().map(|(id, _)| id).collect())
    }

    /// Status of the chapter that contains content `id`.
    pub fn content_parent_status(&self, id: DbId) -> Result<RecordStatus, CoreError> {
        let content = existing(&self.contents, id)?;
        self.chapter_status(content.chapter_id)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn category_status(&self, id: DbId) -> Result<RecordStatus, CoreError> {
        self.categories
            .get(&id)
            .map(|c| c.record.status())
            .ok_or(CoreError::ReferenceNotFound {
                entity: modules::CATEGORY,
                id,
            })
    }

    fn chapter_status(&self, id: DbId) -> Result<RecordStatus, CoreError> {
        self.chapters
            .get(&id)
            .map(|ch| ch.record.status())
            .ok_or(CoreError::ReferenceNotFound {
                entity: modules::CHAPTER,
                id,
            })
    }

    fn siblings_in(&self, chapter_id: DbId) -> impl Iterator<Item = &DocumentContent> + '_ {
        self.contents
            .values()
            .filter(move |c| c.chapter_id == chapter_id)
    }

    fn enabled_chapters_of(&self, category_id: DbId) -> Vec<DbId> {
        self.chapters
            .values()
            .filter(|ch| ch.category_id == category_id && ch.record.is_enabled())
            .map(|ch| ch.id)
            .collect()
    }

    fn enabled_contents_of(&self, chapter_ids: &[DbId]) -> Vec<DbId> {
        self.contents
            .values()
            .filter(|c| chapter_ids.contains(&c.chapter_id) && c.record.is_enabled())
            .map(|c| c.id)
            .collect()
    }

    /// Disable every row named in `report`, logging a DELETE for the target
    /// and a DISABLE for each cascaded descendant.
    fn apply_delete(&mut self, report: &DeleteReport, actor: &Actor) -> Result<(), CoreError> {
        let now = self.now();
        let mut entries: Vec<(i32, &str, DbId)> = Vec::with_capacity(report.total());
        let (target_module, target_id) = match (report.categories.first(), report.chapters.first()) {
            (Some(&id), _) => (modules::CATEGORY, id),
            (None, Some(&id)) => (modules::CHAPTER, id),
            (None, None) => {
                return Err(CoreError::Internal("delete report names no target".into()));
            }
        };
        entries.push((operation_codes::DELETE, target_module, target_id));
        let cascaded_chapters = if target_module == modules::CHAPTER {
            &report.chapters[1..]
        } else {
            &report.chapters[..]
        };
        entries.extend(
            cascaded_chapters
                .iter()
                .map(|&id| (operation_codes::DISABLE, modules::CHAPTER, id)),
        );
        entries.extend(
            report
                .contents
                .iter()
                .map(|&id| (operation_codes::DISABLE, modules::CONTENT, id)),
        );
        let logs = self.pending_logs(actor, &entries, now)?;

        for id in &report.categories {
            if let Some(row) = self.categories.get_mut(id) {
                row.record.set_status(RecordStatus::Disabled, now);
            }
        }
        for id in &report.chapters {
            if let Some(row) = self.chapters.get_mut(id) {
                row.record.set_status(RecordStatus::Disabled, now);
            }
        }
        for id in &report.contents {
            if let Some(row) = self.contents.get_mut(id) {
                row.record.set_status(RecordStatus::Disabled, now);
            }
        }
        for log in logs {
            self.commit_log(log);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::super::test_support::{actor, store, t0};
    use super::*;
    use crate::audit::Actor;

    fn new_category(name: &str) -> CreateDocumentCategory {
        CreateDocumentCategory {
            name: name.into(),
            ..Default::default()
        }
    }

    fn new_chapter(category_id: DbId, title: &str) -> CreateDocumentChapter {
        CreateDocumentChapter {
            category_id,
            title: title.into(),
            ..Default::default()
        }
    }

    fn new_content(chapter_id: DbId, title: &str, sort_order: Option<i32>) -> CreateDocumentContent {
        CreateDocumentContent {
            chapter_id,
            title: title.into(),
            sort_order,
            ..Default::default()
        }
    }

    // -- categories ----------------------------------------------------------

    #[test]
    fn categories_get_increasing_default_positions() {
        let (mut store, _) = store();
        let a = store.create_category(&new_category("A"), &actor()).unwrap();
        let b = store.create_category(&new_category("B"), &actor()).unwrap();
        assert_eq!((a.id, a.sort_order), (1, 10));
        assert_eq!((b.id, b.sort_order), (2, 20));
    }

    #[test]
    fn equal_sort_orders_break_ties_by_id() {
        let (mut store, _) = store();
        for name in ["C", "A", "B"] {
            let input = CreateDocumentCategory {
                sort_order: Some(5),
                ..new_category(name)
            };
            store.create_category(&input, &actor()).unwrap();
        }
        for _ in 0..3 {
            let names: Vec<&str> = store
                .list_categories(&ListParams::default())
                .iter()
                .map(|c| c.name.as_str())
                .collect();
            assert_eq!(names, vec!["C", "A", "B"]);
        }
    }

    #[test]
    fn update_refreshes_updated_at_only() {
        let (mut store, clock) = store();
        let cat = store.create_category(&new_category("Guides"), &actor()).unwrap();
        clock.advance(Duration::minutes(5));
        let updated = store
            .update_category(
                cat.id,
                &UpdateDocumentCategory {
                    name: Some("Manuals".into()),
                    ..Default::default()
                },
                &actor(),
            )
            .unwrap();
        assert_eq!(updated.name, "Manuals");
        assert_eq!(updated.record.created_at(), t0());
        assert_eq!(updated.record.updated_at(), t0() + Duration::minutes(5));
    }

    #[test]
    fn update_missing_category_is_not_found() {
        let (mut store, _) = store();
        assert_matches!(
            store.update_category(7, &UpdateDocumentCategory::default(), &actor()),
            Err(CoreError::NotFound { entity: "document_category", id: 7 })
        );
    }

    #[test]
    fn disabling_twice_still_refreshes() {
        let (mut store, clock) = store();
        let cat = store.create_category(&new_category("Guides"), &actor()).unwrap();
        clock.advance(Duration::seconds(1));
        store.set_category_status(cat.id, RecordStatus::Disabled, &actor()).unwrap();
        clock.advance(Duration::seconds(1));
        let again = store
            .set_category_status(cat.id, RecordStatus::Disabled, &actor())
            .unwrap();
        assert_eq!(again.record.status(), RecordStatus::Disabled);
        assert_eq!(again.record.updated_at(), t0() + Duration::seconds(2));
    }

    #[test]
    fn disabled_categories_hidden_from_default_listing() {
        let (mut store, _) = store();
        let a = store.create_category(&new_category("A"), &actor()).unwrap();
        store.create_category(&new_category("B"), &actor()).unwrap();
        store.set_category_status(a.id, RecordStatus::Disabled, &actor()).unwrap();
        assert_eq!(store.list_categories(&ListParams::default()).len(), 1);
        assert_eq!(store.list_categories(&ListParams::all()).len(), 2);
    }

    #[test]
    fn malformed_actor_ip_blocks_mutation() {
        let (mut store, _) = store();
        let bad = Actor::user(1, "not-an-ip");
        assert!(store.create_category(&new_category("Guides"), &bad).is_err());
        assert!(store.category(1).is_none());
        assert!(store.operation_log(1).is_none());
    }

    // -- chapters ------------------------------------------------------------

    #[test]
    fn chapter_requires_existing_category() {
        let (mut store, _) = store();
        assert_matches!(
            store.create_chapter(&new_chapter(3, "Intro"), &actor()),
            Err(CoreError::ReferenceNotFound { entity: "document_category", id: 3 })
        );
        assert!(store.chapter(1).is_none());
    }

    #[test]
    fn chapter_under_disabled_category_is_observable() {
        let (mut store, _) = store();
        let cat = store.create_category(&new_category("Guides"), &actor()).unwrap();
        store.set_category_status(cat.id, RecordStatus::Disabled, &actor()).unwrap();
        let created = store.create_chapter(&new_chapter(cat.id, "Intro"), &actor()).unwrap();
        assert_eq!(created.parent_status, RecordStatus::Disabled);
        assert_eq!(
            store.chapter_parent_status(created.entity.id).unwrap(),
            RecordStatus::Disabled
        );
    }

    #[test]
    fn move_chapter_keeps_contents_attached() {
        let (mut store, clock) = store();
        let a = store.create_category(&new_category("A"), &actor()).unwrap();
        let b = store.create_category(&new_category("B"), &actor()).unwrap();
        let ch = store.create_chapter(&new_chapter(a.id, "Intro"), &actor()).unwrap().entity;
        let content = store
            .create_content(&new_content(ch.id, "Welcome", None), &actor())
            .unwrap()
            .entity;

        clock.advance(Duration::seconds(30));
        let moved = store.move_chapter(ch.id, b.id, &actor()).unwrap();
        assert_eq!(moved.entity.category_id, b.id);
        assert_eq!(moved.entity.record.updated_at(), t0() + Duration::seconds(30));
        assert_eq!(store.content(content.id), Some(&content));
        assert_eq!(store.list_chapters(b.id, &ListParams::default()).len(), 1);
        assert!(store.list_chapters(a.id, &ListParams::default()).is_empty());

        // Retrying the same move converges on the same state.
        let again = store.move_chapter(ch.id, b.id, &actor()).unwrap();
        assert_eq!(again.entity.category_id, b.id);
    }

    #[test]
    fn move_to_missing_category_rejected() {
        let (mut store, _) = store();
        let a = store.create_category(&new_category("A"), &actor()).unwrap();
        let ch = store.create_chapter(&new_chapter(a.id, "Intro"), &actor()).unwrap().entity;
        assert_matches!(
            store.move_chapter(ch.id, 42, &actor()),
            Err(CoreError::ReferenceNotFound { .. })
        );
        assert_eq!(store.chapter(ch.id).unwrap().category_id, a.id);
    }

    // -- contents ------------------------------------------------------------

    #[test]
    fn content_requires_existing_chapter() {
        let (mut store, _) = store();
        assert_matches!(
            store.create_content(&new_content(5, "Welcome", None), &actor()),
            Err(CoreError::ReferenceNotFound { entity: "document_chapter", id: 5 })
        );
    }

    #[test]
    fn duplicate_content_position_conflicts() {
        let (mut store, _) = store();
        let cat = store.create_category(&new_category("A"), &actor()).unwrap();
        let ch = store.create_chapter(&new_chapter(cat.id, "Intro"), &actor()).unwrap().entity;
        store.create_content(&new_content(ch.id, "One", Some(1)), &actor()).unwrap();
        assert_matches!(
            store.create_content(&new_content(ch.id, "Two", Some(1)), &actor()),
            Err(CoreError::Conflict(_))
        );
        let auto = store.create_content(&new_content(ch.id, "Two", None), &actor()).unwrap();
        assert_eq!(auto.entity.sort_order, 11);
    }

    #[test]
    fn auto_position_after_max_value_conflicts() {
        let (mut store, _) = store();
        let cat = store.create_category(&new_category("A"), &actor()).unwrap();
        let ch = store.create_chapter(&new_chapter(cat.id, "Intro"), &actor()).unwrap().entity;
        store
            .create_content(&new_content(ch.id, "Last", Some(i32::MAX)), &actor())
            .unwrap();
        assert_matches!(
            store.create_content(&new_content(ch.id, "After", None), &actor()),
            Err(CoreError::Conflict(_))
        );

        let orders: Vec<i32> = store
            .list_contents(ch.id, &ListParams::all())
            .iter()
            .map(|c| c.sort_order)
            .collect();
        assert_eq!(orders, vec![i32::MAX]);

        // Reindexing frees room at the end again.
        store.reindex_contents(ch.id, &actor()).unwrap();
        let next = store.create_content(&new_content(ch.id, "After", None), &actor()).unwrap();
        assert_eq!(next.entity.sort_order, 20);
    }

    #[test]
    fn same_position_allowed_in_different_chapters() {
        let (mut store, _) = store();
        let cat = store.create_category(&new_category("A"), &actor()).unwrap();
        let one = store.create_chapter(&new_chapter(cat.id, "One"), &actor()).unwrap().entity;
        let two = store.create_chapter(&new_chapter(cat.id, "Two"), &actor()).unwrap().entity;
        store.create_content(&new_content(one.id, "x", Some(1)), &actor()).unwrap();
        assert!(store.create_content(&new_content(two.id, "y", Some(1)), &actor()).is_ok());
    }

    #[test]
    fn update_content_position_checked_against_siblings() {
        let (mut store, _) = store();
        let cat = store.create_category(&new_category("A"), &actor()).unwrap();
        let ch = store.create_chapter(&new_chapter(cat.id, "Intro"), &actor()).unwrap().entity;
        let a = store.create_content(&new_content(ch.id, "A", None), &actor()).unwrap().entity;
        let b = store.create_content(&new_content(ch.id, "B", None), &actor()).unwrap().entity;
        let clash = UpdateDocumentContent {
            sort_order: Some(a.sort_order),
            ..Default::default()
        };
        assert_matches!(
            store.update_content(b.id, &clash, &actor()),
            Err(CoreError::Conflict(_))
        );
        let keep = UpdateDocumentContent {
            sort_order: Some(b.sort_order),
            body: Some("text".into()),
            ..Default::default()
        };
        assert_eq!(store.update_content(b.id, &keep, &actor()).unwrap().body, "text");
    }

    #[test]
    fn reindex_renumbers_in_display_order() {
        let (mut store, clock) = store();
        let cat = store.create_category(&new_category("A"), &actor()).unwrap();
        let ch = store.create_chapter(&new_chapter(cat.id, "Intro"), &actor()).unwrap().entity;
        let c = store.create_content(&new_content(ch.id, "C", Some(7)), &actor()).unwrap().entity;
        let a = store.create_content(&new_content(ch.id, "A", Some(-3)), &actor()).unwrap().entity;
        let b = store.create_content(&new_content(ch.id, "B", Some(30)), &actor()).unwrap().entity;

        clock.advance(Duration::seconds(9));
        let changed = store.reindex_contents(ch.id, &Actor::system()).unwrap();
        assert_eq!(changed, vec![a.id, c.id]);

        let order: Vec<(DbId, i32)> = store
            .list_contents(ch.id, &ListParams::default())
            .iter()
            .map(|x| (x.id, x.sort_order))
            .collect();
        assert_eq!(order, vec![(a.id, 10), (c.id, 20), (b.id, 30)]);
        assert_eq!(store.content(b.id).unwrap().record.updated_at(), t0());
        assert_eq!(
            store.content(a.id).unwrap().record.updated_at(),
            t0() + Duration::seconds(9)
        );
    }

    // -- delete policy -------------------------------------------------------

    fn tree() -> (ModelStore, DbId, DbId, DbId) {
        let (mut store, _) = store();
        let cat = store.create_category(&new_category("Guides"), &actor()).unwrap();
        let ch = store.create_chapter(&new_chapter(cat.id, "Intro"), &actor()).unwrap().entity;
        let content = store
            .create_content(&new_content(ch.id, "Welcome", None), &actor())
            .unwrap()
            .entity;
        (store, cat.id, ch.id, content.id)
    }

    #[test]
    fn reject_policy_blocks_category_with_active_children() {
        let (mut store, cat, ch, content) = tree();
        let logs_before = store.operation_logs.len();
        assert_matches!(
            store.delete_category(cat, DeletePolicy::Reject, &actor()),
            Err(CoreError::HasActiveChildren { active_children: 2, .. })
        );
        assert!(store.category(cat).unwrap().record.is_enabled());
        assert!(store.chapter(ch).unwrap().record.is_enabled());
        assert!(store.content(content).unwrap().record.is_enabled());
        assert_eq!(store.operation_logs.len(), logs_before);
    }

    #[test]
    fn reject_policy_allows_category_without_active_children() {
        let (mut store, cat, ch, content) = tree();
        store.set_content_status(content, RecordStatus::Disabled, &actor()).unwrap();
        store.set_chapter_status(ch, RecordStatus::Disabled, &actor()).unwrap();
        let report = store.delete_category(cat, DeletePolicy::Reject, &actor()).unwrap();
        assert_eq!(report.categories, vec![cat]);
        assert_eq!(report.total(), 1);
        assert!(!store.category(cat).unwrap().record.is_enabled());
    }

    #[test]
    fn enabled_content_under_disabled_chapter_still_blocks() {
        let (mut store, cat, ch, _) = tree();
        store.set_chapter_status(ch, RecordStatus::Disabled, &actor()).unwrap();
        assert_matches!(
            store.delete_category(cat, DeletePolicy::Reject, &actor()),
            Err(CoreError::HasActiveChildren { active_children: 1, .. })
        );
    }

    #[test]
    fn cascade_policy_disables_descendants() {
        let (mut store, cat, ch, content) = tree();
        let report = store.delete_category(cat, DeletePolicy::Cascade, &actor()).unwrap();
        assert_eq!(report.chapters, vec![ch]);
        assert_eq!(report.contents, vec![content]);
        assert!(!store.chapter(ch).unwrap().record.is_enabled());
        assert!(!store.content(content).unwrap().record.is_enabled());
        let last = store.operation_logs.values().last().unwrap();
        assert_eq!(last.operation, operation_codes::DISABLE);
        assert_eq!(last.module, modules::CONTENT);
    }

    #[test]
    fn chapter_delete_policies() {
        let (mut store, _, ch, content) = tree();
        assert_matches!(
            store.delete_chapter(ch, DeletePolicy::Reject, &actor()),
            Err(CoreError::HasActiveChildren { entity: "document_chapter", .. })
        );
        let report = store.delete_chapter(ch, DeletePolicy::Cascade, &actor()).unwrap();
        assert_eq!(report.chapters, vec![ch]);
        assert_eq!(report.contents, vec![content]);
        assert_eq!(store.content_parent_status(content).unwrap(), RecordStatus::Disabled);
    }
}
