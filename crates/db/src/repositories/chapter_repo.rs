//! Repository for the `document_chapter` table.

use sqlx::PgPool;

use docbase_core::audit::{modules, operation_codes, Actor};
use docbase_core::chapter::{CreateDocumentChapter, DocumentChapter, UpdateDocumentChapter};
use docbase_core::config::ModelConfig;
use docbase_core::error::CoreError;
use docbase_core::pagination::ListParams;
use docbase_core::record::RecordStatus;
use docbase_core::store::{DeletePolicy, DeleteReport, WithParent};
use docbase_core::types::{to_epoch_millis, DbId};

use super::{
    append_log, apply_delete, convert_all, enabled_contents_of, lock_row, now, parent_status,
    set_status,
};
use crate::error::DbError;
use crate::models::chapter::DocumentChapterRow;

/// Column list for `document_chapter` queries.
const COLUMNS: &str = "id, category_id, title, content, sort_order, status, created_at, updated_at";

/// Provides CRUD operations for document chapters.
pub struct DocumentChapterRepo;

impl DocumentChapterRepo {
    /// Insert a chapter. The category must exist; a disabled category is
    /// accepted and reported through `parent_status`.
    pub async fn create(
        pool: &PgPool,
        config: &ModelConfig,
        input: &CreateDocumentChapter,
        actor: &Actor,
    ) -> Result<WithParent<DocumentChapter>, DbError> {
        config.validate()?;
        let now = now();
        let mut tx = pool.begin().await?;
        let parent_status = parent_status(&mut tx, modules::CATEGORY, input.category_id).await?;

        let default_sort = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(sort_order) + $2, $2) FROM document_chapter WHERE category_id = $1",
        )
        .bind(input.category_id)
        .bind(config.sort_order_step)
        .fetch_one(&mut *tx)
        .await?;
        let draft = DocumentChapter::create(0, input, default_sort, now)?;

        let query = format!(
            "INSERT INTO document_chapter \
                (category_id, title, content, sort_order, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentChapterRow>(&query)
            .bind(draft.category_id)
            .bind(&draft.title)
            .bind(&draft.summary)
            .bind(draft.sort_order)
            .bind(draft.record.status().id())
            .bind(to_epoch_millis(now))
            .fetch_one(&mut *tx)
            .await?;
        let chapter = DocumentChapter::try_from(row)?;
        append_log(&mut tx, actor, operation_codes::CREATE, modules::CHAPTER, chapter.id, now).await?;
        tx.commit().await?;

        if !parent_status.is_enabled() {
            tracing::warn!(id = chapter.id, category_id = chapter.category_id, "Chapter created under disabled category");
        }
        tracing::info!(id = chapter.id, category_id = chapter.category_id, title = %chapter.title, "Chapter created");
        Ok(WithParent {
            entity: chapter,
            parent_status,
        })
    }

    /// Find a chapter by id, whatever its status.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DocumentChapter>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM document_chapter WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentChapterRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(DocumentChapter::try_from).transpose()?)
    }

    /// List the chapters of one category ordered by `(sort_order, id)`.
    pub async fn list_by_category(
        pool: &PgPool,
        config: &ModelConfig,
        category_id: DbId,
        params: &ListParams,
    ) -> Result<Vec<DocumentChapter>, DbError> {
        let (limit, offset) = params.window(config);
        let query = format!(
            "SELECT {COLUMNS} FROM document_chapter \
             WHERE category_id = $1 AND ($2 OR status = 1) \
             ORDER BY sort_order, id \
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, DocumentChapterRow>(&query)
            .bind(category_id)
            .bind(params.include_disabled)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;
        convert_all(rows)
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDocumentChapter,
        actor: &Actor,
    ) -> Result<DocumentChapter, DbError> {
        let now = now();
        let mut tx = pool.begin().await?;
        let row: DocumentChapterRow = lock_row(&mut tx, modules::CHAPTER, COLUMNS, id).await?;
        let mut chapter = DocumentChapter::try_from(row)?;
        chapter.apply(input, now)?;

        let row = Self::write(&mut tx, &chapter).await?;
        append_log(&mut tx, actor, operation_codes::UPDATE, modules::CHAPTER, id, now).await?;
        tx.commit().await?;

        tracing::info!(id, "Chapter updated");
        Ok(DocumentChapter::try_from(row)?)
    }

    /// Re-point a chapter at another category. Its content items move with
    /// it untouched.
    pub async fn move_to_category(
        pool: &PgPool,
        id: DbId,
        category_id: DbId,
        actor: &Actor,
    ) -> Result<WithParent<DocumentChapter>, DbError> {
        let now = now();
        let mut tx = pool.begin().await?;
        let row: DocumentChapterRow = lock_row(&mut tx, modules::CHAPTER, COLUMNS, id).await?;
        let mut chapter = DocumentChapter::try_from(row)?;
        let parent_status = parent_status(&mut tx, modules::CATEGORY, category_id).await?;

        let from = chapter.category_id;
        chapter.move_to(category_id, now);
        let row = Self::write(&mut tx, &chapter).await?;
        append_log(&mut tx, actor, operation_codes::MOVE, modules::CHAPTER, id, now).await?;
        tx.commit().await?;

        tracing::info!(id, from, to = category_id, "Chapter moved");
        Ok(WithParent {
            entity: DocumentChapter::try_from(row)?,
            parent_status,
        })
    }

    /// Plain status toggle; content items are left as they are.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: RecordStatus,
        actor: &Actor,
    ) -> Result<DocumentChapter, DbError> {
        let row: DocumentChapterRow =
            set_status(pool, modules::CHAPTER, COLUMNS, id, status, actor).await?;
        Ok(DocumentChapter::try_from(row)?)
    }

    /// Soft-delete a chapter under the given policy.
    pub async fn delete(
        pool: &PgPool,
        id: DbId,
        policy: DeletePolicy,
        actor: &Actor,
    ) -> Result<DeleteReport, DbError> {
        let now = now();
        let mut tx = pool.begin().await?;
        let _: DocumentChapterRow = lock_row(&mut tx, modules::CHAPTER, COLUMNS, id).await?;

        let report = DeleteReport {
            chapters: vec![id],
            contents: enabled_contents_of(&mut tx, &[id]).await?,
            ..DeleteReport::default()
        };
        let active = report.contents.len();
        if active > 0 && policy == DeletePolicy::Reject {
            tracing::warn!(id, active, "Chapter delete rejected: active children");
            return Err(CoreError::HasActiveChildren {
                entity: modules::CHAPTER,
                id,
                active_children: active,
            }
            .into());
        }

        apply_delete(&mut tx, &report, actor, now).await?;
        tx.commit().await?;

        tracing::info!(id, cascaded = active, "Chapter deleted");
        Ok(report)
    }

    /// Status of the category that contains chapter `id`.
    pub async fn parent_status(pool: &PgPool, id: DbId) -> Result<RecordStatus, DbError> {
        let status = sqlx::query_scalar::<_, i16>(
            "SELECT cat.status FROM document_chapter ch \
             JOIN document_category cat ON cat.id = ch.category_id \
             WHERE ch.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(CoreError::NotFound {
            entity: modules::CHAPTER,
            id,
        })?;
        Ok(RecordStatus::from_id(status)?)
    }

    /// Write every mutable column of a locked chapter back.
    async fn write(
        conn: &mut sqlx::PgConnection,
        chapter: &DocumentChapter,
    ) -> Result<DocumentChapterRow, DbError> {
        let query = format!(
            "UPDATE document_chapter \
             SET category_id = $2, title = $3, content = $4, sort_order = $5, updated_at = $6 \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentChapterRow>(&query)
            .bind(chapter.id)
            .bind(chapter.category_id)
            .bind(&chapter.title)
            .bind(&chapter.summary)
            .bind(chapter.sort_order)
            .bind(to_epoch_millis(chapter.record.updated_at()))
            .fetch_one(&mut *conn)
            .await?;
        Ok(row)
    }
}
