//! Repository for the `document_content` table.
//!
//! Positions are unique per chapter (`uq_document_content_position`). The
//! sibling rows are locked and checked before every write, and a race that
//! still reaches the index is reported as the same `Conflict`.

use sqlx::{PgConnection, PgPool};

use docbase_core::audit::{modules, operation_codes, Actor};
use docbase_core::config::ModelConfig;
use docbase_core::content::{
    ensure_sort_order_free, next_sort_order, CreateDocumentContent, DocumentContent,
    UpdateDocumentContent,
};
use docbase_core::error::CoreError;
use docbase_core::pagination::ListParams;
use docbase_core::record::RecordStatus;
use docbase_core::store::WithParent;
use docbase_core::types::{to_epoch_millis, DbId};

use super::{append_log, convert_all, lock_row, now, parent_status, set_status};
use crate::error::{map_position_conflict, DbError};
use crate::models::content::DocumentContentRow;

/// Column list for `document_content` queries.
const COLUMNS: &str = "id, chapter_id, title, content, sort_order, status, created_at, updated_at";

/// Provides CRUD and ordering operations for document content items.
pub struct DocumentContentRepo;

impl DocumentContentRepo {
    /// Insert a content item. Without an explicit `sort_order` it is placed
    /// after the last sibling; an explicit position must be free.
    pub async fn create(
        pool: &PgPool,
        config: &ModelConfig,
        input: &CreateDocumentContent,
        actor: &Actor,
    ) -> Result<WithParent<DocumentContent>, DbError> {
        config.validate()?;
        let now = now();
        let mut tx = pool.begin().await?;
        let parent_status = parent_status(&mut tx, modules::CHAPTER, input.chapter_id).await?;

        let siblings = Self::lock_siblings(&mut tx, input.chapter_id).await?;
        let sort_order = match input.sort_order {
            Some(requested) => {
                ensure_sort_order_free(input.chapter_id, requested, None, &siblings)?;
                requested
            }
            None => next_sort_order(siblings.iter().map(|c| c.sort_order), config.sort_order_step)?,
        };
        let draft = DocumentContent::create(0, input, sort_order, now)?;

        let query = format!(
            "INSERT INTO document_content \
                (chapter_id, title, content, sort_order, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentContentRow>(&query)
            .bind(draft.chapter_id)
            .bind(&draft.title)
            .bind(&draft.body)
            .bind(draft.sort_order)
            .bind(draft.record.status().id())
            .bind(to_epoch_millis(now))
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_position_conflict(e, draft.chapter_id, draft.sort_order))?;
        let content = DocumentContent::try_from(row)?;
        append_log(&mut tx, actor, operation_codes::CREATE, modules::CONTENT, content.id, now).await?;
        tx.commit().await?;

        if !parent_status.is_enabled() {
            tracing::warn!(id = content.id, chapter_id = content.chapter_id, "Content created under disabled chapter");
        }
        tracing::info!(id = content.id, chapter_id = content.chapter_id, sort_order, "Content created");
        Ok(WithParent {
            entity: content,
            parent_status,
        })
    }

    /// Find a content item by id, whatever its status.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DocumentContent>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM document_content WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentContentRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(DocumentContent::try_from).transpose()?)
    }

    /// List the items of one chapter ordered by `(sort_order, id)`.
    pub async fn list_by_chapter(
        pool: &PgPool,
        config: &ModelConfig,
        chapter_id: DbId,
        params: &ListParams,
    ) -> Result<Vec<DocumentContent>, DbError> {
        let (limit, offset) = params.window(config);
        let query = format!(
            "SELECT {COLUMNS} FROM document_content \
             WHERE chapter_id = $1 AND ($2 OR status = 1) \
             ORDER BY sort_order, id \
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, DocumentContentRow>(&query)
            .bind(chapter_id)
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
        input: &UpdateDocumentContent,
        actor: &Actor,
    ) -> Result<DocumentContent, DbError> {
        let now = now();
        let mut tx = pool.begin().await?;
        let row: DocumentContentRow = lock_row(&mut tx, modules::CONTENT, COLUMNS, id).await?;
        let mut content = DocumentContent::try_from(row)?;
        if let Some(requested) = input.sort_order {
            let siblings = Self::lock_siblings(&mut tx, content.chapter_id).await?;
            ensure_sort_order_free(content.chapter_id, requested, Some(id), &siblings)?;
        }
        content.apply(input, now)?;

        let query = format!(
            "UPDATE document_content \
             SET title = $2, content = $3, sort_order = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentContentRow>(&query)
            .bind(id)
            .bind(&content.title)
            .bind(&content.body)
            .bind(content.sort_order)
            .bind(to_epoch_millis(content.record.updated_at()))
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_position_conflict(e, content.chapter_id, content.sort_order))?;
        append_log(&mut tx, actor, operation_codes::UPDATE, modules::CONTENT, id, now).await?;
        tx.commit().await?;

        tracing::info!(id, "Content updated");
        Ok(DocumentContent::try_from(row)?)
    }

    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: RecordStatus,
        actor: &Actor,
    ) -> Result<DocumentContent, DbError> {
        let row: DocumentContentRow =
            set_status(pool, modules::CONTENT, COLUMNS, id, status, actor).await?;
        Ok(DocumentContent::try_from(row)?)
    }

    /// Renumber every item of a chapter to `step, 2*step, ...` in display
    /// order. Only rows whose position changes are touched; their ids are
    /// returned. The position index is deferred to commit so rows can pass
    /// through each other's old positions.
    pub async fn reindex(
        pool: &PgPool,
        config: &ModelConfig,
        chapter_id: DbId,
        actor: &Actor,
    ) -> Result<Vec<DbId>, DbError> {
        config.validate()?;
        let step = config.sort_order_step;
        let now = now();
        let mut tx = pool.begin().await?;
        parent_status(&mut tx, modules::CHAPTER, chapter_id).await?;
        sqlx::query("SET CONSTRAINTS uq_document_content_position DEFERRED")
            .execute(&mut *tx)
            .await?;

        // Already ordered by (sort_order, id).
        let siblings = Self::lock_siblings(&mut tx, chapter_id).await?;
        let mut moves: Vec<(DbId, i32)> = Vec::new();
        for (index, item) in siblings.iter().enumerate() {
            let target = i32::try_from(index + 1)
                .ok()
                .and_then(|n| n.checked_mul(step))
                .ok_or_else(|| {
                    CoreError::Conflict(format!(
                        "chapter {chapter_id} has too many items to reindex with step {step}"
                    ))
                })?;
            if target != item.sort_order {
                moves.push((item.id, target));
            }
        }

        for &(id, target) in &moves {
            sqlx::query(
                "UPDATE document_content \
                 SET sort_order = $2, updated_at = GREATEST(updated_at, $3) \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(target)
            .bind(to_epoch_millis(now))
            .execute(&mut *tx)
            .await?;
        }
        append_log(&mut tx, actor, operation_codes::REINDEX, modules::CHAPTER, chapter_id, now).await?;
        tx.commit().await?;

        tracing::info!(chapter_id, changed = moves.len(), "Contents reindexed");
        Ok(moves.into_iter().map(|(id, _)| id).collect())
    }

    /// Status of the chapter that contains content `id`.
    pub async fn parent_status(pool: &PgPool, id: DbId) -> Result<RecordStatus, DbError> {
        let status = sqlx::query_scalar::<_, i16>(
            "SELECT ch.status FROM document_content c \
             JOIN document_chapter ch ON ch.id = c.chapter_id \
             WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(CoreError::NotFound {
            entity: modules::CONTENT,
            id,
        })?;
        Ok(RecordStatus::from_id(status)?)
    }

    /// Every item of a chapter, enabled or not, locked and ordered by
    /// `(sort_order, id)`.
    async fn lock_siblings(
        conn: &mut PgConnection,
        chapter_id: DbId,
    ) -> Result<Vec<DocumentContent>, DbError> {
        let query = format!(
            "SELECT {COLUMNS} FROM document_content \
             WHERE chapter_id = $1 ORDER BY sort_order, id FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, DocumentContentRow>(&query)
            .bind(chapter_id)
            .fetch_all(&mut *conn)
            .await?;
        convert_all(rows)
    }
}
