//! Repository for the `document_category` table.

use sqlx::PgPool;

use docbase_core::audit::{modules, operation_codes, Actor};
use docbase_core::category::{CreateDocumentCategory, DocumentCategory, UpdateDocumentCategory};
use docbase_core::config::ModelConfig;
use docbase_core::error::CoreError;
use docbase_core::pagination::ListParams;
use docbase_core::record::RecordStatus;
use docbase_core::store::{DeletePolicy, DeleteReport};
use docbase_core::types::{to_epoch_millis, DbId};

use super::{append_log, apply_delete, convert_all, enabled_contents_of, lock_row, now, set_status};
use crate::error::DbError;
use crate::models::category::DocumentCategoryRow;

/// Column list for `document_category` queries.
const COLUMNS: &str = "id, name, description, sort_order, status, created_at, updated_at";

/// Provides CRUD operations for document categories.
pub struct DocumentCategoryRepo;

impl DocumentCategoryRepo {
    /// Insert a new category. Without an explicit `sort_order` it goes after
    /// the last existing category.
    pub async fn create(
        pool: &PgPool,
        config: &ModelConfig,
        input: &CreateDocumentCategory,
        actor: &Actor,
    ) -> Result<DocumentCategory, DbError> {
        config.validate()?;
        let now = now();
        let mut tx = pool.begin().await?;

        let default_sort = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(sort_order) + $1, $1) FROM document_category",
        )
        .bind(config.sort_order_step)
        .fetch_one(&mut *tx)
        .await?;
        let draft = DocumentCategory::create(0, input, default_sort, now)?;

        let query = format!(
            "INSERT INTO document_category \
                (name, description, sort_order, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentCategoryRow>(&query)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.sort_order)
            .bind(draft.record.status().id())
            .bind(to_epoch_millis(now))
            .fetch_one(&mut *tx)
            .await?;
        let category = DocumentCategory::try_from(row)?;
        append_log(&mut tx, actor, operation_codes::CREATE, modules::CATEGORY, category.id, now).await?;
        tx.commit().await?;

        tracing::info!(id = category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Find a category by id, whatever its status.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DocumentCategory>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM document_category WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentCategoryRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(DocumentCategory::try_from).transpose()?)
    }

    /// List categories ordered by `(sort_order, id)`.
    pub async fn list(
        pool: &PgPool,
        config: &ModelConfig,
        params: &ListParams,
    ) -> Result<Vec<DocumentCategory>, DbError> {
        let (limit, offset) = params.window(config);
        let query = format!(
            "SELECT {COLUMNS} FROM document_category \
             WHERE ($1 OR status = 1) \
             ORDER BY sort_order, id \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, DocumentCategoryRow>(&query)
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
        input: &UpdateDocumentCategory,
        actor: &Actor,
    ) -> Result<DocumentCategory, DbError> {
        let now = now();
        let mut tx = pool.begin().await?;
        let row: DocumentCategoryRow = lock_row(&mut tx, modules::CATEGORY, COLUMNS, id).await?;
        let mut category = DocumentCategory::try_from(row)?;
        category.apply(input, now)?;

        let query = format!(
            "UPDATE document_category \
             SET name = $2, description = $3, sort_order = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentCategoryRow>(&query)
            .bind(id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.sort_order)
            .bind(to_epoch_millis(category.record.updated_at()))
            .fetch_one(&mut *tx)
            .await?;
        append_log(&mut tx, actor, operation_codes::UPDATE, modules::CATEGORY, id, now).await?;
        tx.commit().await?;

        tracing::info!(id, "Category updated");
        Ok(DocumentCategory::try_from(row)?)
    }

    /// Plain status toggle; chapters are left as they are.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: RecordStatus,
        actor: &Actor,
    ) -> Result<DocumentCategory, DbError> {
        let row: DocumentCategoryRow =
            set_status(pool, modules::CATEGORY, COLUMNS, id, status, actor).await?;
        Ok(DocumentCategory::try_from(row)?)
    }

    /// Soft-delete a category under the given policy.
    pub async fn delete(
        pool: &PgPool,
        id: DbId,
        policy: DeletePolicy,
        actor: &Actor,
    ) -> Result<DeleteReport, DbError> {
        let now = now();
        let mut tx = pool.begin().await?;
        let _: DocumentCategoryRow = lock_row(&mut tx, modules::CATEGORY, COLUMNS, id).await?;

        let chapter_ids = sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM document_chapter WHERE category_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let enabled_chapters = sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM document_chapter \
             WHERE category_id = $1 AND status = 1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let report = DeleteReport {
            categories: vec![id],
            chapters: enabled_chapters,
            contents: enabled_contents_of(&mut tx, &chapter_ids).await?,
        };
        let active = report.chapters.len() + report.contents.len();
        if active > 0 && policy == DeletePolicy::Reject {
            tracing::warn!(id, active, "Category delete rejected: active children");
            return Err(CoreError::HasActiveChildren {
                entity: modules::CATEGORY,
                id,
                active_children: active,
            }
            .into());
        }

        apply_delete(&mut tx, &report, actor, now).await?;
        tx.commit().await?;

        tracing::info!(id, cascaded = active, "Category deleted");
        Ok(report)
    }
}
