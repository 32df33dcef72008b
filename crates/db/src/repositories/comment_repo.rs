//! Repository for the `comment` table.

use std::collections::HashMap;

use sqlx::PgPool;

use docbase_core::audit::{modules, operation_codes, Actor};
use docbase_core::comment::{reply_depth, validate_parent, Comment, CreateComment, UpdateComment};
use docbase_core::config::ModelConfig;
use docbase_core::error::CoreError;
use docbase_core::pagination::ListParams;
use docbase_core::record::RecordStatus;
use docbase_core::store::WithParent;
use docbase_core::types::{to_epoch_millis, DbId, TOP_LEVEL_PARENT};

use super::{append_log, convert_all, lock_row, now, parent_status, set_status};
use crate::error::DbError;
use crate::models::comment::CommentRow;

/// Column list for `comment` queries.
const COLUMNS: &str = "id, content_id, user_id, content, parent_id, status, created_at, updated_at";

/// Provides CRUD operations for comments. Use
/// [`docbase_core::thread::CommentThread::build`] on the result of
/// [`CommentRepo::list_for_thread`] to get the reply tree.
pub struct CommentRepo;

impl CommentRepo {
    /// Attach a comment to a content item, optionally as a reply.
    ///
    /// The content item must exist. A reply's parent must exist, be enabled,
    /// and sit on the same content item.
    pub async fn create(
        pool: &PgPool,
        input: &CreateComment,
        actor: &Actor,
    ) -> Result<WithParent<Comment>, DbError> {
        let now = now();
        let mut tx = pool.begin().await?;
        let parent_status = parent_status(&mut tx, modules::CONTENT, input.content_id).await?;

        let parent = if input.parent() == TOP_LEVEL_PARENT {
            None
        } else {
            let query = format!("SELECT {COLUMNS} FROM comment WHERE id = $1 FOR SHARE");
            sqlx::query_as::<_, CommentRow>(&query)
                .bind(input.parent())
                .fetch_optional(&mut *tx)
                .await?
                .map(Comment::try_from)
                .transpose()?
        };
        validate_parent(input.content_id, input.parent(), parent.as_ref())?;

        // Reserve the id first so the draft is checked against its real id.
        let id = sqlx::query_scalar::<_, DbId>("SELECT nextval(pg_get_serial_sequence('comment', 'id'))")
            .fetch_one(&mut *tx)
            .await?;
        let draft = Comment::create(id, input, now)?;

        let query = format!(
            "INSERT INTO comment \
                (id, content_id, user_id, content, parent_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&query)
            .bind(draft.id)
            .bind(draft.content_id)
            .bind(draft.user_id)
            .bind(&draft.body)
            .bind(draft.parent_id)
            .bind(draft.record.status().id())
            .bind(to_epoch_millis(now))
            .fetch_one(&mut *tx)
            .await?;
        let comment = Comment::try_from(row)?;
        append_log(&mut tx, actor, operation_codes::CREATE, modules::COMMENT, id, now).await?;
        tx.commit().await?;

        tracing::info!(
            id,
            content_id = comment.content_id,
            parent_id = comment.parent_id,
            "Comment created"
        );
        Ok(WithParent {
            entity: comment,
            parent_status,
        })
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Comment>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM comment WHERE id = $1");
        let row = sqlx::query_as::<_, CommentRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Comment::try_from).transpose()?)
    }

    /// Flat list of a content item's comments in creation order.
    pub async fn list_by_content(
        pool: &PgPool,
        config: &ModelConfig,
        content_id: DbId,
        params: &ListParams,
    ) -> Result<Vec<Comment>, DbError> {
        let (limit, offset) = params.window(config);
        let query = format!(
            "SELECT {COLUMNS} FROM comment \
             WHERE content_id = $1 AND ($2 OR status = 1) \
             ORDER BY created_at, id \
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&query)
            .bind(content_id)
            .bind(params.include_disabled)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;
        convert_all(rows)
    }

    /// Every comment of a content item regardless of status, unpaginated.
    /// Disabled comments are needed to keep their visible replies attached.
    pub async fn list_for_thread(pool: &PgPool, content_id: DbId) -> Result<Vec<Comment>, DbError> {
        let query = format!(
            "SELECT {COLUMNS} FROM comment WHERE content_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&query)
            .bind(content_id)
            .fetch_all(pool)
            .await?;
        convert_all(rows)
    }

    /// Edit a comment body. The parent link cannot change.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateComment,
        actor: &Actor,
    ) -> Result<Comment, DbError> {
        let now = now();
        let mut tx = pool.begin().await?;
        let row: CommentRow = lock_row(&mut tx, modules::COMMENT, COLUMNS, id).await?;
        let mut comment = Comment::try_from(row)?;
        comment.apply(input, now)?;

        let query = format!(
            "UPDATE comment SET content = $2, updated_at = $3 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&query)
            .bind(id)
            .bind(&comment.body)
            .bind(to_epoch_millis(comment.record.updated_at()))
            .fetch_one(&mut *tx)
            .await?;
        append_log(&mut tx, actor, operation_codes::UPDATE, modules::COMMENT, id, now).await?;
        tx.commit().await?;

        tracing::info!(id, "Comment updated");
        Ok(Comment::try_from(row)?)
    }

    /// Moderate a comment. Replies keep their own status.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: RecordStatus,
        actor: &Actor,
    ) -> Result<Comment, DbError> {
        let row: CommentRow = set_status(pool, modules::COMMENT, COLUMNS, id, status, actor).await?;
        Ok(Comment::try_from(row)?)
    }

    /// Number of replies between comment `id` and its thread root.
    pub async fn depth(pool: &PgPool, id: DbId) -> Result<usize, DbError> {
        let start = Self::find_by_id(pool, id).await?.ok_or(CoreError::NotFound {
            entity: modules::COMMENT,
            id,
        })?;
        let siblings = Self::list_for_thread(pool, start.content_id).await?;
        let by_id: HashMap<DbId, &Comment> = siblings.iter().map(|c| (c.id, c)).collect();
        Ok(reply_depth(&start, by_id.len(), |parent| by_id.get(&parent).copied())?)
    }
}
