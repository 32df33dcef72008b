//! Comment operations and thread listing.

use crate::audit::{modules, operation_codes, Actor};
use crate::comment::{reply_depth, validate_parent, Comment, CreateComment, UpdateComment};
use crate::error::CoreError;
use crate::pagination::{paginate, ListParams};
use crate::record::RecordStatus;
use crate::thread::CommentThread;
use crate::types::DbId;

use super::{existing, ModelStore, WithParent};

impl ModelStore {
    /// Attach a comment to a content item, optionally as a reply.
    ///
    /// The content item must exist. A reply's parent must exist, be enabled,
    /// and sit on the same content item.
    pub fn create_comment(
        &mut self,
        input: &CreateComment,
        actor: &Actor,
    ) -> Result<WithParent<Comment>, CoreError> {
        let parent_status = self
            .contents
            .get(&input.content_id)
            .map(|c| c.record.status())
            .ok_or(CoreError::ReferenceNotFound {
                entity: modules::CONTENT,
                id: input.content_id,
            })?;
        validate_parent(
            input.content_id,
            input.parent(),
            self.comments.get(&input.parent()),
        )?;

        let now = self.now();
        let id = self.seq.comment;
        let comment = Comment::create(id, input, now)?;
        let log = self.pending_log(actor, operation_codes::CREATE, modules::COMMENT, id, now)?;

        self.seq.comment += 1;
        self.comments.insert(id, comment.clone());
        self.commit_log(log);
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

    pub fn comment(&self, id: DbId) -> Option<&Comment> {
        self.comments.get(&id)
    }

    /// Flat list of a content item's comments in creation order.
    pub fn list_comments(&self, content_id: DbId, params: &ListParams) -> Vec<&Comment> {
        let mut rows: Vec<&Comment> = self
            .comments
            .values()
            .filter(|c| c.content_id == content_id)
            .filter(|c| params.include_disabled || c.record.is_enabled())
            .collect();
        rows.sort_by_key(|c| (c.record.created_at(), c.id));
        let (limit, offset) = params.window(&self.config);
        paginate(rows, limit, offset)
    }

    /// The full reply tree of a content item.
    pub fn comment_thread(&self, content_id: DbId) -> CommentThread<'_> {
        CommentThread::build(content_id, self.comments.values())
    }

    pub fn update_comment(
        &mut self,
        id: DbId,
        input: &UpdateComment,
        actor: &Actor,
    ) -> Result<Comment, CoreError> {
        let now = self.now();
        let mut updated = existing(&self.comments, id)?.clone();
        updated.apply(input, now)?;
        let log = self.pending_log(actor, operation_codes::UPDATE, modules::COMMENT, id, now)?;

        self.comments.insert(id, updated.clone());
        self.commit_log(log);
        tracing::info!(id, "Comment updated");
        Ok(updated)
    }

    /// Moderate a comment. Replies keep their own status.
    pub fn set_comment_status(
        &mut self,
        id: DbId,
        status: RecordStatus,
        actor: &Actor,
    ) -> Result<Comment, CoreError> {
        self.set_status_in::<Comment>(|s| &mut s.comments, id, status, actor)
    }

    /// Number of replies between comment `id` and its thread root.
    pub fn comment_depth(&self, id: DbId) -> Result<usize, CoreError> {
        let start = existing(&self.comments, id)?;
        reply_depth(start, self.comments.len(), |parent| self.comments.get(&parent))
    }
}
