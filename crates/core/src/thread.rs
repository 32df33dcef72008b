//! Reply-tree materialization for the comments of one content item.
//!
//! [`CommentThread`] indexes a flat slice of comments by parent id once and
//! then hands out lazy views: nodes materialize their replies only when
//! asked, and every traversal can be restarted from [`CommentThread::roots`]
//! or [`CommentThread::walk`].
//!
//! Disabled comments are not dropped from the tree while they still have
//! visible replies; they are rendered as [`ThreadEntry::Removed`]
//! placeholders instead. Disabled leaves (and disabled subtrees with no
//! enabled comment) are omitted.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::comment::Comment;
use crate::types::{DbId, Timestamp, TOP_LEVEL_PARENT};

/// What a thread position renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThreadEntry<'a> {
    Visible(&'a Comment),
    /// A disabled comment kept only to anchor its visible replies.
    Removed {
        id: DbId,
        parent_id: DbId,
        created_at: Timestamp,
    },
}

impl<'a> ThreadEntry<'a> {
    fn of(comment: &'a Comment) -> Self {
        if comment.record.is_enabled() {
            ThreadEntry::Visible(comment)
        } else {
            ThreadEntry::Removed {
                id: comment.id,
                parent_id: comment.parent_id,
                created_at: comment.record.created_at(),
            }
        }
    }

    pub fn id(&self) -> DbId {
        match self {
            ThreadEntry::Visible(c) => c.id,
            ThreadEntry::Removed { id, .. } => *id,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, ThreadEntry::Removed { .. })
    }
}

/// Indexed reply tree for a single content item.
#[derive(Debug)]
pub struct CommentThread<'a> {
    content_id: DbId,
    /// Sibling groups keyed by parent id, each sorted by `(created_at, id)`.
    /// Roots live under [`TOP_LEVEL_PARENT`].
    children: HashMap<DbId, Vec<&'a Comment>>,
    visible: HashSet<DbId>,
}

impl<'a> CommentThread<'a> {
    /// Index the comments that belong to `content_id`; others are ignored.
    ///
    /// A reply whose parent is not among the given comments is placed at the
    /// top level so partially loaded data still renders.
    pub fn build<I>(content_id: DbId, comments: I) -> Self
    where
        I: IntoIterator<Item = &'a Comment>,
    {
        let own: Vec<&'a Comment> = comments
            .into_iter()
            .filter(|c| c.content_id == content_id)
            .collect();
        let known: HashSet<DbId> = own.iter().map(|c| c.id).collect();

        let mut children: HashMap<DbId, Vec<&'a Comment>> = HashMap::new();
        for comment in own {
            let key = if comment.is_top_level() || !known.contains(&comment.parent_id) {
                TOP_LEVEL_PARENT
            } else {
                comment.parent_id
            };
            children.entry(key).or_default().push(comment);
        }
        for group in children.values_mut() {
            group.sort_by_key(|c| (c.record.created_at(), c.id));
        }

        let visible = compute_visible(&children);
        Self {
            content_id,
            children,
            visible,
        }
    }

    pub fn content_id(&self) -> DbId {
        self.content_id
    }

    /// Top-level nodes, in creation order.
    pub fn roots(&self) -> Nodes<'_, 'a> {
        self.nodes_under(TOP_LEVEL_PARENT)
    }

    /// Depth-first pre-order traversal yielding `(depth, entry)`; roots are
    /// at depth 0.
    pub fn walk(&self) -> Walk<'_, 'a> {
        Walk {
            thread: self,
            stack: vec![(0, self.group(TOP_LEVEL_PARENT).iter())],
        }
    }

    /// Number of rendered entries, placeholders included.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Whether the comment with `id` renders (as itself or a placeholder).
    pub fn contains(&self, id: DbId) -> bool {
        self.visible.contains(&id)
    }

    fn group(&self, parent_id: DbId) -> &[&'a Comment] {
        self.children
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn nodes_under(&self, parent_id: DbId) -> Nodes<'_, 'a> {
        Nodes {
            thread: self,
            inner: self.group(parent_id).iter(),
        }
    }
}

/// Mark every comment that is enabled or has an enabled descendant.
fn compute_visible(children: &HashMap<DbId, Vec<&Comment>>) -> HashSet<DbId> {
    // Pre-order from the roots. Each comment sits in exactly one sibling
    // group, so nothing is visited twice.
    let mut order: Vec<&Comment> = Vec::new();
    let mut stack: Vec<&Comment> = children
        .get(&TOP_LEVEL_PARENT)
        .map(|g| g.iter().copied().collect())
        .unwrap_or_default();
    while let Some(comment) = stack.pop() {
        order.push(comment);
        if let Some(group) = children.get(&comment.id) {
            stack.extend(group.iter().copied());
        }
    }

    // Reverse pre-order sees every child before its parent.
    let mut visible = HashSet::new();
    for comment in order.into_iter().rev() {
        let has_visible_reply = children
            .get(&comment.id)
            .is_some_and(|g| g.iter().any(|c| visible.contains(&c.id)));
        if comment.record.is_enabled() || has_visible_reply {
            visible.insert(comment.id);
        }
    }
    visible
}

/// A position in the thread.
#[derive(Debug, Clone, Copy)]
pub struct ThreadNode<'t, 'a> {
    thread: &'t CommentThread<'a>,
    comment: &'a Comment,
}

impl<'t, 'a> ThreadNode<'t, 'a> {
    pub fn id(&self) -> DbId {
        self.comment.id
    }

    pub fn entry(&self) -> ThreadEntry<'a> {
        ThreadEntry::of(self.comment)
    }

    /// Direct replies, materialized on demand.
    pub fn replies(&self) -> Nodes<'t, 'a> {
        self.thread.nodes_under(self.comment.id)
    }
}

/// Iterator over one sibling group, skipping hidden comments.
#[derive(Debug, Clone)]
pub struct Nodes<'t, 'a> {
    thread: &'t CommentThread<'a>,
    inner: std::slice::Iter<'t, &'a Comment>,
}

impl<'t, 'a> Iterator for Nodes<'t, 'a> {
    type Item = ThreadNode<'t, 'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let thread = self.thread;
        self.inner
            .by_ref()
            .find(|c| thread.visible.contains(&c.id))
            .map(|c| ThreadNode { thread, comment: *c })
    }
}

/// Depth-first traversal of the rendered thread.
#[derive(Debug)]
pub struct Walk<'t, 'a> {
    thread: &'t CommentThread<'a>,
    stack: Vec<(usize, std::slice::Iter<'t, &'a Comment>)>,
}

impl<'t, 'a> Iterator for Walk<'t, 'a> {
    type Item = (usize, ThreadEntry<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (depth, siblings) = self.stack.last_mut()?;
            let depth = *depth;
            match siblings.next() {
                Some(comment) if self.thread.visible.contains(&comment.id) => {
                    let replies = self.thread.group(comment.id).iter();
                    self.stack.push((depth + 1, replies));
                    return Some((depth, ThreadEntry::of(*comment)));
                }
                Some(_) => continue,
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
