//! Single-level comment threads.
//!
//! Posts keep top-level comments newest-first; answers keep replies in the
//! order they were written. Both orderings are carried by [`ThreadOrder`] and
//! chosen per parent kind through [`ThreadPolicy`].
//!
//! Appending never deduplicates: submitting the same text twice yields two
//! comments with distinct ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Coded, ErrorCode};
use crate::model::{Answer, Author, Comment, ContentId, ContentKind, LikeTally, Post};

pub const DEFAULT_MAX_BODY_CHARS: usize = 8_192;

/// Where a new comment lands in its parent's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreadOrder {
    /// Insert at the front (top-level comments on posts).
    NewestFirst,
    /// Push to the back (replies under answers).
    Append,
}

/// Limits and orderings applied when appending comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPolicy {
    pub max_body_chars: usize,
    pub post_order: ThreadOrder,
    pub reply_order: ThreadOrder,
}

impl Default for ThreadPolicy {
    fn default() -> Self {
        Self {
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
            post_order: ThreadOrder::NewestFirst,
            reply_order: ThreadOrder::Append,
        }
    }
}

impl ThreadPolicy {
    #[must_use]
    pub const fn order_for(&self, kind: ContentKind) -> ThreadOrder {
        match kind {
            ContentKind::Answer => self.reply_order,
            ContentKind::Post | ContentKind::Question | ContentKind::Comment => self.post_order,
        }
    }
}

/// Reasons a draft is rejected. Rejection never changes the parent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("comment body must not be empty")]
    Empty,

    #[error("comment body must be <= {max} characters (got {got})")]
    TooLong { max: usize, got: usize },

    #[error("comment body must not contain control characters")]
    ControlCharacter,
}

impl Coded for DraftError {
    fn code(&self) -> ErrorCode {
        ErrorCode::InvalidDraft
    }
}

/// Content that owns a comment thread and its counter.
pub trait Threaded {
    const KIND: ContentKind;

    fn thread_id(&self) -> &ContentId;
    fn thread(&self) -> &[Comment];
    fn thread_mut(&mut self) -> &mut Vec<Comment>;
    fn comment_count(&self) -> u32;
    fn comment_count_mut(&mut self) -> &mut u32;
}

impl Threaded for Post {
    const KIND: ContentKind = ContentKind::Post;

    fn thread_id(&self) -> &ContentId {
        &self.id
    }

    fn thread(&self) -> &[Comment] {
        &self.comments
    }

    fn thread_mut(&mut self) -> &mut Vec<Comment> {
        &mut self.comments
    }

    fn comment_count(&self) -> u32 {
        self.comment_count
    }

    fn comment_count_mut(&mut self) -> &mut u32 {
        &mut self.comment_count
    }
}

impl Threaded for Answer {
    const KIND: ContentKind = ContentKind::Answer;

    fn thread_id(&self) -> &ContentId {
        &self.id
    }

    fn thread(&self) -> &[Comment] {
        &self.replies
    }

    fn thread_mut(&mut self) -> &mut Vec<Comment> {
        &mut self.replies
    }

    fn comment_count(&self) -> u32 {
        self.reply_count
    }

    fn comment_count_mut(&mut self) -> &mut u32 {
        &mut self.reply_count
    }
}

/// Check a draft body and return it trimmed.
///
/// # Errors
///
/// [`DraftError`] when the trimmed body is empty, longer than
/// `max_body_chars`, or contains control characters other than newline/tab.
pub fn validate_body(raw: &str, max_body_chars: usize) -> Result<&str, DraftError> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(DraftError::Empty);
    }

    let got = body.chars().count();
    if got > max_body_chars {
        return Err(DraftError::TooLong {
            max: max_body_chars,
            got,
        });
    }

    if body
        .chars()
        .any(|ch| ch.is_control() && ch != '\n' && ch != '\t')
    {
        return Err(DraftError::ControlCharacter);
    }

    Ok(body)
}

/// Build the comment record a draft would produce on `parent`.
///
/// The id mixes in the parent's current counter so identical resubmissions
/// get distinct ids.
///
/// # Errors
///
/// Propagates [`validate_body`] failures.
pub fn prepare_comment<T: Threaded + ?Sized>(
    parent: &T,
    draft: &str,
    author: &Author,
    now: DateTime<Utc>,
    policy: &ThreadPolicy,
) -> Result<Comment, DraftError> {
    let position = parent.comment_count().to_string();
    build_comment(parent.thread_id(), draft, author, now, &position, policy)
}

/// Validate `draft` and build a comment whose id mixes in `salt`.
pub(crate) fn build_comment(
    parent: &ContentId,
    draft: &str,
    author: &Author,
    now: DateTime<Utc>,
    salt: &str,
    policy: &ThreadPolicy,
) -> Result<Comment, DraftError> {
    let body = validate_body(draft, policy.max_body_chars)?;
    let id = ContentId::derive(
        ContentKind::Comment,
        &[parent.as_str(), &author.actor, &now.to_rfc3339(), salt],
    );
    Ok(Comment {
        id,
        author: author.clone(),
        body: body.to_string(),
        created_at: now,
        likes: LikeTally::default(),
        is_saved: false,
    })
}

/// Insert an already-built comment and bump the parent's counter by one.
pub fn insert_comment<T: Threaded + ?Sized>(parent: &mut T, comment: Comment, order: ThreadOrder) {
    tracing::debug!(parent = %parent.thread_id(), comment = %comment.id, ?order, "comment appended");
    match order {
        ThreadOrder::NewestFirst => parent.thread_mut().insert(0, comment),
        ThreadOrder::Append => parent.thread_mut().push(comment),
    }
    let count = parent.comment_count_mut();
    *count = count.saturating_add(1);
}

/// Append a newly authored comment to `parent`.
///
/// # Errors
///
/// Returns [`DraftError`] and leaves `parent` untouched when the draft is
/// rejected.
pub fn append_comment<T: Threaded + Clone>(
    parent: &T,
    draft: &str,
    author: &Author,
    now: DateTime<Utc>,
    policy: &ThreadPolicy,
) -> Result<T, DraftError> {
    let comment = prepare_comment(parent, draft, author, now, policy)?;
    let mut next = parent.clone();
    insert_comment(&mut next, comment, policy.order_for(T::KIND));
    Ok(next)
}

/// Locate a comment in a thread by id.
pub fn find_comment_mut<'a>(thread: &'a mut [Comment], id: &ContentId) -> Option<&'a mut Comment> {
    thread.iter_mut().find(|c| &c.id == id)
}
