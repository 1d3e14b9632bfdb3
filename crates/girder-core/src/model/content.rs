use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentId, ContentKind, LikeTally, VoteTally};

/// Reference to the actor who authored a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    pub actor: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Author {
    #[must_use]
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name to show next to the content.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.actor)
    }
}

/// A comment on a post, or a reply under an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: ContentId,
    pub author: Author,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: LikeTally,
    #[serde(default)]
    pub is_saved: bool,
}

/// News/article post. Like-only engagement, newest-first comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: ContentId,
    pub author: Author,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: LikeTally,
    #[serde(default)]
    pub is_saved: bool,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub comment_count: u32,
}

impl Post {
    /// A freshly authored post with zeroed engagement.
    #[must_use]
    pub fn draft(
        author: Author,
        title: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        let id = ContentId::derive(
            ContentKind::Post,
            &[&author.actor, &title, &now.to_rfc3339()],
        );
        Self {
            id,
            author,
            title,
            body: body.into(),
            created_at: now,
            likes: LikeTally::default(),
            is_saved: false,
            comments: Vec::new(),
            comment_count: 0,
        }
    }
}

/// Forum question. Dual-direction votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: ContentId,
    pub author: Author,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: VoteTally,
    #[serde(default)]
    pub is_saved: bool,
    /// Answers in the order they were posted.
    #[serde(default)]
    pub answer_ids: Vec<ContentId>,
}

impl Question {
    #[must_use]
    pub fn draft(
        author: Author,
        title: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        let id = ContentId::derive(
            ContentKind::Question,
            &[&author.actor, &title, &now.to_rfc3339()],
        );
        Self {
            id,
            author,
            title,
            body: body.into(),
            created_at: now,
            votes: VoteTally::default(),
            is_saved: false,
            answer_ids: Vec::new(),
        }
    }
}

/// Forum answer. Votes like a question, plus accepted/helpful flags and a
/// reply thread kept in append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: ContentId,
    pub question_id: ContentId,
    pub author: Author,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: VoteTally,
    #[serde(default)]
    pub is_saved: bool,
    #[serde(default)]
    pub is_accepted: bool,
    #[serde(default)]
    pub is_helpful: bool,
    #[serde(default)]
    pub replies: Vec<Comment>,
    #[serde(default)]
    pub reply_count: u32,
}

impl Answer {
    #[must_use]
    pub fn draft(
        question_id: ContentId,
        author: Author,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let body = body.into();
        let id = ContentId::derive(
            ContentKind::Answer,
            &[question_id.as_str(), &author.actor, &body, &now.to_rfc3339()],
        );
        Self {
            id,
            question_id,
            author,
            body,
            created_at: now,
            votes: VoteTally::default(),
            is_saved: false,
            is_accepted: false,
            is_helpful: false,
            replies: Vec::new(),
            reply_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    #[test]
    fn drafts_start_at_zero_engagement() {
        let post = Post::draft(Author::new("alice"), "Rebar prices", "Up 4%", at(1));
        assert_eq!(post.likes, LikeTally::default());
        assert!(!post.is_saved);
        assert_eq!(post.comment_count, 0);

        let q = Question::draft(Author::new("bob"), "Slab cure time?", "", at(2));
        assert_eq!(q.votes, VoteTally::default());
        assert!(q.answer_ids.is_empty());

        let a = Answer::draft(q.id.clone(), Author::new("cy"), "7 days", at(3));
        assert_eq!(a.question_id, q.id);
        assert!(!a.is_accepted);
        assert!(!a.is_helpful);
    }

    #[test]
    fn missing_engagement_fields_default_on_load() {
        let raw = r#"{
            "id": "p-1",
            "author": {"actor": "alice"},
            "title": "t",
            "body": "b",
            "created_at": "2024-05-01T00:00:00Z"
        }"#;
        let post: Post = serde_json::from_str(raw).expect("parse post");
        assert_eq!(post.likes.like_count, 0);
        assert!(!post.likes.is_liked);
        assert!(post.comments.is_empty());
    }

    #[test]
    fn author_label_prefers_display_name() {
        assert_eq!(Author::new("u1").label(), "u1");
        assert_eq!(Author::new("u1").with_display_name("Dana").label(), "Dana");
    }
}
