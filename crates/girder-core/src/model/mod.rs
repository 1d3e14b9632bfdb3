//! Content and engagement data model.
//!
//! Identifiers are opaque strings. Locally created content derives its id
//! from a BLAKE3 digest of the fields that make it unique, prefixed with a
//! kind tag (`p-`, `q-`, `a-`, `c-`).

pub mod content;
pub mod tally;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub use content::{Answer, Author, Comment, Post, Question};
pub use tally::{LikeTally, VoteDirection, VoteTally};

/// Number of hex characters kept from the digest when deriving an id.
const ID_HEX_LEN: usize = 12;

/// Opaque stable identifier, unique within its collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Derive an id for `kind` from the given parts.
    ///
    /// Parts are length-prefixed before hashing so `("ab", "c")` and
    /// `("a", "bc")` never collide.
    #[must_use]
    pub fn derive(kind: ContentKind, parts: &[&str]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(kind.as_str().as_bytes());
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        let hex = hasher.finalize().to_hex();
        Self(format!("{}-{}", kind.prefix(), &hex.as_str()[..ID_HEX_LEN]))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for ContentId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// The kinds of content that carry engagement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// News/article post: like-only.
    Post,
    /// Forum question: dual-direction votes.
    Question,
    /// Forum answer: dual-direction votes, accepted/helpful flags.
    Answer,
    /// Comment on a post or reply under an answer: like-only.
    Comment,
}

impl ContentKind {
    pub const ALL: [Self; 4] = [Self::Post, Self::Question, Self::Answer, Self::Comment];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Comment => "comment",
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Post => "p",
            Self::Question => "q",
            Self::Answer => "a",
            Self::Comment => "c",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for ContentKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "post" | "news" | "article" => Ok(Self::Post),
            "question" => Ok(Self::Question),
            "answer" => Ok(Self::Answer),
            "comment" | "reply" => Ok(Self::Comment),
            _ => Err(ParseEnumError {
                expected: "kind",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_prefixed_and_stable() {
        let a = ContentId::derive(ContentKind::Post, &["alice", "Crane safety"]);
        let b = ContentId::derive(ContentKind::Post, &["alice", "Crane safety"]);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("p-"));
        assert_eq!(a.as_str().len(), 2 + ID_HEX_LEN);
    }

    #[test]
    fn derived_ids_separate_parts() {
        let a = ContentId::derive(ContentKind::Comment, &["ab", "c"]);
        let b = ContentId::derive(ContentKind::Comment, &["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn kind_prefix_changes_id() {
        let q = ContentId::derive(ContentKind::Question, &["x"]);
        let a = ContentId::derive(ContentKind::Answer, &["x"]);
        assert_ne!(q, a);
        assert!(q.as_str().starts_with("q-"));
        assert!(a.as_str().starts_with("a-"));
    }

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("News".parse::<ContentKind>(), Ok(ContentKind::Post));
        assert_eq!(" reply ".parse::<ContentKind>(), Ok(ContentKind::Comment));
        assert!("job".parse::<ContentKind>().is_err());
    }

    #[test]
    fn content_id_serializes_as_plain_string() {
        let id = ContentId::new("q-1");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"q-1\""));
    }
}
