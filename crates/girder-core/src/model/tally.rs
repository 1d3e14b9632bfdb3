use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// Requested vote direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "up" | "upvote" | "+" => Ok(Self::Up),
            "down" | "downvote" | "-" => Ok(Self::Down),
            _ => Err(ParseEnumError {
                expected: "direction",
                got: s.to_string(),
            }),
        }
    }
}

/// Dual-direction vote facet (questions, answers).
///
/// `my_vote` is the current actor's vote only. Holding it as a single
/// `Option` makes "both up and down" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvotes: u32,
    pub downvotes: u32,
    #[serde(default)]
    pub my_vote: Option<VoteDirection>,
}

impl VoteTally {
    /// Server baseline with no vote from the current actor.
    #[must_use]
    pub const fn new(upvotes: u32, downvotes: u32) -> Self {
        Self {
            upvotes,
            downvotes,
            my_vote: None,
        }
    }

    /// Server baseline including the actor's prior vote.
    #[must_use]
    pub const fn with_vote(mut self, vote: Option<VoteDirection>) -> Self {
        self.my_vote = vote;
        self
    }

    #[must_use]
    pub fn is_upvoted(&self) -> bool {
        self.my_vote == Some(VoteDirection::Up)
    }

    #[must_use]
    pub fn is_downvoted(&self) -> bool {
        self.my_vote == Some(VoteDirection::Down)
    }

    /// Displayed score; negative when downvotes dominate.
    #[must_use]
    pub fn net_score(&self) -> i64 {
        i64::from(self.upvotes) - i64::from(self.downvotes)
    }

    /// Apply one vote gesture.
    ///
    /// Repeating the actor's current direction retracts it. Voting the other
    /// way moves the actor's unit from one counter to the other.
    #[must_use]
    pub fn voted(self, direction: VoteDirection) -> Self {
        let mut next = self;
        if self.my_vote == Some(direction) {
            *next.counter_mut(direction) = decrement(self.counter(direction), direction.as_str());
            next.my_vote = None;
            return next;
        }

        *next.counter_mut(direction) = self.counter(direction).saturating_add(1);
        let other = direction.opposite();
        if self.my_vote == Some(other) {
            *next.counter_mut(other) = decrement(self.counter(other), other.as_str());
        }
        next.my_vote = Some(direction);
        next
    }

    const fn counter(&self, direction: VoteDirection) -> u32 {
        match direction {
            VoteDirection::Up => self.upvotes,
            VoteDirection::Down => self.downvotes,
        }
    }

    const fn counter_mut(&mut self, direction: VoteDirection) -> &mut u32 {
        match direction {
            VoteDirection::Up => &mut self.upvotes,
            VoteDirection::Down => &mut self.downvotes,
        }
    }
}

/// Like-only facet (news posts, comments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LikeTally {
    pub like_count: u32,
    #[serde(default)]
    pub is_liked: bool,
}

impl LikeTally {
    #[must_use]
    pub const fn new(like_count: u32) -> Self {
        Self {
            like_count,
            is_liked: false,
        }
    }

    /// Toggle the actor's like and move the counter with it.
    #[must_use]
    pub fn toggled(self) -> Self {
        if self.is_liked {
            Self {
                like_count: decrement(self.like_count, "like"),
                is_liked: false,
            }
        } else {
            Self {
                like_count: self.like_count.saturating_add(1),
                is_liked: true,
            }
        }
    }
}

/// Decrement that never underflows.
///
/// A zero counter with the actor's flag set means the server baseline was
/// inconsistent; the count stays at zero.
fn decrement(value: u32, counter: &str) -> u32 {
    if value == 0 {
        tracing::warn!(counter, "actor flag set on a zero counter; clamping at 0");
    }
    value.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upvote_then_retract() {
        let t = VoteTally::new(5, 1);
        let up = t.voted(VoteDirection::Up);
        assert_eq!(up, VoteTally::new(6, 1).with_vote(Some(VoteDirection::Up)));
        assert_eq!(up.voted(VoteDirection::Up), t);
    }

    #[test]
    fn switching_moves_one_unit() {
        let t = VoteTally::new(2, 0).voted(VoteDirection::Down);
        assert_eq!((t.upvotes, t.downvotes), (2, 1));
        assert!(t.is_downvoted());

        let t = t.voted(VoteDirection::Up);
        assert_eq!((t.upvotes, t.downvotes), (3, 0));
        assert!(t.is_upvoted());
        assert!(!t.is_downvoted());
    }

    #[test]
    fn net_score_can_go_negative() {
        let t = VoteTally::new(1, 4);
        assert_eq!(t.net_score(), -3);
    }

    #[test]
    fn inconsistent_baseline_clamps_at_zero() {
        let t = VoteTally::new(0, 0).with_vote(Some(VoteDirection::Up));
        let t = t.voted(VoteDirection::Up);
        assert_eq!(t, VoteTally::new(0, 0));

        let l = LikeTally {
            like_count: 0,
            is_liked: true,
        };
        assert_eq!(l.toggled(), LikeTally::new(0));
    }

    #[test]
    fn like_toggle_round_trips() {
        let l = LikeTally::new(7);
        let liked = l.toggled();
        assert_eq!(liked.like_count, 8);
        assert!(liked.is_liked);
        assert_eq!(liked.toggled(), l);
    }

    #[test]
    fn direction_parses_common_spellings() {
        assert_eq!("UP".parse::<VoteDirection>(), Ok(VoteDirection::Up));
        assert_eq!("downvote".parse::<VoteDirection>(), Ok(VoteDirection::Down));
        assert!("sideways".parse::<VoteDirection>().is_err());
    }

    #[test]
    fn tally_json_uses_snake_case_fields() {
        let t = VoteTally::new(3, 1).with_vote(Some(VoteDirection::Down));
        let json = serde_json::to_value(t).expect("serialize");
        assert_eq!(json["upvotes"], 3);
        assert_eq!(json["downvotes"], 1);
        assert_eq!(json["my_vote"], "down");
    }
}
