//! Engagement transitions: vote, like, save.
//!
//! Each transition is a pure function from the current target to the next
//! one. They are generic over small facet traits so posts, questions,
//! answers, and comments all go through the same code path:
//!
//! | Facet | Trait | Implemented by |
//! |---|---|---|
//! | dual-direction vote | [`Votable`] | `VoteTally`, `Question`, `Answer` |
//! | like | [`Likeable`] | `LikeTally`, `Post`, `Comment` |
//! | bookmark | [`Saveable`] | `Post`, `Question`, `Answer` |
//!
//! A call changes exactly one facet. Nothing here performs I/O; syncing the
//! result with the backend is the caller's job (see [`crate::command`]).

use crate::model::{Answer, Comment, LikeTally, Post, Question, VoteDirection, VoteTally};

pub trait Votable {
    fn votes(&self) -> &VoteTally;
    fn votes_mut(&mut self) -> &mut VoteTally;
}

pub trait Likeable {
    fn likes(&self) -> &LikeTally;
    fn likes_mut(&mut self) -> &mut LikeTally;
}

pub trait Saveable {
    fn is_saved(&self) -> bool;
    fn set_saved(&mut self, saved: bool);
}

/// Apply a vote gesture in `direction`.
///
/// Same direction as the actor's current vote retracts it; the opposite
/// direction switches it; otherwise a new vote is cast.
#[must_use]
pub fn apply_vote<T: Votable + Clone>(target: &T, direction: VoteDirection) -> T {
    let mut next = target.clone();
    vote_in_place(&mut next, direction);
    next
}

/// Toggle the actor's like.
#[must_use]
pub fn apply_like<T: Likeable + Clone>(target: &T) -> T {
    let mut next = target.clone();
    like_in_place(&mut next);
    next
}

/// Toggle the actor's bookmark. Counters are never touched.
#[must_use]
pub fn apply_save<T: Saveable + Clone>(target: &T) -> T {
    let mut next = target.clone();
    save_in_place(&mut next);
    next
}

pub(crate) fn vote_in_place<T: Votable + ?Sized>(target: &mut T, direction: VoteDirection) {
    let before = *target.votes();
    let after = before.voted(direction);
    tracing::debug!(
        %direction,
        up = after.upvotes,
        down = after.downvotes,
        my_vote = ?after.my_vote,
        "vote applied"
    );
    *target.votes_mut() = after;
}

pub(crate) fn like_in_place<T: Likeable + ?Sized>(target: &mut T) {
    let after = target.likes().toggled();
    tracing::debug!(count = after.like_count, liked = after.is_liked, "like applied");
    *target.likes_mut() = after;
}

pub(crate) fn save_in_place<T: Saveable + ?Sized>(target: &mut T) {
    let saved = !target.is_saved();
    tracing::debug!(saved, "save applied");
    target.set_saved(saved);
}

impl Votable for VoteTally {
    fn votes(&self) -> &VoteTally {
        self
    }

    fn votes_mut(&mut self) -> &mut VoteTally {
        self
    }
}

impl Votable for Question {
    fn votes(&self) -> &VoteTally {
        &self.votes
    }

    fn votes_mut(&mut self) -> &mut VoteTally {
        &mut self.votes
    }
}

impl Votable for Answer {
    fn votes(&self) -> &VoteTally {
        &self.votes
    }

    fn votes_mut(&mut self) -> &mut VoteTally {
        &mut self.votes
    }
}

impl Likeable for LikeTally {
    fn likes(&self) -> &LikeTally {
        self
    }

    fn likes_mut(&mut self) -> &mut LikeTally {
        self
    }
}

impl Likeable for Post {
    fn likes(&self) -> &LikeTally {
        &self.likes
    }

    fn likes_mut(&mut self) -> &mut LikeTally {
        &mut self.likes
    }
}

impl Likeable for Comment {
    fn likes(&self) -> &LikeTally {
        &self.likes
    }

    fn likes_mut(&mut self) -> &mut LikeTally {
        &mut self.likes
    }
}

macro_rules! saveable {
    ($($ty:ty),+) => {
        $(
            impl Saveable for $ty {
                fn is_saved(&self) -> bool {
                    self.is_saved
                }

                fn set_saved(&mut self, saved: bool) {
                    self.is_saved = saved;
                }
            }
        )+
    };
}

saveable!(Post, Question, Answer, Comment);
