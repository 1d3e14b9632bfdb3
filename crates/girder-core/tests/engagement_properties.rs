use girder_core::answers::{Acceptance, acceptance, mark_accepted, toggle_helpful};
use girder_core::model::{Author, ContentId, VoteDirection, VoteTally};
use girder_core::thread::{DraftError, ThreadPolicy, append_comment};
use girder_core::{apply_like, apply_save, apply_vote};
use proptest::prelude::*;

#[path = "generators.rs"]
mod generators;
use generators::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn vote_flags_stay_mutually_exclusive(
        start in arb_vote_tally(),
        gestures in prop::collection::vec(arb_direction(), 0..64),
    ) {
        let mut t = start;
        for direction in gestures {
            t = apply_vote(&t, direction);
            prop_assert!(!(t.is_upvoted() && t.is_downvoted()));
        }
    }

    #[test]
    fn vote_counts_track_the_actor_contribution(
        start in arb_vote_tally(),
        gestures in prop::collection::vec(arb_direction(), 0..64),
    ) {
        // Counters are u32, so non-negativity is structural; what matters is
        // that they only ever move by the actor's own single vote.
        let base_up = start.upvotes - u32::from(start.is_upvoted());
        let base_down = start.downvotes - u32::from(start.is_downvoted());
        let mut t = start;
        for direction in gestures {
            t = apply_vote(&t, direction);
            prop_assert_eq!(t.upvotes, base_up + u32::from(t.is_upvoted()));
            prop_assert_eq!(t.downvotes, base_down + u32::from(t.is_downvoted()));
        }
    }

    #[test]
    fn toggling_twice_is_identity_from_neutral(
        up in 0u32..1_000,
        down in 0u32..1_000,
        direction in arb_direction(),
    ) {
        let t = VoteTally::new(up, down);
        prop_assert_eq!(apply_vote(&apply_vote(&t, direction), direction), t);
    }

    #[test]
    fn switching_moves_exactly_one_unit(up in 0u32..1_000, down in 1u32..1_000) {
        let t = VoteTally::new(up, down).with_vote(Some(VoteDirection::Down));
        let next = apply_vote(&t, VoteDirection::Up);
        prop_assert_eq!(next.upvotes, up + 1);
        prop_assert_eq!(next.downvotes, down - 1);
        prop_assert!(next.is_upvoted());
        prop_assert!(!next.is_downvoted());
    }

    #[test]
    fn like_count_stays_within_bounds(n in arb_like_count(), calls in 0usize..64) {
        let mut p = post(n);
        for _ in 0..calls {
            p = apply_like(&p);
        }
        let count = u64::from(p.likes.like_count);
        prop_assert!(count <= u64::from(n) + calls as u64);
        prop_assert!(count >= u64::from(n));
    }

    #[test]
    fn save_never_touches_counters(start in arb_vote_tally(), flips in 1usize..8) {
        let q = question(start);
        let mut next = q.clone();
        for _ in 0..flips {
            next = apply_save(&next);
        }
        prop_assert_eq!(next.votes, q.votes);
        prop_assert_eq!(next.is_saved, flips % 2 == 1);
    }

    #[test]
    fn at_most_one_answer_is_accepted(
        size in 1usize..8,
        picks in prop::collection::vec(0usize..8, 0..32),
    ) {
        let qid = ContentId::new("q-1");
        let mut set = answer_set(&qid, size);
        for pick in picks {
            let target = ContentId::new(format!("a-{}", pick % size));
            let before = acceptance(&set);
            set = mark_accepted(&set, &target).unwrap();
            let accepted = set.iter().filter(|a| a.is_accepted).count();
            prop_assert!(accepted <= 1);
            if before == Acceptance::Accepted(target.clone()) {
                prop_assert_eq!(acceptance(&set), Acceptance::NoneAccepted);
            } else {
                prop_assert_eq!(acceptance(&set), Acceptance::Accepted(target));
            }
        }
    }

    #[test]
    fn helpful_is_independent_of_acceptance(size in 1usize..6, pick in 0usize..6) {
        let qid = ContentId::new("q-1");
        let set = answer_set(&qid, size);
        let set = mark_accepted(&set, &set[pick % size].id.clone()).unwrap();
        let helped: Vec<_> = set.iter().map(toggle_helpful).collect();
        prop_assert!(helped.iter().all(|a| a.is_helpful));
        prop_assert_eq!(acceptance(&helped), acceptance(&set));
    }

    #[test]
    fn comment_append_is_monotonic(
        drafts in prop::collection::vec(prop_oneof![arb_body(), arb_blank()], 0..24),
    ) {
        let policy = ThreadPolicy::default();
        let author = Author::new("bob");
        let mut p = post(0);
        for (i, draft) in drafts.iter().enumerate() {
            let before_ids: Vec<ContentId> = p.comments.iter().map(|c| c.id.clone()).collect();
            match append_comment(&p, draft, &author, at(100 + i as i64), &policy) {
                Ok(next) => {
                    prop_assert_eq!(next.comment_count, p.comment_count + 1);
                    prop_assert_eq!(next.comments.len(), p.comments.len() + 1);
                    for id in &before_ids {
                        prop_assert!(next.comments.iter().any(|c| &c.id == id));
                    }
                    p = next;
                }
                Err(err) => {
                    prop_assert_eq!(err, DraftError::Empty);
                    prop_assert!(draft.trim().is_empty());
                }
            }
            prop_assert_eq!(p.comments.len(), p.comment_count as usize);
        }
    }
}

#[test]
fn scenario_a_upvote_and_retract() {
    let t = VoteTally::new(5, 1);
    let once = apply_vote(&t, VoteDirection::Up);
    assert_eq!(once, VoteTally::new(6, 1).with_vote(Some(VoteDirection::Up)));
    let twice = apply_vote(&once, VoteDirection::Up);
    assert_eq!(twice, VoteTally::new(5, 1));
}

#[test]
fn scenario_b_downvote_then_switch() {
    let t = VoteTally::new(2, 0);
    let down = apply_vote(&t, VoteDirection::Down);
    assert_eq!(down, VoteTally::new(2, 1).with_vote(Some(VoteDirection::Down)));
    let up = apply_vote(&down, VoteDirection::Up);
    assert_eq!(up, VoteTally::new(3, 0).with_vote(Some(VoteDirection::Up)));
}

#[test]
fn scenario_c_append_then_reject_blank() {
    let policy = ThreadPolicy::default();
    let author = Author::new("bob");
    let p = post(0);
    let p = append_comment(&p, "hello", &author, at(5), &policy).unwrap();
    assert_eq!((p.comments.len(), p.comment_count), (1, 1));
    assert_eq!(
        append_comment(&p, "", &author, at(6), &policy).unwrap_err(),
        DraftError::Empty
    );
    assert_eq!((p.comments.len(), p.comment_count), (1, 1));
}
