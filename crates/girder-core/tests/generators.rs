#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use girder_core::model::{
    Answer, Author, ContentId, LikeTally, Post, Question, VoteDirection, VoteTally,
};
use proptest::prelude::*;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn arb_direction() -> impl Strategy<Value = VoteDirection> + Clone {
    prop_oneof![Just(VoteDirection::Up), Just(VoteDirection::Down)]
}

/// A baseline the server could report: the actor's own vote is always
/// reflected in the matching counter.
pub fn arb_vote_tally() -> impl Strategy<Value = VoteTally> + Clone {
    (
        0u32..1_000,
        0u32..1_000,
        prop_oneof![
            Just(None),
            Just(Some(VoteDirection::Up)),
            Just(Some(VoteDirection::Down)),
        ],
    )
        .prop_map(|(up, down, my_vote)| {
            let up = if my_vote == Some(VoteDirection::Up) { up.max(1) } else { up };
            let down = if my_vote == Some(VoteDirection::Down) { down.max(1) } else { down };
            VoteTally::new(up, down).with_vote(my_vote)
        })
}

pub fn arb_like_count() -> impl Strategy<Value = u32> + Clone {
    0u32..10_000
}

pub fn arb_body() -> impl Strategy<Value = String> + Clone {
    "[A-Za-z0-9 ,.!?]{0,40}"
}

pub fn arb_blank() -> impl Strategy<Value = String> + Clone {
    "[ \t\n]{0,6}"
}

pub fn post(likes: u32) -> Post {
    let mut p = Post::draft(Author::new("ed"), "Site diary", "Pour day", at(0));
    p.likes = LikeTally::new(likes);
    p
}

pub fn question(votes: VoteTally) -> Question {
    let mut q = Question::draft(Author::new("fay"), "Rebar spacing?", "", at(1));
    q.votes = votes;
    q
}

pub fn answer_set(question: &ContentId, n: usize) -> Vec<Answer> {
    (0..n)
        .map(|i| {
            let mut a = Answer::draft(
                question.clone(),
                Author::new(format!("pro{i}")),
                format!("answer {i}"),
                at(10 + i64::try_from(i).unwrap()),
            );
            a.id = ContentId::new(format!("a-{i}"));
            a
        })
        .collect()
}

/// A gesture on the fixture store, by index rather than id so shrinking
/// stays meaningful.
#[derive(Debug, Clone)]
pub enum Gesture {
    VoteQuestion(VoteDirection),
    VoteAnswer(usize, VoteDirection),
    LikePost,
    LikeComment(usize),
    Save(usize),
    SaveComment(usize),
    CommentPost(String),
    ReplyAnswer(usize, String),
    Accept(usize),
    Helpful(usize),
}

pub fn arb_gesture(answers: usize) -> impl Strategy<Value = Gesture> {
    let body = "[a-z]{1,12}";
    prop_oneof![
        arb_direction().prop_map(Gesture::VoteQuestion),
        (0..answers, arb_direction()).prop_map(|(i, d)| Gesture::VoteAnswer(i, d)),
        Just(Gesture::LikePost),
        (0usize..8).prop_map(Gesture::LikeComment),
        (0..answers + 2).prop_map(Gesture::Save),
        (0usize..8).prop_map(Gesture::SaveComment),
        body.prop_map(Gesture::CommentPost),
        (0..answers, body).prop_map(|(i, b)| Gesture::ReplyAnswer(i, b)),
        (0..answers).prop_map(Gesture::Accept),
        (0..answers).prop_map(Gesture::Helpful),
    ]
}
