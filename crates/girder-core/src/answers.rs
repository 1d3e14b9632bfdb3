//! Accepted and helpful marks on forum answers.
//!
//! Per question the answers are in one of two states: none accepted, or
//! exactly one accepted. "Helpful" is an unrelated per-answer toggle; any
//! number of answers may be helpful at once.

use serde::{Deserialize, Serialize};

use crate::error::{Coded, ErrorCode};
use crate::model::{Answer, ContentId};

/// Acceptance state of a question's answer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "answer", rename_all = "snake_case")]
pub enum Acceptance {
    NoneAccepted,
    Accepted(ContentId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("answer {0} is not part of this question")]
    NotFound(ContentId),
}

impl Coded for AnswerError {
    fn code(&self) -> ErrorCode {
        ErrorCode::ContentNotFound
    }
}

/// Report which answer, if any, is accepted.
#[must_use]
pub fn acceptance(answers: &[Answer]) -> Acceptance {
    answers
        .iter()
        .find(|a| a.is_accepted)
        .map_or(Acceptance::NoneAccepted, |a| Acceptance::Accepted(a.id.clone()))
}

/// Accept `target`, or clear acceptance if it is already the accepted one.
///
/// # Errors
///
/// [`AnswerError::NotFound`] when `target` is not among `answers`; nothing is
/// changed in that case.
pub fn mark_accepted(answers: &[Answer], target: &ContentId) -> Result<Vec<Answer>, AnswerError> {
    let mut next = answers.to_vec();
    mark_accepted_in(next.iter_mut(), target)?;
    Ok(next)
}

/// In-place form of [`mark_accepted`] over borrowed answers.
///
/// # Errors
///
/// [`AnswerError::NotFound`] when `target` is not among `answers`.
pub fn mark_accepted_in<'a>(
    answers: impl IntoIterator<Item = &'a mut Answer>,
    target: &ContentId,
) -> Result<Acceptance, AnswerError> {
    let mut answers: Vec<&mut Answer> = answers.into_iter().collect();
    let Some(pos) = answers.iter().position(|a| &a.id == target) else {
        return Err(AnswerError::NotFound(target.clone()));
    };

    if answers[pos].is_accepted {
        answers[pos].is_accepted = false;
        tracing::debug!(answer = %target, "acceptance cleared");
        return Ok(Acceptance::NoneAccepted);
    }

    for answer in &mut answers {
        answer.is_accepted = false;
    }
    answers[pos].is_accepted = true;
    tracing::debug!(answer = %target, "answer accepted");
    Ok(Acceptance::Accepted(target.clone()))
}

/// Flip the helpful flag on one answer.
#[must_use]
pub fn toggle_helpful(answer: &Answer) -> Answer {
    let mut next = answer.clone();
    next.is_helpful = !next.is_helpful;
    next
}
