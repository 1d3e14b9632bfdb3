//! Gesture commands: `gd vote`, `gd like`, `gd save`, `gd comment`,
//! `gd accept`, `gd helpful`.
//!
//! Each one is applied to the local feed immediately and recorded as a
//! pending command. The backend's answer arrives later through
//! `gd ledger confirm` or `gd ledger rollback`.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use girder_core::command::Effect;
use girder_core::model::{ContentId, VoteDirection};
use girder_core::store::{Action, ContentStore};
use serde::Serialize;

use crate::cmd::list::{like_summary, row};
use crate::cmd::{open, reject};
use crate::output::{OutputMode, fail, render};
use crate::validate;

#[derive(Args, Debug)]
pub struct VoteArgs {
    /// Question or answer id.
    pub id: String,

    /// `up` or `down`. Repeating your current vote retracts it.
    pub direction: VoteDirection,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Content id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Post or answer to comment on.
    pub parent: String,

    /// Comment text.
    pub body: String,
}

#[derive(Args, Debug)]
pub struct AcceptArgs {
    /// Question id.
    pub question: String,

    /// Answer to accept. Accepting the current one clears it.
    pub answer: String,
}

#[derive(Debug, Serialize)]
struct GestureOutput {
    ok: bool,
    command: String,
    action: &'static str,
    subject: ContentId,
    actor: String,
    status: &'static str,
    engagement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment_id: Option<ContentId>,
}

/// Current engagement line for `id`, whether it is an entry or a comment.
fn engagement_of(store: &ContentStore, id: &ContentId) -> String {
    if let Some(entry) = store.get(id) {
        return row(entry).engagement;
    }
    store
        .comment(id)
        .map(|(_, c)| {
            let likes = like_summary(&c.likes);
            if c.is_saved { format!("{likes}  saved") } else { likes }
        })
        .unwrap_or_default()
}

fn dispatch(action: Action, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = open(project_root, output)?;
    let _lock = project.lock()?;
    let mut store = project.load_store()?;
    let now = Utc::now();
    let session = project.active_session(&mut store, now)?;

    let label = action.label();
    let (command, effect) = store
        .dispatch_effect(action, &session.author(), now)
        .map_err(|e| fail(output, &e))?;
    project.save_store(&store)?;

    let (subject, comment_id) = match effect {
        Effect::Comment { parent, comment } => (parent, Some(comment.id)),
        other => (other.subject().clone(), None),
    };
    let out = GestureOutput {
        ok: true,
        command: command.to_string(),
        action: label,
        engagement: engagement_of(&store, &subject),
        subject,
        actor: session.actor,
        status: "pending",
        comment_id,
    };
    render(output, &out, |o, w| {
        writeln!(
            w,
            "✓ {} {}  {}  [{} pending]",
            o.action, o.subject, o.engagement, o.command
        )?;
        if let Some(id) = &o.comment_id {
            writeln!(w, "  comment: {id}")?;
        }
        Ok(())
    })
}

/// Execute `gd vote`.
///
/// # Errors
///
/// Invalid id, no active session, unknown or unvotable content.
pub fn run_vote(args: &VoteArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let target = validate::validate_content_id(&args.id).map_err(|e| reject(output, &e))?;
    dispatch(
        Action::Vote {
            target,
            direction: args.direction,
        },
        output,
        project_root,
    )
}

/// Execute `gd like`.
///
/// # Errors
///
/// Invalid id, no active session, unknown or unlikable content.
pub fn run_like(args: &TargetArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let target = validate::validate_content_id(&args.id).map_err(|e| reject(output, &e))?;
    dispatch(Action::Like { target }, output, project_root)
}

/// Execute `gd save`.
///
/// # Errors
///
/// Invalid id, no active session, unknown content.
pub fn run_save(args: &TargetArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let target = validate::validate_content_id(&args.id).map_err(|e| reject(output, &e))?;
    dispatch(Action::Save { target }, output, project_root)
}

/// Execute `gd comment`.
///
/// # Errors
///
/// Invalid id, blank or oversized body, no active session.
pub fn run_comment(args: &CommentArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let parent = validate::validate_content_id(&args.parent).map_err(|e| reject(output, &e))?;
    dispatch(
        Action::Comment {
            parent,
            body: args.body.clone(),
        },
        output,
        project_root,
    )
}

/// Execute `gd accept`.
///
/// # Errors
///
/// Invalid ids, no active session, answer not under the question.
pub fn run_accept(args: &AcceptArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let question =
        validate::validate_content_id(&args.question).map_err(|e| reject(output, &e))?;
    let answer = validate::validate_content_id(&args.answer).map_err(|e| reject(output, &e))?;
    dispatch(Action::Accept { question, answer }, output, project_root)
}

/// Execute `gd helpful`.
///
/// # Errors
///
/// Invalid id, no active session, target is not an answer.
pub fn run_helpful(args: &TargetArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let answer = validate::validate_content_id(&args.id).map_err(|e| reject(output, &e))?;
    dispatch(Action::Helpful { answer }, output, project_root)
}
