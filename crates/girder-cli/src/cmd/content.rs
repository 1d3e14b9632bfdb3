//! `gd post`, `gd ask`, `gd answer`: add content to the local feed at its
//! server baseline (zero engagement, nothing pending).

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use girder_core::model::{Answer, Author, ContentId, ContentKind, Post, Question};
use serde::Serialize;

use crate::actor::require_actor;
use crate::cmd::{open, reject};
use crate::output::{OutputMode, fail, render};
use crate::validate;

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Post headline.
    #[arg(long)]
    pub title: String,

    /// Article text.
    #[arg(long, default_value = "")]
    pub body: String,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question title.
    #[arg(long)]
    pub title: String,

    /// Details.
    #[arg(long, default_value = "")]
    pub body: String,
}

#[derive(Args, Debug)]
pub struct AnswerArgs {
    /// Question to answer.
    pub question: String,

    /// Answer text.
    #[arg(long)]
    pub body: String,
}

#[derive(Debug, Serialize)]
struct CreatedOutput {
    ok: bool,
    id: ContentId,
    kind: ContentKind,
    author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<ContentId>,
}

fn print_created(output: OutputMode, out: &CreatedOutput) -> Result<()> {
    render(output, out, |o, w| {
        writeln!(w, "✓ Created {} {} by {}", o.kind, o.id, o.author)
    })
}

/// Execute `gd post`.
///
/// # Errors
///
/// Invalid title, missing actor, or workspace failures.
pub fn run_post(
    args: &PostArgs,
    actor_flag: Option<&str>,
    configured_actor: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    validate::validate_title(&args.title).map_err(|e| reject(output, &e))?;
    let actor = require_actor(actor_flag, configured_actor, output)?;
    validate::validate_actor(&actor).map_err(|e| reject(output, &e))?;

    let project = open(project_root, output)?;
    let _lock = project.lock()?;
    let mut store = project.load_store()?;

    let post = Post::draft(Author::new(actor.clone()), args.title.trim(), args.body.trim(), Utc::now());
    let id = post.id.clone();
    store.insert_post(post).map_err(|e| fail(output, &e))?;
    project.save_store(&store)?;
    tracing::info!(%id, %actor, "post created");

    print_created(
        output,
        &CreatedOutput {
            ok: true,
            id,
            kind: ContentKind::Post,
            author: actor,
            question: None,
        },
    )
}

/// Execute `gd ask`.
///
/// # Errors
///
/// Invalid title, missing actor, or workspace failures.
pub fn run_ask(
    args: &AskArgs,
    actor_flag: Option<&str>,
    configured_actor: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    validate::validate_title(&args.title).map_err(|e| reject(output, &e))?;
    let actor = require_actor(actor_flag, configured_actor, output)?;
    validate::validate_actor(&actor).map_err(|e| reject(output, &e))?;

    let project = open(project_root, output)?;
    let _lock = project.lock()?;
    let mut store = project.load_store()?;

    let question = Question::draft(
        Author::new(actor.clone()),
        args.title.trim(),
        args.body.trim(),
        Utc::now(),
    );
    let id = question.id.clone();
    store.insert_question(question).map_err(|e| fail(output, &e))?;
    project.save_store(&store)?;
    tracing::info!(%id, %actor, "question created");

    print_created(
        output,
        &CreatedOutput {
            ok: true,
            id,
            kind: ContentKind::Question,
            author: actor,
            question: None,
        },
    )
}

/// Execute `gd answer`.
///
/// # Errors
///
/// Unknown question, blank body, missing actor, or workspace failures.
pub fn run_answer(
    args: &AnswerArgs,
    actor_flag: Option<&str>,
    configured_actor: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let question_id = validate::validate_content_id(&args.question).map_err(|e| reject(output, &e))?;
    let actor = require_actor(actor_flag, configured_actor, output)?;
    validate::validate_actor(&actor).map_err(|e| reject(output, &e))?;

    let project = open(project_root, output)?;
    let _lock = project.lock()?;
    let mut store = project.load_store()?;

    let answer = Answer::draft(
        question_id.clone(),
        Author::new(actor.clone()),
        args.body.trim(),
        Utc::now(),
    );
    let id = answer.id.clone();
    store.insert_answer(answer).map_err(|e| fail(output, &e))?;
    project.save_store(&store)?;
    tracing::info!(%id, question = %question_id, %actor, "answer created");

    print_created(
        output,
        &CreatedOutput {
            ok: true,
            id,
            kind: ContentKind::Answer,
            author: actor,
            question: Some(question_id),
        },
    )
}
