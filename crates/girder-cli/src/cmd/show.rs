//! `gd show`: full engagement state for one entry or comment.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use clap::Args;
use girder_core::model::{Answer, Comment, ContentId};
use girder_core::store::{ContentStore, Entry, StoreError};
use serde::Serialize;

use crate::cmd::list::{like_summary, vote_summary};
use crate::cmd::{open, reject};
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render};
use crate::validate;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Post, question, answer, or comment id.
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ShowOutput<'a> {
    Entry {
        revision: u64,
        #[serde(flatten)]
        entry: &'a Entry,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        answers: Vec<&'a Answer>,
    },
    Comment {
        parent: &'a ContentId,
        comment: &'a Comment,
    },
}

fn lookup<'a>(store: &'a ContentStore, id: &ContentId) -> Option<ShowOutput<'a>> {
    if let Some(entry) = store.get(id) {
        let answers = match entry {
            Entry::Question(q) => store.answers_for(&q.id),
            Entry::Post(_) | Entry::Answer(_) => Vec::new(),
        };
        return Some(ShowOutput::Entry {
            revision: store.revision(id).unwrap_or_default(),
            entry,
            answers,
        });
    }
    store
        .comment(id)
        .map(|(parent, comment)| ShowOutput::Comment { parent, comment })
}

fn write_thread(w: &mut dyn Write, heading: &str, thread: &[Comment]) -> io::Result<()> {
    if thread.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    pretty_section(w, heading)?;
    for c in thread {
        writeln!(
            w,
            "{}  {}  {}: {}",
            c.id,
            like_summary(&c.likes),
            c.author.label(),
            c.body
        )?;
    }
    Ok(())
}

fn write_human(out: &ShowOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    match out {
        ShowOutput::Entry { entry, answers, .. } => match entry {
            Entry::Post(p) => {
                pretty_section(w, &format!("Post {}", p.id))?;
                pretty_kv(w, "title", &p.title)?;
                pretty_kv(w, "author", p.author.label())?;
                pretty_kv(w, "likes", like_summary(&p.likes))?;
                pretty_kv(w, "saved", if p.is_saved { "yes" } else { "no" })?;
                pretty_kv(w, "comments", p.comment_count.to_string())?;
                if !p.body.is_empty() {
                    writeln!(w)?;
                    writeln!(w, "{}", p.body)?;
                }
                write_thread(w, "Comments", &p.comments)
            }
            Entry::Question(q) => {
                pretty_section(w, &format!("Question {}", q.id))?;
                pretty_kv(w, "title", &q.title)?;
                pretty_kv(w, "author", q.author.label())?;
                pretty_kv(w, "votes", vote_summary(&q.votes))?;
                pretty_kv(w, "saved", if q.is_saved { "yes" } else { "no" })?;
                if !q.body.is_empty() {
                    writeln!(w)?;
                    writeln!(w, "{}", q.body)?;
                }
                if !answers.is_empty() {
                    writeln!(w)?;
                    pretty_section(w, "Answers")?;
                    for a in answers {
                        let mark = if a.is_accepted { "✓ " } else { "" };
                        writeln!(
                            w,
                            "{mark}{}  {}  {}: {}",
                            a.id,
                            vote_summary(&a.votes),
                            a.author.label(),
                            a.body
                        )?;
                    }
                }
                Ok(())
            }
            Entry::Answer(a) => {
                pretty_section(w, &format!("Answer {}", a.id))?;
                pretty_kv(w, "question", a.question_id.as_str())?;
                pretty_kv(w, "author", a.author.label())?;
                pretty_kv(w, "votes", vote_summary(&a.votes))?;
                pretty_kv(w, "accepted", if a.is_accepted { "yes" } else { "no" })?;
                pretty_kv(w, "helpful", if a.is_helpful { "yes" } else { "no" })?;
                pretty_kv(w, "saved", if a.is_saved { "yes" } else { "no" })?;
                pretty_kv(w, "replies", a.reply_count.to_string())?;
                writeln!(w)?;
                writeln!(w, "{}", a.body)?;
                write_thread(w, "Replies", &a.replies)
            }
        },
        ShowOutput::Comment { parent, comment } => {
            pretty_section(w, &format!("Comment {}", comment.id))?;
            pretty_kv(w, "on", parent.as_str())?;
            pretty_kv(w, "author", comment.author.label())?;
            pretty_kv(w, "likes", like_summary(&comment.likes))?;
            pretty_kv(w, "saved", if comment.is_saved { "yes" } else { "no" })?;
            writeln!(w)?;
            writeln!(w, "{}", comment.body)
        }
    }
}

/// Execute `gd show`.
///
/// # Errors
///
/// Invalid or unknown id, or workspace failures.
pub fn run_show(args: &ShowArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let id = validate::validate_content_id(&args.id).map_err(|e| reject(output, &e))?;
    let project = open(project_root, output)?;
    let _lock = project.read_lock()?;
    let store = project.load_store()?;

    let Some(out) = lookup(&store, &id) else {
        return Err(fail(output, &StoreError::NotFound(id)));
    };
    render(output, &out, |o, w| write_human(o, w))
}
