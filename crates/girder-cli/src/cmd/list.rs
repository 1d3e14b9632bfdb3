//! `gd list`: one line per entry in the local feed.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::Args;
use girder_core::model::{ContentId, ContentKind, LikeTally, VoteTally};
use girder_core::store::Entry;
use serde::Serialize;

use crate::cmd::open;
use crate::output::{OutputMode, pretty_rule, render_mode};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show one kind: post, question, or answer.
    #[arg(long)]
    pub kind: Option<ContentKind>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ListRow {
    pub id: ContentId,
    pub kind: ContentKind,
    pub title: String,
    pub author: String,
    pub engagement: String,
    pub saved: bool,
}

/// "♥ 3 (liked)" or "+4/-1 (you: up)".
pub(crate) fn like_summary(likes: &LikeTally) -> String {
    if likes.is_liked {
        format!("♥ {} (liked)", likes.like_count)
    } else {
        format!("♥ {}", likes.like_count)
    }
}

pub(crate) fn vote_summary(votes: &VoteTally) -> String {
    match votes.my_vote {
        Some(direction) => format!("+{}/-{} (you: {direction})", votes.upvotes, votes.downvotes),
        None => format!("+{}/-{}", votes.upvotes, votes.downvotes),
    }
}

fn snippet(text: &str, max: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() > max {
        let cut: String = first_line.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    } else {
        first_line.to_string()
    }
}

pub(crate) fn row(entry: &Entry) -> ListRow {
    match entry {
        Entry::Post(p) => ListRow {
            id: p.id.clone(),
            kind: ContentKind::Post,
            title: p.title.clone(),
            author: p.author.label().to_string(),
            engagement: format!("{}  💬 {}", like_summary(&p.likes), p.comment_count),
            saved: p.is_saved,
        },
        Entry::Question(q) => ListRow {
            id: q.id.clone(),
            kind: ContentKind::Question,
            title: q.title.clone(),
            author: q.author.label().to_string(),
            engagement: format!("{}  answers {}", vote_summary(&q.votes), q.answer_ids.len()),
            saved: q.is_saved,
        },
        Entry::Answer(a) => {
            let mut engagement = vote_summary(&a.votes);
            if a.is_accepted {
                engagement.push_str("  ✓ accepted");
            }
            if a.is_helpful {
                engagement.push_str("  helpful");
            }
            ListRow {
                id: a.id.clone(),
                kind: ContentKind::Answer,
                title: snippet(&a.body, 60),
                author: a.author.label().to_string(),
                engagement,
                saved: a.is_saved,
            }
        }
    }
}

/// Execute `gd list`.
///
/// # Errors
///
/// Workspace or snapshot failures.
pub fn run_list(args: &ListArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = open(project_root, output)?;
    let _lock = project.read_lock()?;
    let store = project.load_store()?;

    let rows: Vec<ListRow> = store
        .iter()
        .filter(|e| args.kind.is_none_or(|k| e.kind() == k))
        .map(row)
        .collect();

    render_mode(
        output,
        &rows,
        |rows, w| {
            for r in rows {
                writeln!(w, "{}\t{}\t{}\t{}", r.id, r.kind, r.engagement, r.title)?;
            }
            Ok(())
        },
        |rows, w| {
            if rows.is_empty() {
                return writeln!(w, "Feed is empty. Add content with `gd post` or `gd ask`.");
            }
            writeln!(w, "{:<16} {:<9} {:<28} TITLE", "ID", "KIND", "ENGAGEMENT")?;
            pretty_rule(w)?;
            for r in rows {
                let saved = if r.saved { " ★" } else { "" };
                writeln!(
                    w,
                    "{:<16} {:<9} {:<28} {}{saved}",
                    r.id.as_str(),
                    r.kind.as_str(),
                    r.engagement,
                    r.title
                )?;
            }
            Ok(())
        },
    )
}
