//! `gd ledger`: inspect pending commands and feed in the backend's verdict.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use girder_core::command::Command;
use girder_core::model::ContentId;
use girder_core::store::RollbackReport;
use serde::Serialize;

use crate::cmd::{open, reject};
use crate::output::{OutputMode, fail, pretty_rule, render, render_mode};
use crate::validate;

#[derive(Args, Debug)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub command: LedgerCommand,
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    #[command(
        about = "List recorded commands",
        after_help = "EXAMPLES:\n    # Everything still in the ledger\n    gd ledger list\n\n    # Only what is waiting on the backend\n    gd ledger list --pending"
    )]
    List(LedgerListArgs),

    #[command(
        about = "Mark a pending command as synced",
        after_help = "EXAMPLES:\n    gd ledger confirm cmd-3"
    )]
    Confirm(CommandRef),

    #[command(
        about = "Revert a pending command after a failed sync",
        long_about = "Put every entry the command touched back to its state before the command,\n\
                      then replay later commands on top. Later commands that no longer apply\n\
                      are rolled back too.",
        after_help = "EXAMPLES:\n    gd ledger rollback cmd-3\n\n    # Machine-readable rollback report\n    gd ledger rollback cmd-3 --json"
    )]
    Rollback(CommandRef),

    #[command(about = "Drop settled commands that no pending rollback needs")]
    Compact,
}

#[derive(Args, Debug)]
pub struct LedgerListArgs {
    /// Only pending commands.
    #[arg(long)]
    pub pending: bool,
}

#[derive(Args, Debug)]
pub struct CommandRef {
    /// Command id, e.g. `cmd-3`.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct LedgerRow {
    id: String,
    action: &'static str,
    subject: ContentId,
    actor: String,
    status: &'static str,
    issued_at: DateTime<Utc>,
}

impl From<&Command> for LedgerRow {
    fn from(c: &Command) -> Self {
        Self {
            id: c.id.to_string(),
            action: c.effect.label(),
            subject: c.effect.subject().clone(),
            actor: c.actor.clone(),
            status: c.status.as_str(),
            issued_at: c.issued_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct SettleOutput {
    ok: bool,
    command: String,
    status: &'static str,
    compacted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    rollback: Option<RollbackReport>,
}

#[derive(Debug, Serialize)]
struct CompactOutput {
    ok: bool,
    removed: usize,
    remaining: usize,
}

/// Execute `gd ledger <subcommand>`.
///
/// # Errors
///
/// Invalid or unknown command ids, settled commands, workspace failures.
pub fn run_ledger(args: &LedgerArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    match &args.command {
        LedgerCommand::List(list) => run_list(list, output, project_root),
        LedgerCommand::Confirm(target) => run_settle(target, false, output, project_root),
        LedgerCommand::Rollback(target) => run_settle(target, true, output, project_root),
        LedgerCommand::Compact => run_compact(output, project_root),
    }
}

fn run_list(args: &LedgerListArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = open(project_root, output)?;
    let _lock = project.read_lock()?;
    let store = project.load_store()?;

    let rows: Vec<LedgerRow> = store
        .ledger()
        .iter()
        .filter(|c| !args.pending || !c.status.is_settled())
        .map(LedgerRow::from)
        .collect();

    render_mode(
        output,
        &rows,
        |rows, w| {
            for r in rows {
                writeln!(w, "{}\t{}\t{}\t{}\t{}", r.id, r.status, r.action, r.subject, r.actor)?;
            }
            Ok(())
        },
        |rows, w| {
            if rows.is_empty() {
                return writeln!(w, "Ledger is empty.");
            }
            writeln!(w, "{:<8} {:<12} {:<8} {:<16} ACTOR", "ID", "STATUS", "ACTION", "SUBJECT")?;
            pretty_rule(w)?;
            for r in rows {
                writeln!(
                    w,
                    "{:<8} {:<12} {:<8} {:<16} {}",
                    r.id,
                    r.status,
                    r.action,
                    r.subject.as_str(),
                    r.actor
                )?;
            }
            Ok(())
        },
    )
}

fn run_settle(
    target: &CommandRef,
    rollback: bool,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let id = validate::validate_command_id(&target.id).map_err(|e| reject(output, &e))?;
    let project = open(project_root, output)?;
    let _lock = project.lock()?;
    let mut store = project.load_store()?;

    let report = if rollback {
        Some(store.rollback(id).map_err(|e| fail(output, &e))?)
    } else {
        store.confirm(id).map_err(|e| fail(output, &e))?;
        None
    };
    let compacted = project.maybe_compact(&mut store);
    project.save_store(&store)?;

    let out = SettleOutput {
        ok: true,
        command: id.to_string(),
        status: if rollback { "rolled_back" } else { "confirmed" },
        compacted,
        rollback: report,
    };
    render(output, &out, |o, w| {
        writeln!(w, "✓ {} {}", o.command, o.status)?;
        if let Some(report) = &o.rollback {
            if !report.restored.is_empty() {
                let ids: Vec<&str> = report.restored.iter().map(ContentId::as_str).collect();
                writeln!(w, "  restored: {}", ids.join(", "))?;
            }
            if !report.replayed.is_empty() {
                let ids: Vec<String> = report.replayed.iter().map(ToString::to_string).collect();
                writeln!(w, "  replayed: {}", ids.join(", "))?;
            }
            if !report.cascaded.is_empty() {
                let ids: Vec<String> = report.cascaded.iter().map(ToString::to_string).collect();
                writeln!(w, "  also rolled back: {}", ids.join(", "))?;
            }
            if !report.orphaned_confirmed.is_empty() {
                let ids: Vec<String> =
                    report.orphaned_confirmed.iter().map(ToString::to_string).collect();
                writeln!(w, "  confirmed but no longer applies: {}", ids.join(", "))?;
            }
        }
        if o.compacted > 0 {
            writeln!(w, "  compacted {} settled command(s)", o.compacted)?;
        }
        Ok(())
    })
}

fn run_compact(output: OutputMode, project_root: &Path) -> Result<()> {
    let project = open(project_root, output)?;
    let _lock = project.lock()?;
    let mut store = project.load_store()?;
    let removed = store.compact();
    project.save_store(&store)?;

    let out = CompactOutput {
        ok: true,
        removed,
        remaining: store.ledger().len(),
    };
    render(output, &out, |o, w| {
        writeln!(
            w,
            "✓ Compacted ledger: removed {}, {} remaining",
            o.removed, o.remaining
        )
    })
}
