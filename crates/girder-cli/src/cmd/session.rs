//! `gd session`: sign in, sign out, and inspect the one local session.
//!
//! Signing out, signing in as someone else, and an expired token all end in
//! [`Session::invalidate`], which clears the previous actor's vote, like and
//! save flags plus the pending ledger from the feed.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use girder_core::session::Session;
use serde::Serialize;

use crate::actor::require_actor;
use crate::cmd::{open, reject};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render, render_error};
use crate::validate;

#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    #[command(
        about = "Start a session for the resolved actor",
        after_help = "EXAMPLES:\n    # Sign in as ana for the configured TTL\n    gd --actor ana session login\n\n    # Bring your own token and a display name\n    gd --actor ana session login --token abc123 --name \"Ana Ruiz\""
    )]
    Login(LoginArgs),

    #[command(about = "End the session and clear your engagement state")]
    Logout,

    #[command(about = "Show who is signed in")]
    Show,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Bearer token issued by the backend. Generated locally when omitted.
    #[arg(long)]
    pub token: Option<String>,

    /// Minutes until the token expires. Defaults to `session.ttl_minutes`.
    #[arg(long)]
    pub ttl_minutes: Option<i64>,

    /// Name shown on content you author.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SessionOutput {
    signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    /// Actor state was cleared as part of this command.
    cleared: bool,
}

impl SessionOutput {
    fn describe(session: Option<&Session>, now: DateTime<Utc>, cleared: bool) -> Self {
        Self {
            signed_in: session.is_some_and(|s| s.is_active(now)),
            actor: session.map(|s| s.actor.clone()),
            display_name: session.and_then(|s| s.display_name.clone()),
            expires_at: session.and_then(|s| s.token.as_ref().map(|t| t.expires_at)),
            cleared,
        }
    }
}

fn write_session(o: &SessionOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Session")?;
    pretty_kv(w, "actor", o.actor.as_deref().unwrap_or("-"))?;
    if let Some(name) = &o.display_name {
        pretty_kv(w, "name", name)?;
    }
    pretty_kv(w, "signed in", if o.signed_in { "yes" } else { "no" })?;
    if let Some(at) = o.expires_at {
        pretty_kv(w, "expires", at.to_rfc3339())?;
    }
    Ok(())
}

/// Locally generated bearer token: 32 hex chars of BLAKE3 over the actor,
/// the clock, and the process id.
fn generate_token(actor: &str, now: DateTime<Utc>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(actor.as_bytes());
    hasher.update(&now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    hasher.finalize().to_hex().as_str()[..32].to_string()
}

/// Execute `gd session <subcommand>`.
///
/// # Errors
///
/// Missing actor, invalid TTL, workspace failures.
pub fn run_session(
    args: &SessionArgs,
    actor_flag: Option<&str>,
    configured_actor: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    match &args.command {
        SessionCommand::Login(login) => {
            run_login(login, actor_flag, configured_actor, output, project_root)
        }
        SessionCommand::Logout => run_logout(output, project_root),
        SessionCommand::Show => run_show(output, project_root),
    }
}

fn run_login(
    args: &LoginArgs,
    actor_flag: Option<&str>,
    configured_actor: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let actor = require_actor(actor_flag, configured_actor, output)?;
    validate::validate_actor(&actor).map_err(|e| reject(output, &e))?;

    let project = open(project_root, output)?;
    let ttl_minutes = args.ttl_minutes.unwrap_or(project.config.session.ttl_minutes);
    if ttl_minutes < 0 {
        render_error(
            output,
            &CliError::with_details(
                format!("invalid ttl_minutes {ttl_minutes}"),
                "use a TTL of 0 minutes or more",
                "invalid_ttl",
            ),
        )?;
        anyhow::bail!("invalid ttl_minutes {ttl_minutes}");
    }

    let _lock = project.lock()?;
    let mut store = project.load_store()?;
    let now = Utc::now();

    let mut cleared = false;
    if let Some(mut previous) = project.load_session()? {
        if previous.actor != actor && previous.token.is_some() {
            previous.invalidate(&mut store);
            cleared = true;
        }
    }

    let token = args
        .token
        .clone()
        .unwrap_or_else(|| generate_token(&actor, now));
    let mut session = Session::login_for(actor, token, now, Duration::minutes(ttl_minutes));
    if let Some(name) = &args.name {
        session = session.with_display_name(name.trim());
    }

    if cleared {
        project.save_store(&store)?;
    }
    project.save_session(&session)?;

    let out = SessionOutput::describe(Some(&session), now, cleared);
    render(output, &out, |o, w| {
        writeln!(
            w,
            "✓ Signed in as {}",
            o.display_name.as_deref().or(o.actor.as_deref()).unwrap_or("-")
        )
    })
}

fn run_logout(output: OutputMode, project_root: &Path) -> Result<()> {
    let project = open(project_root, output)?;
    let _lock = project.lock()?;
    let now = Utc::now();

    let Some(mut session) = project.load_session()? else {
        let out = SessionOutput::describe(None, now, false);
        return render(output, &out, |_, w| writeln!(w, "Not signed in."));
    };

    let mut store = project.load_store()?;
    session.invalidate(&mut store);
    project.save_store(&store)?;
    project.save_session(&session)?;

    let out = SessionOutput::describe(Some(&session), now, true);
    render(output, &out, |o, w| {
        writeln!(
            w,
            "✓ Signed out {}; local engagement state cleared",
            o.actor.as_deref().unwrap_or("-")
        )
    })
}

fn run_show(output: OutputMode, project_root: &Path) -> Result<()> {
    let project = open(project_root, output)?;
    let _lock = project.read_lock()?;
    let session = project.load_session()?;
    let out = SessionOutput::describe(session.as_ref(), Utc::now(), false);
    render(output, &out, |o, w| write_session(o, w))
}
