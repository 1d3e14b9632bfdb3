//! Actor identity resolution for CLI commands.
//!
//! The resolution chain: `--actor` flag > `GIRDER_ACTOR` env > user config
//! `actor` > `USER` env (TTY only). Commands that author content or start a
//! session require an actor; gestures take it from the active session.

use std::env;

use crate::output::{CliError, OutputMode, render_error};

/// Environment reader, swapped out in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_actor_with(
    cli_flag: Option<&str>,
    configured: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(actor) = cli_flag.map(str::trim).filter(|a| !a.is_empty()) {
        return Some(actor.to_string());
    }

    if let Some(val) = env.get("GIRDER_ACTOR") {
        return Some(val);
    }

    if let Some(actor) = configured.map(str::trim).filter(|a| !a.is_empty()) {
        return Some(actor.to_string());
    }

    if env.is_tty() {
        return env.get("USER");
    }

    None
}

/// Resolve the actor without failing.
pub fn resolve_actor(cli_flag: Option<&str>, configured: Option<&str>) -> Option<String> {
    resolve_actor_with(cli_flag, configured, &RealEnv)
}

/// Resolve the actor or render an error explaining how to set one.
///
/// # Errors
///
/// When no step of the chain yields an actor.
pub fn require_actor(
    cli_flag: Option<&str>,
    configured: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<String> {
    if let Some(actor) = resolve_actor(cli_flag, configured) {
        return Ok(actor);
    }
    render_error(
        output,
        &CliError::with_details(
            "no actor identity",
            "pass --actor, set GIRDER_ACTOR, or add `actor = \"...\"` to the user config",
            "missing_actor",
        ),
    )?;
    anyhow::bail!("no actor identity")
}
