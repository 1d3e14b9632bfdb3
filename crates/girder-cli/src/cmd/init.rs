use anyhow::Result;
use clap::Args;
use girder_core::snapshot::Workspace;
use serde::Serialize;
use std::path::Path;
use std::io::Write;

use crate::output::{OutputMode, fail, render};

#[derive(Args, Debug)]
pub struct InitArgs {}

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    root: String,
    already_initialized: bool,
}

/// Execute `gd init`. Creates the workspace skeleton:
///
/// ```text
/// .girder/
///   config.toml   (default project config)
///   feed.json     (empty content store and ledger)
/// ```
///
/// Re-running it keeps existing files.
///
/// # Errors
///
/// Any filesystem failure while creating the directory.
pub fn run_init(_args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let already_initialized = Workspace::discover(project_root)
        .is_ok_and(|ws| ws.root() == project_root);
    let ws = Workspace::init(project_root).map_err(|e| fail(output, &e))?;

    let out = InitOutput {
        ok: true,
        root: ws.root().display().to_string(),
        already_initialized,
    };
    render(output, &out, |o, w| {
        if o.already_initialized {
            writeln!(w, "✓ Workspace already initialized at {}", o.root)
        } else {
            writeln!(w, "✓ Initialized girder workspace at {}", o.root)
        }
    })
}
