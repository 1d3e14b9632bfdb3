//! Subcommand handlers and the plumbing they share.
//!
//! Every handler opens the workspace, takes the feed lock for the duration of
//! the command, and renders library errors through [`crate::output::fail`]
//! before bailing, so stderr always carries the `E####` code.

pub mod completions;
pub mod content;
pub mod engage;
pub mod init;
pub mod ledger;
pub mod list;
pub mod request;
pub mod session;
pub mod show;
pub mod sim;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use girder_core::config::{ProjectConfig, load_project_config};
use girder_core::error::ErrorCode;
use girder_core::lock::{FeedLock, FeedReadLock};
use girder_core::session::Session;
use girder_core::snapshot::Workspace;
use girder_core::store::ContentStore;
use tracing::warn;

use crate::output::{CliError, OutputMode, fail, render_error};
use crate::validate::ValidationError;

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// An opened workspace plus its project config.
pub struct Project {
    pub workspace: Workspace,
    pub config: ProjectConfig,
    pub output: OutputMode,
}

/// Discover the workspace from `project_root` and load its config.
///
/// # Errors
///
/// No `.girder/` above `project_root`, or an unparsable config file.
pub fn open(project_root: &Path, output: OutputMode) -> Result<Project> {
    let workspace = Workspace::discover(project_root).map_err(|e| fail(output, &e))?;
    let config = match load_project_config(workspace.root()) {
        Ok(config) => config,
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            render_error(
                output,
                &CliError::with_details(
                    format!("{err:#}"),
                    code.hint().unwrap_or_default(),
                    code.code(),
                ),
            )?;
            return Err(err);
        }
    };
    Ok(Project {
        workspace,
        config,
        output,
    })
}

impl Project {
    /// # Errors
    ///
    /// Lock timeout or I/O failure.
    pub fn lock(&self) -> Result<FeedLock> {
        FeedLock::acquire(&self.workspace.lock_path(), LOCK_TIMEOUT)
            .map_err(|e| fail(self.output, &e))
    }

    /// # Errors
    ///
    /// Lock timeout or I/O failure.
    pub fn read_lock(&self) -> Result<FeedReadLock> {
        FeedReadLock::acquire(&self.workspace.lock_path(), LOCK_TIMEOUT)
            .map_err(|e| fail(self.output, &e))
    }

    /// # Errors
    ///
    /// Unreadable or corrupt feed snapshot.
    pub fn load_store(&self) -> Result<ContentStore> {
        self.workspace
            .load_store(self.config.threads.policy())
            .map_err(|e| fail(self.output, &e))
    }

    /// # Errors
    ///
    /// Write failure.
    pub fn save_store(&self, store: &ContentStore) -> Result<()> {
        self.workspace
            .save_store(store)
            .map_err(|e| fail(self.output, &e))
    }

    /// # Errors
    ///
    /// Unreadable or corrupt session file.
    pub fn load_session(&self) -> Result<Option<Session>> {
        self.workspace
            .load_session()
            .map_err(|e| fail(self.output, &e))
    }

    /// # Errors
    ///
    /// Write failure.
    pub fn save_session(&self, session: &Session) -> Result<()> {
        self.workspace
            .save_session(session)
            .map_err(|e| fail(self.output, &e))
    }

    /// The signed-in session, valid at `now`.
    ///
    /// An expired session is invalidated on the spot: its token is dropped,
    /// actor state in `store` is cleared, and both are written back before
    /// the error is reported.
    ///
    /// # Errors
    ///
    /// `E4001` when nobody is signed in, `E4002` when the token expired.
    pub fn active_session(&self, store: &mut ContentStore, now: DateTime<Utc>) -> Result<Session> {
        let mut session = self
            .load_session()?
            .unwrap_or_else(|| Session::anonymous("anonymous"));
        match session.check(now) {
            Ok(_) => Ok(session),
            Err(err) => {
                if session.token.is_some() {
                    warn!(actor = %session.actor, "session expired; clearing actor state");
                    session.invalidate(store);
                    self.save_store(store)?;
                    self.save_session(&session)?;
                }
                Err(fail(self.output, &err))
            }
        }
    }

    /// Compact the ledger when the project asks for it.
    pub fn maybe_compact(&self, store: &mut ContentStore) -> usize {
        if self.config.ledger.auto_compact {
            store.compact()
        } else {
            0
        }
    }
}

/// Render a validation failure and turn it into the command's error.
pub fn reject(output: OutputMode, err: &ValidationError) -> anyhow::Error {
    let cli = err.to_cli_error();
    if let Err(render_err) = render_error(output, &cli) {
        warn!(error = %render_err, "failed to render error");
    }
    anyhow::anyhow!("{}", cli.message)
}
