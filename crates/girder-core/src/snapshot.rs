//! Local working copy under `.girder/`.
//!
//! ```text
//! .girder/
//!   config.toml    project settings
//!   feed.json      content store + command ledger
//!   session.json   current session (absent when signed out)
//!   lock           advisory lock file
//! ```
//!
//! Writes go to a sibling temp file first and are renamed into place.

use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::error::{Coded, ErrorCode};
use crate::session::Session;
use crate::store::ContentStore;
use crate::thread::ThreadPolicy;

pub const GIRDER_DIR: &str = ".girder";

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("no {GIRDER_DIR} directory at or above {}", start.display())]
    NotInitialized { start: PathBuf },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode default config: {0}")]
    Config(#[from] toml::ser::Error),
}

impl Coded for SnapshotError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::Io { .. } => ErrorCode::SnapshotWriteFailed,
            Self::Parse { .. } | Self::Config(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// A directory containing `.girder/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Walk up from `start` to the nearest directory holding `.girder/`.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::NotInitialized`] when none is found.
    pub fn discover(start: &Path) -> Result<Self, SnapshotError> {
        start
            .ancestors()
            .find(|dir| dir.join(GIRDER_DIR).is_dir())
            .map(|root| Self {
                root: root.to_path_buf(),
            })
            .ok_or_else(|| SnapshotError::NotInitialized {
                start: start.to_path_buf(),
            })
    }

    /// Create `.girder/` under `root` with an empty feed and default config.
    ///
    /// Existing files are left alone, so running it twice is harmless.
    ///
    /// # Errors
    ///
    /// I/O failures while creating the directory or files.
    pub fn init(root: &Path) -> Result<Self, SnapshotError> {
        let ws = Self {
            root: root.to_path_buf(),
        };
        let dir = ws.dir();
        fs::create_dir_all(&dir).map_err(|source| SnapshotError::Io {
            path: dir.clone(),
            source,
        })?;

        if !ws.config_path().exists() {
            let config = toml::to_string_pretty(&ProjectConfig::default())?;
            write_atomic(&ws.config_path(), config.as_bytes())?;
        }
        if !ws.feed_path().exists() {
            ws.save_store(&ContentStore::new())?;
        }
        tracing::info!(root = %root.display(), "workspace initialized");
        Ok(ws)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn dir(&self) -> PathBuf {
        self.root.join(GIRDER_DIR)
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.dir().join("config.toml")
    }

    #[must_use]
    pub fn feed_path(&self) -> PathBuf {
        self.dir().join("feed.json")
    }

    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.dir().join("session.json")
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.dir().join("lock")
    }

    /// Load the store and apply the configured thread policy.
    ///
    /// # Errors
    ///
    /// I/O or JSON failures.
    pub fn load_store(&self, policy: ThreadPolicy) -> Result<ContentStore, SnapshotError> {
        let mut store: ContentStore = read_json(&self.feed_path())?.unwrap_or_default();
        store.set_policy(policy);
        Ok(store)
    }

    /// # Errors
    ///
    /// I/O or JSON failures.
    pub fn save_store(&self, store: &ContentStore) -> Result<(), SnapshotError> {
        write_json(&self.feed_path(), store)
    }

    /// # Errors
    ///
    /// I/O or JSON failures.
    pub fn load_session(&self) -> Result<Option<Session>, SnapshotError> {
        read_json(&self.session_path())
    }

    /// # Errors
    ///
    /// I/O or JSON failures.
    pub fn save_session(&self, session: &Session) -> Result<(), SnapshotError> {
        write_json(&self.session_path(), session)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SnapshotError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let mut raw = serde_json::to_vec_pretty(value).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    raw.push(b'\n');
    write_atomic(path, &raw)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
    let tmp = path.with_extension("tmp");
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, Post};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn discover_walks_up_to_the_workspace() {
        let dir = TempDir::new().expect("tempdir");
        Workspace::init(dir.path()).expect("init");
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).expect("mkdir");

        let ws = Workspace::discover(&nested).expect("discover");
        assert_eq!(ws.root(), dir.path());
    }

    #[test]
    fn discover_without_workspace_is_not_initialized() {
        let dir = TempDir::new().expect("tempdir");
        let err = Workspace::discover(dir.path()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotInitialized);
    }

    #[test]
    fn store_and_session_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let ws = Workspace::init(dir.path()).expect("init");
        assert!(ws.config_path().exists());
        assert!(ws.load_session().expect("load").is_none());

        let now = Utc.timestamp_opt(1_700_000_000, 0).single().expect("ts");
        let mut store = ws.load_store(ThreadPolicy::default()).expect("load");
        store
            .insert_post(Post::draft(Author::new("ed"), "Pour schedule", "", now))
            .expect("insert");
        ws.save_store(&store).expect("save");
        ws.save_session(&Session::login("ed", "t", now)).expect("save session");

        let back = ws.load_store(ThreadPolicy::default()).expect("reload");
        assert_eq!(back.len(), 1);
        assert_eq!(ws.load_session().expect("load").map(|s| s.actor), Some("ed".to_string()));
    }

    #[test]
    fn init_keeps_existing_feed() {
        let dir = TempDir::new().expect("tempdir");
        let ws = Workspace::init(dir.path()).expect("init");
        let now = Utc.timestamp_opt(1_700_000_000, 0).single().expect("ts");
        let mut store = ContentStore::new();
        store
            .insert_post(Post::draft(Author::new("ed"), "Keep me", "", now))
            .expect("insert");
        ws.save_store(&store).expect("save");

        let again = Workspace::init(dir.path()).expect("re-init");
        assert_eq!(again.load_store(ThreadPolicy::default()).expect("load").len(), 1);
    }

    #[test]
    fn corrupt_feed_reports_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let ws = Workspace::init(dir.path()).expect("init");
        fs::write(ws.feed_path(), "{not json").expect("write");
        let err = ws.load_store(ThreadPolicy::default()).unwrap_err();
        assert!(matches!(err, SnapshotError::Parse { .. }));
    }
}
