use serde::Serialize;
use std::fmt;

/// Machine-readable error codes for client and script decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    ContentNotFound,
    InvalidStateTransition,
    UnsupportedAction,
    InvalidDraft,
    InvalidContent,
    CommandNotFound,
    SessionMissing,
    SessionExpired,
    SnapshotWriteFailed,
    LockContention,
    BackendRejected,
    InternalUnexpected,
}

/// The error families a client surfaces to the user.
///
/// Every family is handled where it occurs; none escalate to a global handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected before any state transition; nothing changed.
    Validation,
    /// Session missing or expired; local user state must be cleared.
    Authentication,
    /// Backend call failed. Optimistic state is not reverted automatically.
    Network,
    /// The referenced content does not exist; offer navigation back.
    NotFound,
    /// A lifecycle rule was violated (e.g. confirming a settled command).
    Conflict,
    Internal,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ContentNotFound => "E2001",
            Self::InvalidStateTransition => "E2002",
            Self::UnsupportedAction => "E2003",
            Self::InvalidDraft => "E2004",
            Self::InvalidContent => "E2005",
            Self::CommandNotFound => "E2006",
            Self::SessionMissing => "E4001",
            Self::SessionExpired => "E4002",
            Self::SnapshotWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::BackendRejected => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Workspace not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::ContentNotFound => "Content not found",
            Self::InvalidStateTransition => "Invalid command state transition",
            Self::UnsupportedAction => "Action not supported for this content",
            Self::InvalidDraft => "Invalid comment draft",
            Self::InvalidContent => "Invalid content fields",
            Self::CommandNotFound => "Command not found",
            Self::SessionMissing => "No active session",
            Self::SessionExpired => "Session expired",
            Self::SnapshotWriteFailed => "Snapshot write failed",
            Self::LockContention => "Lock contention",
            Self::BackendRejected => "Backend request failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users and scripts.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `gd init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .girder/config.toml and retry."),
            Self::ContentNotFound => Some("Go back to the feed and pick an existing item."),
            Self::InvalidStateTransition => {
                Some("Only pending commands can be confirmed or rolled back.")
            }
            Self::UnsupportedAction => {
                Some("Posts take likes; questions and answers take votes.")
            }
            Self::InvalidDraft => Some("Write some text before submitting."),
            Self::InvalidContent => Some("Fill in every required field."),
            Self::CommandNotFound => Some("Run `gd ledger list` to see known commands."),
            Self::SessionMissing => Some("Run `gd session login` to sign in."),
            Self::SessionExpired => Some("Sign in again with `gd session login`."),
            Self::SnapshotWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `gd` process releases its lock."),
            Self::BackendRejected => Some("Retry later; local changes were kept."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }

    /// The error family this code belongs to.
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::InvalidDraft | Self::InvalidContent | Self::UnsupportedAction => {
                ErrorKind::Validation
            }
            Self::SessionMissing | Self::SessionExpired => ErrorKind::Authentication,
            Self::BackendRejected => ErrorKind::Network,
            Self::ContentNotFound | Self::CommandNotFound => ErrorKind::NotFound,
            Self::InvalidStateTransition | Self::LockContention => ErrorKind::Conflict,
            Self::NotInitialized
            | Self::ConfigParseError
            | Self::SnapshotWriteFailed
            | Self::InternalUnexpected => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Implemented by every module error so boundaries can turn it into a [`Notice`].
pub trait Coded: fmt::Display {
    fn code(&self) -> ErrorCode;
}

/// A transient, user-facing notification built from a module error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl Notice {
    #[must_use]
    pub fn from_error<E: Coded + ?Sized>(err: &E) -> Self {
        let code = err.code();
        Self {
            kind: code.kind(),
            code: code.code(),
            message: err.to_string(),
            hint: code.hint(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::{Coded, ErrorCode, ErrorKind, Notice};
    use std::collections::HashSet;
    use std::fmt;

    const ALL: [ErrorCode; 14] = [
        ErrorCode::NotInitialized,
        ErrorCode::ConfigParseError,
        ErrorCode::ContentNotFound,
        ErrorCode::InvalidStateTransition,
        ErrorCode::UnsupportedAction,
        ErrorCode::InvalidDraft,
        ErrorCode::InvalidContent,
        ErrorCode::CommandNotFound,
        ErrorCode::SessionMissing,
        ErrorCode::SessionExpired,
        ErrorCode::SnapshotWriteFailed,
        ErrorCode::LockContention,
        ErrorCode::BackendRejected,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let raw = code.code();
            assert_eq!(raw.len(), 5);
            assert!(raw.starts_with('E'));
            assert!(raw.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn taxonomy_covers_the_four_user_facing_families() {
        assert_eq!(ErrorCode::InvalidDraft.kind(), ErrorKind::Validation);
        assert_eq!(ErrorCode::SessionExpired.kind(), ErrorKind::Authentication);
        assert_eq!(ErrorCode::BackendRejected.kind(), ErrorKind::Network);
        assert_eq!(ErrorCode::ContentNotFound.kind(), ErrorKind::NotFound);
    }

    struct Sample;

    impl fmt::Display for Sample {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("comment body must not be empty")
        }
    }

    impl Coded for Sample {
        fn code(&self) -> ErrorCode {
            ErrorCode::InvalidDraft
        }
    }

    #[test]
    fn notice_carries_code_and_hint() {
        let notice = Notice::from_error(&Sample);
        assert_eq!(notice.kind, ErrorKind::Validation);
        assert_eq!(notice.code, "E2004");
        assert_eq!(notice.message, "comment body must not be empty");
        assert!(notice.hint.is_some());
        assert_eq!(notice.to_string(), "E2004: comment body must not be empty");
    }
}
