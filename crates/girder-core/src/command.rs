//! Optimistic command ledger.
//!
//! Every gesture dispatched through [`crate::store::ContentStore`] is applied
//! locally right away and recorded here as a [`Command`]:
//!
//! | From | To | Trigger |
//! |---|---|---|
//! | `pending` | `confirmed` | backend accepted the sync |
//! | `pending` | `rolled_back` | backend rejected it; local effect reverted |
//!
//! `confirmed` and `rolled_back` are terminal. A confirmed command whose
//! target disappears under a rollback (a like on a comment that was never
//! synced) keeps its status and is marked orphaned instead.
//!
//! A command stores the entries
//! it touched as they were just before it ran, which is what makes rollback
//! deterministic. Comment effects carry the fully built comment (id and
//! timestamp) so a replay reproduces it exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{Coded, ErrorCode};
use crate::model::{Comment, ContentId, ParseEnumError, VoteDirection};
use crate::store::Entry;

/// Ledger-assigned command identifier, rendered `cmd-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

impl FromStr for CommandId {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("cmd-").unwrap_or(trimmed);
        digits.parse::<u64>().map(Self).map_err(|_| ParseEnumError {
            expected: "command id",
            got: s.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Pending,
    Confirmed,
    RolledBack,
}

impl CommandStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled_back",
        }
    }

    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved, replayable state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    Vote {
        target: ContentId,
        direction: VoteDirection,
    },
    Like {
        target: ContentId,
    },
    Save {
        target: ContentId,
    },
    Comment {
        parent: ContentId,
        comment: Comment,
    },
    Accept {
        question: ContentId,
        answer: ContentId,
    },
    Helpful {
        answer: ContentId,
    },
}

impl Effect {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Vote { .. } => "vote",
            Self::Like { .. } => "like",
            Self::Save { .. } => "save",
            Self::Comment { .. } => "comment",
            Self::Accept { .. } => "accept",
            Self::Helpful { .. } => "helpful",
        }
    }

    /// The id the user acted on.
    #[must_use]
    pub const fn subject(&self) -> &ContentId {
        match self {
            Self::Vote { target, .. } | Self::Like { target } | Self::Save { target } => target,
            Self::Comment { parent, .. } => parent,
            Self::Accept { answer, .. } | Self::Helpful { answer } => answer,
        }
    }
}

/// One optimistic action and its sync status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub effect: Effect,
    pub actor: String,
    pub issued_at: DateTime<Utc>,
    pub status: CommandStatus,
    /// Entries touched by the effect, as they were right before it ran.
    pub before: Vec<Entry>,
    /// Confirmed, but its effect no longer applies to the local store.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub orphaned: bool,
}

impl Command {
    /// Still part of the local state: neither rolled back nor orphaned.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status != CommandStatus::RolledBack && !self.orphaned
    }

    pub fn targets(&self) -> impl Iterator<Item = &ContentId> {
        self.before.iter().map(Entry::id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("command {0} not found")]
    NotFound(CommandId),

    #[error("command {id} is {from}; only pending commands can become {to}")]
    InvalidTransition {
        id: CommandId,
        from: CommandStatus,
        to: CommandStatus,
    },
}

impl Coded for CommandError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::CommandNotFound,
            Self::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
        }
    }
}

/// Ordered record of dispatched commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    commands: Vec<Command>,
    next_id: u64,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the id the next recorded command will get.
    pub(crate) fn allocate(&mut self) -> CommandId {
        self.next_id = self.next_id.saturating_add(1);
        CommandId(self.next_id)
    }

    /// The id [`Self::allocate`] would hand out next.
    pub(crate) const fn peek(&self) -> CommandId {
        CommandId(self.next_id.saturating_add(1))
    }

    pub(crate) fn record(
        &mut self,
        id: CommandId,
        effect: Effect,
        actor: String,
        issued_at: DateTime<Utc>,
        before: Vec<Entry>,
    ) {
        self.commands.push(Command {
            id,
            effect,
            actor,
            issued_at,
            status: CommandStatus::Pending,
            before,
            orphaned: false,
        });
    }

    #[must_use]
    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.commands.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(|c| c.status == CommandStatus::Pending)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Mark a pending command as accepted by the backend.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotFound`] for unknown ids and
    /// [`CommandError::InvalidTransition`] when the command is already settled.
    pub fn confirm(&mut self, id: CommandId) -> Result<(), CommandError> {
        self.settle(id, CommandStatus::Confirmed).map(|_| ())
    }

    /// Mark a pending command rolled back and return its position.
    ///
    /// The caller owns reverting the state; see
    /// [`crate::store::ContentStore::rollback`].
    pub(crate) fn mark_rolled_back(&mut self, id: CommandId) -> Result<usize, CommandError> {
        self.settle(id, CommandStatus::RolledBack)
    }

    fn settle(&mut self, id: CommandId, to: CommandStatus) -> Result<usize, CommandError> {
        let index = self
            .commands
            .iter()
            .position(|c| c.id == id)
            .ok_or(CommandError::NotFound(id))?;
        let command = &mut self.commands[index];
        if command.status != CommandStatus::Pending {
            return Err(CommandError::InvalidTransition {
                id,
                from: command.status,
                to,
            });
        }
        command.status = to;
        tracing::info!(command = %id, effect = command.effect.label(), status = %to, "command settled");
        Ok(index)
    }

    /// Positions of the live commands a rollback of `index` must replay.
    ///
    /// Starts from the rolled-back command's targets and walks forward,
    /// pulling in every later live command that touches the
    /// growing target set.
    pub(crate) fn replay_chain(&self, index: usize) -> Vec<usize> {
        let mut touched: Vec<ContentId> = self.commands[index].targets().cloned().collect();
        let mut chain = vec![index];
        for (offset, command) in self.commands[index + 1..].iter().enumerate() {
            if !command.is_live() {
                continue;
            }
            if command.targets().any(|t| touched.contains(t)) {
                for target in command.targets() {
                    if !touched.contains(target) {
                        touched.push(target.clone());
                    }
                }
                chain.push(index + 1 + offset);
            }
        }
        chain
    }

    pub(crate) fn command(&self, index: usize) -> &Command {
        &self.commands[index]
    }

    pub(crate) fn command_mut(&mut self, index: usize) -> &mut Command {
        &mut self.commands[index]
    }

    /// Drop settled commands that no pending rollback could need.
    ///
    /// A settled command is kept while it sits in the replay chain of some
    /// pending command, because rolling that one back replays it.
    pub fn compact(&mut self) -> usize {
        let before = self.commands.len();
        let mut keep: Vec<bool> = self.commands.iter().map(|c| !c.status.is_settled()).collect();
        for (i, command) in self.commands.iter().enumerate() {
            if command.status == CommandStatus::Pending {
                for pos in self.replay_chain(i) {
                    keep[pos] = true;
                }
            }
        }
        let mut flags = keep.into_iter();
        self.commands.retain(|_| flags.next().unwrap_or(true));
        let removed = before - self.commands.len();
        if removed > 0 {
            tracing::info!(removed, "ledger compacted");
        }
        removed
    }

    /// Forget every command. Used when the session is invalidated.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_id_round_trips_through_text() {
        let id = CommandId::new(42);
        assert_eq!(id.to_string(), "cmd-42");
        assert_eq!("cmd-42".parse::<CommandId>(), Ok(id));
        assert_eq!("42".parse::<CommandId>(), Ok(id));
        assert!("cmd-x".parse::<CommandId>().is_err());
    }

    #[test]
    fn unknown_command_is_not_found() {
        let mut ledger = Ledger::new();
        let err = ledger.confirm(CommandId::new(9)).unwrap_err();
        assert_eq!(err, CommandError::NotFound(CommandId::new(9)));
        assert_eq!(err.code(), ErrorCode::CommandNotFound);
    }

    #[test]
    fn settled_status_is_terminal() {
        let mut ledger = Ledger::new();
        let id = ledger.allocate();
        ledger.record(
            id,
            Effect::Save {
                target: ContentId::new("p-1"),
            },
            "alice".to_string(),
            DateTime::<Utc>::UNIX_EPOCH,
            Vec::new(),
        );
        ledger.confirm(id).expect("first confirm");
        let err = ledger.confirm(id).unwrap_err();
        assert!(matches!(
            err,
            CommandError::InvalidTransition {
                from: CommandStatus::Confirmed,
                to: CommandStatus::Confirmed,
                ..
            }
        ));
        assert_eq!(ledger.pending().count(), 0);
    }

    #[test]
    fn effect_serializes_with_type_tag() {
        let effect = Effect::Vote {
            target: ContentId::new("q-1"),
            direction: VoteDirection::Down,
        };
        let json = serde_json::to_value(&effect).expect("serialize");
        assert_eq!(json["type"], "vote");
        assert_eq!(json["direction"], "down");
        assert_eq!(effect.subject(), &ContentId::new("q-1"));
    }
}
