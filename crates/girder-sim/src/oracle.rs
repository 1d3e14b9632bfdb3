use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use girder_core::command::{CommandId, CommandStatus, Effect};
use girder_core::model::{ContentId, VoteDirection};
use girder_core::store::{ContentStore, Entry, StoreError};
use girder_core::thread::ThreadPolicy;
use serde::Serialize;

use crate::client::{ClientId, ClientState};

// ── Core result types ─────────────────────────────────────────────────────────

/// Outcome of one or more invariant checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    pub passed: bool,
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    #[must_use]
    const fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    #[must_use]
    fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
        }
    }

    /// Failures accumulate.
    #[must_use]
    pub(crate) fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self
    }
}

// ── Invariant violation diagnostics ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The actor's own vote or like is set but the matching counter is zero.
    ActorUnitMissing {
        client: ClientId,
        id: ContentId,
        facet: &'static str,
    },

    /// More than one answer of a question is marked accepted.
    MultipleAccepted {
        client: ClientId,
        question: ContentId,
        accepted: Vec<ContentId>,
    },

    /// `comment_count` / `reply_count` disagrees with the thread.
    ThreadCountMismatch {
        client: ClientId,
        parent: ContentId,
        count: u32,
        len: usize,
    },

    /// Replaying the live ledger over the baseline does not reproduce the
    /// store.
    LedgerReplay {
        client: ClientId,
        differing: Vec<ContentId>,
        error: Option<String>,
    },

    /// Rolling back every pending command left something other than the
    /// baseline plus the confirmed commands.
    RollbackResidue {
        client: ClientId,
        differing: Vec<ContentId>,
        error: Option<String>,
    },

    /// Rolling back every pending command gave a different store once the
    /// ledger had been compacted.
    CompactionLoss {
        client: ClientId,
        differing: Vec<ContentId>,
        error: Option<String>,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActorUnitMissing { client, id, facet } => {
                write!(f, "ActorUnitMissing: client {client} has its own {facet} on {id} but the counter is 0")
            }
            Self::MultipleAccepted {
                client,
                question,
                accepted,
            } => write!(
                f,
                "MultipleAccepted: client {client} question {question} has {} accepted answers",
                accepted.len()
            ),
            Self::ThreadCountMismatch {
                client,
                parent,
                count,
                len,
            } => write!(
                f,
                "ThreadCountMismatch: client {client} {parent} counts {count} but holds {len}"
            ),
            Self::LedgerReplay {
                client,
                differing,
                error,
            } => write!(
                f,
                "LedgerReplay: client {client} differs on {} entries{}",
                differing.len(),
                error.as_ref().map(|e| format!(" ({e})")).unwrap_or_default()
            ),
            Self::RollbackResidue {
                client,
                differing,
                error,
            } => write!(
                f,
                "RollbackResidue: client {client} differs on {} entries{}",
                differing.len(),
                error.as_ref().map(|e| format!(" ({e})")).unwrap_or_default()
            ),
            Self::CompactionLoss {
                client,
                differing,
                error,
            } => write!(
                f,
                "CompactionLoss: client {client} differs on {} entries{}",
                differing.len(),
                error.as_ref().map(|e| format!(" ({e})")).unwrap_or_default()
            ),
        }
    }
}

// ── Divergence (reported, not a violation) ───────────────────────────────────

/// Where clients' public counts disagree.
///
/// Every client only sees its own optimistic gestures, so disagreement is the
/// expected outcome. It is reported to show how far views drift before a
/// refetch, never treated as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DivergenceReport {
    pub diverged: bool,
    pub divergent_entries: Vec<ContentId>,
}

impl DivergenceReport {
    #[must_use]
    pub fn evaluate(states: &[ClientState]) -> Self {
        let mut views: BTreeMap<ContentId, BTreeSet<[u32; 4]>> = BTreeMap::new();
        for state in states {
            for entry in state.store.iter() {
                views
                    .entry(entry.id().clone())
                    .or_default()
                    .insert(public_counts(entry));
            }
        }
        let divergent_entries: Vec<ContentId> = views
            .into_iter()
            .filter(|(_, seen)| seen.len() > 1)
            .map(|(id, _)| id)
            .collect();
        Self {
            diverged: !divergent_entries.is_empty(),
            divergent_entries,
        }
    }
}

fn public_counts(entry: &Entry) -> [u32; 4] {
    match entry {
        Entry::Post(p) => [p.likes.like_count, p.comment_count, 0, 0],
        Entry::Question(q) => [q.votes.upvotes, q.votes.downvotes, 0, 0],
        Entry::Answer(a) => [
            a.votes.upvotes,
            a.votes.downvotes,
            a.reply_count,
            u32::from(a.is_accepted),
        ],
    }
}

// ── Oracle ───────────────────────────────────────────────────────────────────

/// Checks that hold for every client at every point of a run.
pub struct EngagementOracle;

impl EngagementOracle {
    /// A set vote or like implies at least one unit in its counter.
    #[must_use]
    pub fn check_actor_units(state: &ClientState) -> OracleResult {
        let mut violations = Vec::new();
        let mut missing = |id: &ContentId, facet: &'static str| {
            violations.push(InvariantViolation::ActorUnitMissing {
                client: state.client,
                id: id.clone(),
                facet,
            });
        };
        for entry in state.store.iter() {
            let votes = match entry {
                Entry::Question(q) => Some(q.votes),
                Entry::Answer(a) => Some(a.votes),
                Entry::Post(_) => None,
            };
            if let Some(votes) = votes {
                match votes.my_vote {
                    Some(VoteDirection::Up) if votes.upvotes == 0 => missing(entry.id(), "upvote"),
                    Some(VoteDirection::Down) if votes.downvotes == 0 => {
                        missing(entry.id(), "downvote");
                    }
                    _ => {}
                }
            }
            if let Entry::Post(p) = entry {
                if p.likes.is_liked && p.likes.like_count == 0 {
                    missing(&p.id, "like");
                }
            }
            for comment in entry.thread() {
                if comment.likes.is_liked && comment.likes.like_count == 0 {
                    missing(&comment.id, "like");
                }
            }
        }
        OracleResult::from_violations(violations)
    }

    #[must_use]
    pub fn check_single_acceptance(state: &ClientState) -> OracleResult {
        let mut accepted: BTreeMap<&ContentId, Vec<ContentId>> = BTreeMap::new();
        for entry in state.store.iter() {
            match entry {
                Entry::Answer(a) if a.is_accepted => {
                    accepted.entry(&a.question_id).or_default().push(a.id.clone());
                }
                _ => {}
            }
        }
        OracleResult::from_violations(
            accepted
                .into_iter()
                .filter(|(_, ids)| ids.len() > 1)
                .map(|(question, ids)| InvariantViolation::MultipleAccepted {
                    client: state.client,
                    question: question.clone(),
                    accepted: ids,
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn check_thread_counts(state: &ClientState) -> OracleResult {
        let violations = state
            .store
            .iter()
            .filter_map(|entry| {
                let count = match entry {
                    Entry::Post(p) => p.comment_count,
                    Entry::Answer(a) => a.reply_count,
                    Entry::Question(_) => return None,
                };
                let len = entry.thread().len();
                (usize::try_from(count).ok() != Some(len)).then(|| {
                    InvariantViolation::ThreadCountMismatch {
                        client: state.client,
                        parent: entry.id().clone(),
                        count,
                        len,
                    }
                })
            })
            .collect();
        OracleResult::from_violations(violations)
    }

    /// The store equals the baseline with every live command applied in order.
    #[must_use]
    pub fn check_ledger_replay(state: &ClientState) -> OracleResult {
        let live = state
            .ledger()
            .iter()
            .filter(|c| c.is_live())
            .map(|c| &c.effect);
        let actual = state.entries();
        match rebuild(&state.baseline, live) {
            Ok(expected) => {
                let differing = differing_ids(&expected, &actual);
                OracleResult::from_violations(
                    (!differing.is_empty())
                        .then(|| InvariantViolation::LedgerReplay {
                            client: state.client,
                            differing,
                            error: None,
                        })
                        .into_iter()
                        .collect(),
                )
            }
            Err(err) => OracleResult::from_violations(vec![InvariantViolation::LedgerReplay {
                client: state.client,
                differing: Vec::new(),
                error: Some(err.to_string()),
            }]),
        }
    }

    /// Roll back every pending command on a copy of the store; what is left
    /// must be the baseline plus the confirmed commands.
    #[must_use]
    pub fn check_full_rollback(state: &ClientState) -> OracleResult {
        let residue = |differing: Vec<ContentId>, error: Option<String>| {
            OracleResult::from_violations(vec![InvariantViolation::RollbackResidue {
                client: state.client,
                differing,
                error,
            }])
        };

        let store = match roll_back_pending(state.store.clone()) {
            Ok(store) => store,
            Err(err) => return residue(Vec::new(), Some(err)),
        };

        let confirmed = store
            .ledger()
            .iter()
            .filter(|c| c.status == CommandStatus::Confirmed && !c.orphaned)
            .map(|c| &c.effect);
        match rebuild(&state.baseline, confirmed) {
            Ok(expected) => {
                let actual: Vec<Entry> = store.iter().cloned().collect();
                let differing = differing_ids(&expected, &actual);
                if differing.is_empty() {
                    OracleResult::pass()
                } else {
                    residue(differing, None)
                }
            }
            Err(err) => residue(Vec::new(), Some(err.to_string())),
        }
    }

    /// Compacting first must not change what a full rollback leaves behind.
    #[must_use]
    pub fn check_compaction(state: &ClientState) -> OracleResult {
        let loss = |differing: Vec<ContentId>, error: Option<String>| {
            OracleResult::from_violations(vec![InvariantViolation::CompactionLoss {
                client: state.client,
                differing,
                error,
            }])
        };

        let mut compacted = state.store.clone();
        compacted.compact();
        match (
            roll_back_pending(state.store.clone()),
            roll_back_pending(compacted),
        ) {
            (Ok(expected), Ok(actual)) => {
                let expected: Vec<Entry> = expected.iter().cloned().collect();
                let actual: Vec<Entry> = actual.iter().cloned().collect();
                let differing = differing_ids(&expected, &actual);
                if differing.is_empty() {
                    OracleResult::pass()
                } else {
                    loss(differing, None)
                }
            }
            (Err(err), _) | (_, Err(err)) => loss(Vec::new(), Some(err)),
        }
    }

    #[must_use]
    pub fn check_state(state: &ClientState) -> OracleResult {
        Self::check_actor_units(state)
            .merge(Self::check_single_acceptance(state))
            .merge(Self::check_thread_counts(state))
            .merge(Self::check_ledger_replay(state))
            .merge(Self::check_full_rollback(state))
            .merge(Self::check_compaction(state))
    }

    #[must_use]
    pub fn check_all(states: &[ClientState]) -> OracleResult {
        states
            .iter()
            .map(Self::check_state)
            .fold(OracleResult::pass(), OracleResult::merge)
    }
}

fn rebuild<'a>(
    baseline: &[Entry],
    effects: impl IntoIterator<Item = &'a Effect>,
) -> Result<Vec<Entry>, StoreError> {
    let mut store = ContentStore::from_entries(baseline.iter().cloned(), ThreadPolicy::default())?;
    for effect in effects {
        store.replay_effect(effect)?;
    }
    Ok(store.iter().cloned().collect())
}

/// Roll back every pending command, newest first.
fn roll_back_pending(mut store: ContentStore) -> Result<ContentStore, String> {
    let pending: Vec<CommandId> = store.ledger().pending().map(|c| c.id).collect();
    for id in pending.into_iter().rev() {
        let still_pending = store
            .ledger()
            .get(id)
            .is_some_and(|c| c.status == CommandStatus::Pending);
        if still_pending {
            store.rollback(id).map_err(|err| err.to_string())?;
        }
    }
    if store.ledger().pending().next().is_some() {
        return Err("commands still pending".to_string());
    }
    Ok(store)
}

fn differing_ids(expected: &[Entry], actual: &[Entry]) -> Vec<ContentId> {
    let expected: BTreeMap<&ContentId, &Entry> = expected.iter().map(|e| (e.id(), e)).collect();
    let actual: BTreeMap<&ContentId, &Entry> = actual.iter().map(|e| (e.id(), e)).collect();
    let ids: BTreeSet<&ContentId> = expected.keys().chain(actual.keys()).copied().collect();
    ids.into_iter()
        .filter(|id| expected.get(id) != actual.get(id))
        .cloned()
        .collect()
}
