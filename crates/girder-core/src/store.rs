//! Normalized content store.
//!
//! One map keyed by [`ContentId`] holds every post, question, and answer a
//! client knows about. Views never keep private copies: they read through the
//! store and [`ContentStore::subscribe`] to the ids they render, so a feed
//! card and a detail page always show the same counts and flags.
//!
//! All user gestures go through [`ContentStore::dispatch`], which applies the
//! change immediately and records it in the [`Ledger`]. A later
//! [`ContentStore::rollback`] restores the touched entries and replays every
//! dependent command that came after, so the result is the same as if the
//! rolled-back gesture had never happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::answers::{AnswerError, mark_accepted_in};
use crate::command::{CommandError, CommandId, CommandStatus, Effect, Ledger};
use crate::engage::{like_in_place, save_in_place, vote_in_place};
use crate::error::{Coded, ErrorCode};
use crate::model::{
    Answer, Author, Comment, ContentId, ContentKind, Post, Question, VoteDirection,
};
use crate::thread::{DraftError, Threaded, ThreadPolicy, build_comment, find_comment_mut, insert_comment};

/// A top-level record in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Post(Post),
    Question(Question),
    Answer(Answer),
}

impl Entry {
    #[must_use]
    pub const fn id(&self) -> &ContentId {
        match self {
            Self::Post(p) => &p.id,
            Self::Question(q) => &q.id,
            Self::Answer(a) => &a.id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        match self {
            Self::Post(_) => ContentKind::Post,
            Self::Question(_) => ContentKind::Question,
            Self::Answer(_) => ContentKind::Answer,
        }
    }

    /// Comments or replies owned by this entry.
    #[must_use]
    pub fn thread(&self) -> &[Comment] {
        match self {
            Self::Post(p) => p.thread(),
            Self::Answer(a) => a.thread(),
            Self::Question(_) => &[],
        }
    }

    fn clear_actor_flags(&mut self) -> bool {
        let before = self.clone();
        match self {
            Self::Post(p) => {
                p.likes.is_liked = false;
                p.is_saved = false;
                clear_comment_flags(&mut p.comments);
            }
            Self::Question(q) => {
                q.votes.my_vote = None;
                q.is_saved = false;
            }
            Self::Answer(a) => {
                a.votes.my_vote = None;
                a.is_saved = false;
                clear_comment_flags(&mut a.replies);
            }
        }
        *self != before
    }
}

fn clear_comment_flags(thread: &mut [Comment]) {
    for comment in thread {
        comment.likes.is_liked = false;
        comment.is_saved = false;
    }
}

/// A gesture as the user expressed it, before the store resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Vote {
        target: ContentId,
        direction: VoteDirection,
    },
    /// A post or a comment.
    Like {
        target: ContentId,
    },
    /// Any entry or comment.
    Save {
        target: ContentId,
    },
    Comment {
        parent: ContentId,
        body: String,
    },
    Accept {
        question: ContentId,
        answer: ContentId,
    },
    Helpful {
        answer: ContentId,
    },
}

impl Action {
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
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("content {0} not found")]
    NotFound(ContentId),

    #[error("cannot {action} a {kind} ({id})")]
    Unsupported {
        action: &'static str,
        kind: ContentKind,
        id: ContentId,
    },

    #[error("content {0} already exists")]
    Duplicate(ContentId),

    #[error("{field} must not be empty")]
    MissingField { field: &'static str },

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Answer(#[from] AnswerError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl Coded for StoreError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::ContentNotFound,
            Self::Unsupported { .. } => ErrorCode::UnsupportedAction,
            Self::Duplicate(_) | Self::MissingField { .. } => ErrorCode::InvalidContent,
            Self::Draft(e) => e.code(),
            Self::Answer(e) => e.code(),
            Self::Command(e) => e.code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

/// Why an entry's revision moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", content = "command", rename_all = "snake_case")]
pub enum ChangeCause {
    Inserted,
    Applied(CommandId),
    RolledBack(CommandId),
    Replayed(CommandId),
    ActorStateCleared,
}

/// Queued for each subscriber of `id` whenever that entry changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeNotice {
    pub id: ContentId,
    pub revision: u64,
    pub cause: ChangeCause,
}

/// Outcome of [`ContentStore::rollback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackReport {
    pub command: CommandId,
    /// Entries put back to their pre-command state.
    pub restored: Vec<ContentId>,
    /// Later commands re-applied on top of the restored entries.
    pub replayed: Vec<CommandId>,
    /// Later pending commands that no longer apply and were rolled back
    /// with it.
    pub cascaded: Vec<CommandId>,
    /// Later confirmed commands that no longer apply. They stay confirmed
    /// and stop touching any entry; the backend has to be told about the
    /// conflict.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphaned_confirmed: Vec<CommandId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Slot {
    entry: Entry,
    revision: u64,
}

#[derive(Debug, Clone)]
struct Subscription {
    target: ContentId,
    queue: Vec<ChangeNotice>,
}

/// Where an id lives: a top-level entry, or a comment inside one.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Entry(ContentKind),
    Comment { parent: ContentId },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentStore {
    entries: BTreeMap<ContentId, Slot>,
    #[serde(default)]
    policy: ThreadPolicy,
    #[serde(default)]
    ledger: Ledger,
    #[serde(default)]
    next_revision: u64,
    #[serde(skip)]
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    #[serde(skip)]
    next_subscription: u64,
}

impl ContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(policy: ThreadPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Build a store from entries that already link to each other (answers
    /// listed in their question's `answer_ids`), such as a saved baseline.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] when two entries share an id.
    pub fn from_entries(
        entries: impl IntoIterator<Item = Entry>,
        policy: ThreadPolicy,
    ) -> Result<Self, StoreError> {
        let mut store = Self::with_policy(policy);
        for entry in entries {
            store.insert(entry)?;
        }
        Ok(store)
    }

    #[must_use]
    pub const fn policy(&self) -> &ThreadPolicy {
        &self.policy
    }

    pub const fn set_policy(&mut self, policy: ThreadPolicy) {
        self.policy = policy;
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // --- content ---------------------------------------------------------

    /// Add a post at its server baseline.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if the id is taken, [`StoreError::MissingField`]
    /// for a blank title.
    pub fn insert_post(&mut self, post: Post) -> Result<(), StoreError> {
        require("title", &post.title)?;
        self.insert(Entry::Post(post))
    }

    /// Add a question at its server baseline.
    ///
    /// # Errors
    ///
    /// Same as [`Self::insert_post`].
    pub fn insert_question(&mut self, question: Question) -> Result<(), StoreError> {
        require("title", &question.title)?;
        self.insert(Entry::Question(question))
    }

    /// Add an answer and link it to its question.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the question is unknown; the usual
    /// insert errors otherwise.
    pub fn insert_answer(&mut self, answer: Answer) -> Result<(), StoreError> {
        require("body", &answer.body)?;
        let question_id = answer.question_id.clone();
        if self.question(&question_id).is_none() {
            return Err(StoreError::NotFound(question_id));
        }
        let answer_id = answer.id.clone();
        self.insert(Entry::Answer(answer))?;
        if let Some(Slot {
            entry: Entry::Question(q),
            ..
        }) = self.entries.get_mut(&question_id)
        {
            q.answer_ids.push(answer_id);
        }
        self.touch(&question_id, ChangeCause::Inserted);
        Ok(())
    }

    fn insert(&mut self, entry: Entry) -> Result<(), StoreError> {
        let id = entry.id().clone();
        if self.entries.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        debug!(%id, kind = %entry.kind(), "entry inserted");
        self.entries.insert(id.clone(), Slot { entry, revision: 0 });
        self.touch(&id, ChangeCause::Inserted);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &ContentId) -> Option<&Entry> {
        self.entries.get(id).map(|slot| &slot.entry)
    }

    #[must_use]
    pub fn revision(&self, id: &ContentId) -> Option<u64> {
        self.entries.get(id).map(|slot| slot.revision)
    }

    #[must_use]
    pub fn post(&self, id: &ContentId) -> Option<&Post> {
        match self.get(id)? {
            Entry::Post(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn question(&self, id: &ContentId) -> Option<&Question> {
        match self.get(id)? {
            Entry::Question(q) => Some(q),
            _ => None,
        }
    }

    #[must_use]
    pub fn answer(&self, id: &ContentId) -> Option<&Answer> {
        match self.get(id)? {
            Entry::Answer(a) => Some(a),
            _ => None,
        }
    }

    /// Answers to `question` in the order they were posted.
    #[must_use]
    pub fn answers_for(&self, question: &ContentId) -> Vec<&Answer> {
        self.question(question)
            .map(|q| q.answer_ids.iter().filter_map(|id| self.answer(id)).collect())
            .unwrap_or_default()
    }

    /// Look up a comment anywhere in the store, with its parent's id.
    #[must_use]
    pub fn comment(&self, id: &ContentId) -> Option<(&ContentId, &Comment)> {
        self.entries.values().find_map(|slot| {
            slot.entry
                .thread()
                .iter()
                .find(|c| &c.id == id)
                .map(|c| (slot.entry.id(), c))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values().map(|slot| &slot.entry)
    }

    // --- subscriptions ---------------------------------------------------

    /// Watch an entry for changes.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when `id` is not a top-level entry.
    pub fn subscribe(&mut self, id: &ContentId) -> Result<SubscriptionId, StoreError> {
        if !self.entries.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        self.next_subscription += 1;
        let sub = SubscriptionId(self.next_subscription);
        self.subscriptions.insert(
            sub,
            Subscription {
                target: id.clone(),
                queue: Vec::new(),
            },
        );
        Ok(sub)
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&mut self, sub: SubscriptionId) -> bool {
        self.subscriptions.remove(&sub).is_some()
    }

    /// Drain the notices queued for `sub` since the last call.
    pub fn take_notices(&mut self, sub: SubscriptionId) -> Vec<ChangeNotice> {
        self.subscriptions
            .get_mut(&sub)
            .map(|s| std::mem::take(&mut s.queue))
            .unwrap_or_default()
    }

    fn touch(&mut self, id: &ContentId, cause: ChangeCause) {
        let Some(slot) = self.entries.get_mut(id) else {
            return;
        };
        self.next_revision += 1;
        slot.revision = self.next_revision;
        let notice = ChangeNotice {
            id: id.clone(),
            revision: self.next_revision,
            cause,
        };
        for sub in self.subscriptions.values_mut() {
            if &sub.target == id {
                sub.queue.push(notice.clone());
            }
        }
    }

    // --- gestures --------------------------------------------------------

    /// Apply `action` optimistically and record it as a pending command.
    ///
    /// # Errors
    ///
    /// Validation and lookup failures are returned before anything changes:
    /// [`StoreError::NotFound`], [`StoreError::Unsupported`],
    /// [`StoreError::Draft`], [`StoreError::Answer`].
    pub fn dispatch(
        &mut self,
        action: Action,
        author: &Author,
        now: DateTime<Utc>,
    ) -> Result<CommandId, StoreError> {
        self.dispatch_effect(action, author, now).map(|(id, _)| id)
    }

    /// [`Self::dispatch`], also handing back the resolved effect (a comment
    /// effect carries the new comment's id).
    ///
    /// # Errors
    ///
    /// Same as [`Self::dispatch`].
    pub fn dispatch_effect(
        &mut self,
        action: Action,
        author: &Author,
        now: DateTime<Utc>,
    ) -> Result<(CommandId, Effect), StoreError> {
        let effect = self.resolve(action, author, now)?;
        let targets = self.effect_targets(&effect)?;
        let before = self.snapshot(&targets);
        self.apply_effect(&effect)?;

        let id = self.ledger.allocate();
        for target in &targets {
            self.touch(target, ChangeCause::Applied(id));
        }
        debug!(command = %id, effect = effect.label(), subject = %effect.subject(), "dispatched");
        self.ledger
            .record(id, effect.clone(), author.actor.clone(), now, before);
        Ok((id, effect))
    }

    /// Mark a pending command as synced.
    ///
    /// # Errors
    ///
    /// [`StoreError::Command`] for unknown or already settled commands.
    pub fn confirm(&mut self, id: CommandId) -> Result<(), StoreError> {
        Ok(self.ledger.confirm(id)?)
    }

    /// Revert a pending command.
    ///
    /// Every entry the command touched goes back to its state right before
    /// the command ran, then each later command that depends on those
    /// entries is replayed in dispatch order. Commands that can no longer be
    /// applied (a like on a comment that was just removed) are rolled back
    /// too and listed in [`RollbackReport::cascaded`]. Confirmed ones keep
    /// their status and are listed in [`RollbackReport::orphaned_confirmed`].
    ///
    /// # Errors
    ///
    /// [`StoreError::Command`] for unknown or already settled commands; the
    /// store is unchanged in that case.
    pub fn rollback(&mut self, id: CommandId) -> Result<RollbackReport, StoreError> {
        let index = self.ledger.mark_rolled_back(id)?;
        let chain = self.ledger.replay_chain(index);

        let mut snapshots: Vec<Entry> = Vec::new();
        for &pos in &chain {
            for entry in &self.ledger.command(pos).before {
                if !snapshots.iter().any(|s| s.id() == entry.id()) {
                    snapshots.push(entry.clone());
                }
            }
        }

        let mut report = RollbackReport {
            command: id,
            restored: Vec::with_capacity(snapshots.len()),
            replayed: Vec::new(),
            cascaded: Vec::new(),
            orphaned_confirmed: Vec::new(),
        };
        for mut entry in snapshots {
            let entry_id = entry.id().clone();
            if let Some(slot) = self.entries.get_mut(&entry_id) {
                // Answers are linked outside the ledger; keep the live list.
                if let (Entry::Question(restored), Entry::Question(live)) =
                    (&mut entry, &slot.entry)
                {
                    restored.answer_ids.clone_from(&live.answer_ids);
                }
                slot.entry = entry;
                self.touch(&entry_id, ChangeCause::RolledBack(id));
                report.restored.push(entry_id);
            }
        }

        for &pos in chain.iter().skip(1) {
            let command_id = self.ledger.command(pos).id;
            let effect = self.ledger.command(pos).effect.clone();
            match self.replay(&effect) {
                Ok((targets, before)) => {
                    self.ledger.command_mut(pos).before = before;
                    for target in &targets {
                        self.touch(target, ChangeCause::Replayed(command_id));
                    }
                    report.replayed.push(command_id);
                }
                Err(err) => {
                    let command = self.ledger.command_mut(pos);
                    command.before.clear();
                    if command.status == CommandStatus::Confirmed {
                        warn!(command = %command_id, error = %err, "confirmed command no longer applies");
                        command.orphaned = true;
                        report.orphaned_confirmed.push(command_id);
                    } else {
                        warn!(command = %command_id, error = %err, "dependent command no longer applies; rolling it back");
                        command.status = CommandStatus::RolledBack;
                        report.cascaded.push(command_id);
                    }
                }
            }
        }

        info!(
            command = %id,
            restored = report.restored.len(),
            replayed = report.replayed.len(),
            cascaded = report.cascaded.len(),
            "command rolled back"
        );
        Ok(report)
    }

    /// Drop settled commands no pending rollback could need.
    pub fn compact(&mut self) -> usize {
        self.ledger.compact()
    }

    /// Reset every actor flag (votes, likes, saves) while keeping public
    /// counts, accepted and helpful marks, and comment threads.
    ///
    /// The ledger is discarded as well: its snapshots carry the old actor's
    /// flags and replaying them would bring those flags back.
    pub fn clear_actor_state(&mut self) {
        let changed: Vec<ContentId> = self
            .entries
            .values_mut()
            .filter_map(|slot| {
                slot.entry
                    .clear_actor_flags()
                    .then(|| slot.entry.id().clone())
            })
            .collect();
        for id in &changed {
            self.touch(id, ChangeCause::ActorStateCleared);
        }
        let dropped = self.ledger.len();
        self.ledger.clear();
        info!(entries = changed.len(), commands = dropped, "actor state cleared");
    }

    /// Apply an already resolved effect without recording it.
    ///
    /// Rebuilding a baseline with the live effects of a ledger must land on
    /// the same entries the store holds.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Unsupported`] when the
    /// effect no longer fits the entries.
    pub fn replay_effect(&mut self, effect: &Effect) -> Result<(), StoreError> {
        self.replay(effect).map(|_| ())
    }

    // --- internals -------------------------------------------------------

    fn locate(&self, id: &ContentId) -> Option<Location> {
        if let Some(entry) = self.get(id) {
            return Some(Location::Entry(entry.kind()));
        }
        self.comment(id).map(|(parent, _)| Location::Comment {
            parent: parent.clone(),
        })
    }

    fn kind_of(&self, id: &ContentId) -> Result<ContentKind, StoreError> {
        match self.locate(id) {
            Some(Location::Entry(kind)) => Ok(kind),
            Some(Location::Comment { .. }) => Ok(ContentKind::Comment),
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    fn resolve(
        &self,
        action: Action,
        author: &Author,
        now: DateTime<Utc>,
    ) -> Result<Effect, StoreError> {
        let label = action.label();
        let expect = |id: &ContentId, allowed: &[ContentKind]| -> Result<(), StoreError> {
            let kind = self.kind_of(id)?;
            if allowed.contains(&kind) {
                Ok(())
            } else {
                Err(StoreError::Unsupported {
                    action: label,
                    kind,
                    id: id.clone(),
                })
            }
        };

        match action {
            Action::Vote { target, direction } => {
                expect(&target, &[ContentKind::Question, ContentKind::Answer])?;
                Ok(Effect::Vote { target, direction })
            }
            Action::Like { target } => {
                expect(&target, &[ContentKind::Post, ContentKind::Comment])?;
                Ok(Effect::Like { target })
            }
            Action::Save { target } => {
                expect(
                    &target,
                    &[
                        ContentKind::Post,
                        ContentKind::Question,
                        ContentKind::Answer,
                        ContentKind::Comment,
                    ],
                )?;
                Ok(Effect::Save { target })
            }
            Action::Comment { parent, body } => {
                expect(&parent, &[ContentKind::Post, ContentKind::Answer])?;
                let salt = self.ledger.peek().to_string();
                let comment = build_comment(&parent, &body, author, now, &salt, &self.policy)?;
                Ok(Effect::Comment { parent, comment })
            }
            Action::Accept { question, answer } => {
                expect(&question, &[ContentKind::Question])?;
                if !self.answers_for(&question).iter().any(|a| a.id == answer) {
                    return Err(AnswerError::NotFound(answer).into());
                }
                Ok(Effect::Accept { question, answer })
            }
            Action::Helpful { answer } => {
                expect(&answer, &[ContentKind::Answer])?;
                Ok(Effect::Helpful { answer })
            }
        }
    }

    /// Top-level entries an effect writes to.
    fn effect_targets(&self, effect: &Effect) -> Result<Vec<ContentId>, StoreError> {
        let single = |id: &ContentId| {
            if self.entries.contains_key(id) {
                Ok(vec![id.clone()])
            } else {
                Err(StoreError::NotFound(id.clone()))
            }
        };
        match effect {
            Effect::Vote { target, .. } => single(target),
            Effect::Helpful { answer } => single(answer),
            Effect::Comment { parent, .. } => single(parent),
            Effect::Like { target } | Effect::Save { target } => match self.locate(target) {
                Some(Location::Entry(_)) => Ok(vec![target.clone()]),
                Some(Location::Comment { parent }) => Ok(vec![parent]),
                None => Err(StoreError::NotFound(target.clone())),
            },
            Effect::Accept { question, .. } => Ok(self
                .answers_for(question)
                .iter()
                .map(|a| a.id.clone())
                .collect()),
        }
    }

    fn snapshot(&self, ids: &[ContentId]) -> Vec<Entry> {
        ids.iter().filter_map(|id| self.get(id).cloned()).collect()
    }

    fn replay(&mut self, effect: &Effect) -> Result<(Vec<ContentId>, Vec<Entry>), StoreError> {
        let targets = self.effect_targets(effect)?;
        let before = self.snapshot(&targets);
        self.apply_effect(effect)?;
        Ok((targets, before))
    }

    fn apply_effect(&mut self, effect: &Effect) -> Result<(), StoreError> {
        let policy = self.policy;
        match effect {
            Effect::Vote { target, direction } => match self.entry_mut(target)? {
                Entry::Question(q) => vote_in_place(q, *direction),
                Entry::Answer(a) => vote_in_place(a, *direction),
                Entry::Post(_) => return Err(unsupported("vote", ContentKind::Post, target)),
            },
            Effect::Like { target } => match self.locate(target) {
                Some(Location::Entry(ContentKind::Post)) => {
                    if let Entry::Post(p) = self.entry_mut(target)? {
                        like_in_place(p);
                    }
                }
                Some(Location::Comment { parent }) => {
                    let comment = self
                        .comment_mut(&parent, target)
                        .ok_or_else(|| StoreError::NotFound(target.clone()))?;
                    like_in_place(comment);
                }
                Some(Location::Entry(kind)) => return Err(unsupported("like", kind, target)),
                None => return Err(StoreError::NotFound(target.clone())),
            },
            Effect::Save { target } => match self.locate(target) {
                Some(Location::Comment { parent }) => {
                    let comment = self
                        .comment_mut(&parent, target)
                        .ok_or_else(|| StoreError::NotFound(target.clone()))?;
                    save_in_place(comment);
                }
                Some(Location::Entry(_)) => match self.entry_mut(target)? {
                    Entry::Post(p) => save_in_place(p),
                    Entry::Question(q) => save_in_place(q),
                    Entry::Answer(a) => save_in_place(a),
                },
                None => return Err(StoreError::NotFound(target.clone())),
            },
            Effect::Comment { parent, comment } => match self.entry_mut(parent)? {
                Entry::Post(p) => insert_comment(p, comment.clone(), policy.order_for(Post::KIND)),
                Entry::Answer(a) => {
                    insert_comment(a, comment.clone(), policy.order_for(Answer::KIND));
                }
                Entry::Question(_) => {
                    return Err(unsupported("comment", ContentKind::Question, parent));
                }
            },
            Effect::Accept { question, answer } => {
                let answers = self.entries.values_mut().filter_map(|slot| match &mut slot.entry {
                    Entry::Answer(a) if &a.question_id == question => Some(a),
                    _ => None,
                });
                mark_accepted_in(answers, answer)?;
            }
            Effect::Helpful { answer } => match self.entry_mut(answer)? {
                Entry::Answer(a) => {
                    a.is_helpful = !a.is_helpful;
                    debug!(answer = %a.id, helpful = a.is_helpful, "helpful toggled");
                }
                other => return Err(unsupported("helpful", other.kind(), answer)),
            },
        }
        Ok(())
    }

    fn entry_mut(&mut self, id: &ContentId) -> Result<&mut Entry, StoreError> {
        self.entries
            .get_mut(id)
            .map(|slot| &mut slot.entry)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn comment_mut(&mut self, parent: &ContentId, id: &ContentId) -> Option<&mut Comment> {
        match &mut self.entries.get_mut(parent)?.entry {
            Entry::Post(p) => find_comment_mut(&mut p.comments, id),
            Entry::Answer(a) => find_comment_mut(&mut a.replies, id),
            Entry::Question(_) => None,
        }
    }
}

fn unsupported(action: &'static str, kind: ContentKind, id: &ContentId) -> StoreError {
    StoreError::Unsupported {
        action,
        kind,
        id: id.clone(),
    }
}

fn require(field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        Err(StoreError::MissingField { field })
    } else {
        Ok(())
    }
}
