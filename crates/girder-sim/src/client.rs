//! One simulated device: a session, a local content store, and the baseline
//! its ledger is measured against.

use chrono::{DateTime, Duration, Utc};
use girder_core::command::{CommandId, CommandStatus, Ledger};
use girder_core::model::{ContentId, VoteDirection};
use girder_core::session::Session;
use girder_core::store::{Action, ContentStore, Entry, RollbackReport, StoreError};
use girder_core::thread::ThreadPolicy;
use serde::Serialize;

use crate::backend::SyncOutcome;
use crate::rng::SimRng;

pub type ClientId = usize;

const REMARKS: &[&str] = &[
    "Agreed",
    "Check the drawings first",
    "Same issue on level 3",
    "Torque to 40 Nm",
    "Photos from site attached",
];

/// What happened to a command when the backend answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Confirmed,
    RolledBack(RollbackReport),
    /// The command was no longer pending: cascaded by an earlier rollback
    /// or dropped when the session ended.
    Stale,
}

/// A client's state at one point in the run, as the oracle sees it.
#[derive(Debug, Clone, Serialize)]
pub struct ClientState {
    pub client: ClientId,
    pub actor: String,
    /// Entries as they were when the ledger was last emptied.
    pub baseline: Vec<Entry>,
    pub store: ContentStore,
}

impl ClientState {
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.store.iter().cloned().collect()
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        self.store.ledger()
    }
}

impl PartialEq for ClientState {
    fn eq(&self, other: &Self) -> bool {
        self.client == other.client
            && self.actor == other.actor
            && self.baseline == other.baseline
            && self.store.iter().eq(other.store.iter())
            && self.store.ledger() == other.store.ledger()
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedClient {
    id: ClientId,
    session: Session,
    session_ttl: Duration,
    generation: u32,
    store: ContentStore,
    baseline: Vec<Entry>,
}

impl SimulatedClient {
    /// A signed-in client whose store starts at `baseline`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if the baseline repeats an id.
    pub fn new(
        id: ClientId,
        baseline: &[Entry],
        now: DateTime<Utc>,
        session_ttl: Duration,
    ) -> Result<Self, StoreError> {
        let store = ContentStore::from_entries(baseline.iter().cloned(), ThreadPolicy::default())?;
        Ok(Self {
            id,
            session: sign_in(id, 0, now, session_ttl),
            session_ttl,
            generation: 0,
            store,
            baseline: baseline.to_vec(),
        })
    }

    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Choose a gesture against whatever the store currently holds.
    ///
    /// `None` when the chosen kind has nothing to act on this round.
    pub fn plan_gesture(&self, rng: &mut SimRng, round: u64) -> Option<Action> {
        let mut everything = Vec::new();
        let mut posts = Vec::new();
        let mut questions = Vec::new();
        let mut answers: Vec<(ContentId, ContentId)> = Vec::new();
        let mut comments = Vec::new();
        for entry in self.store.iter() {
            everything.push(entry.id().clone());
            match entry {
                Entry::Post(p) => posts.push(p.id.clone()),
                Entry::Question(q) => questions.push(q.id.clone()),
                Entry::Answer(a) => answers.push((a.id.clone(), a.question_id.clone())),
            }
            comments.extend(entry.thread().iter().map(|c| c.id.clone()));
        }

        let direction = if rng.percent(50) {
            VoteDirection::Up
        } else {
            VoteDirection::Down
        };
        match rng.below(9) {
            0 => rng.pick(&questions).map(|id| Action::Vote {
                target: id.clone(),
                direction,
            }),
            1 => rng.pick(&answers).map(|(id, _)| Action::Vote {
                target: id.clone(),
                direction,
            }),
            2 => rng.pick(&posts).map(|id| Action::Like { target: id.clone() }),
            3 => rng.pick(&comments).map(|id| Action::Like { target: id.clone() }),
            4 => rng.pick(&everything).map(|id| Action::Save { target: id.clone() }),
            5 => {
                let parent = rng.pick(&posts)?.clone();
                Some(Action::Comment {
                    parent,
                    body: remark(rng, round),
                })
            }
            6 => {
                let parent = rng.pick(&answers)?.0.clone();
                Some(Action::Comment {
                    parent,
                    body: remark(rng, round),
                })
            }
            7 => rng.pick(&answers).map(|(answer, question)| Action::Accept {
                question: question.clone(),
                answer: answer.clone(),
            }),
            _ => rng.pick(&answers).map(|(id, _)| Action::Helpful { answer: id.clone() }),
        }
    }

    /// Apply a gesture optimistically.
    ///
    /// # Errors
    ///
    /// Whatever [`ContentStore::dispatch`] rejects.
    pub fn dispatch(&mut self, action: Action, now: DateTime<Utc>) -> Result<CommandId, StoreError> {
        self.store.dispatch(action, &self.session.author(), now)
    }

    /// Apply the backend's answer for `command`.
    ///
    /// # Errors
    ///
    /// Only unexpected ledger failures; commands that are no longer pending
    /// come back as [`Settlement::Stale`].
    pub fn settle(&mut self, command: CommandId, outcome: SyncOutcome) -> Result<Settlement, StoreError> {
        let pending = self
            .store
            .ledger()
            .get(command)
            .is_some_and(|c| c.status == CommandStatus::Pending);
        if !pending {
            return Ok(Settlement::Stale);
        }
        match outcome {
            SyncOutcome::Accepted => {
                self.store.confirm(command)?;
                Ok(Settlement::Confirmed)
            }
            SyncOutcome::Rejected { .. } => Ok(Settlement::RolledBack(self.store.rollback(command)?)),
        }
    }

    /// True when the session's token is still good at `now`.
    #[must_use]
    pub fn is_signed_in(&self, now: DateTime<Utc>) -> bool {
        self.session.is_active(now)
    }

    /// End the session, drop actor state, and sign straight back in.
    ///
    /// Returns how many ledger commands were discarded.
    pub fn expire_session(&mut self, now: DateTime<Utc>) -> usize {
        let dropped = self.store.ledger().len();
        self.session.invalidate(&mut self.store);
        self.generation = self.generation.saturating_add(1);
        self.session = sign_in(self.id, self.generation, now, self.session_ttl);
        self.baseline = self.store.iter().cloned().collect();
        dropped
    }

    #[must_use]
    pub fn snapshot(&self) -> ClientState {
        ClientState {
            client: self.id,
            actor: self.session.actor.clone(),
            baseline: self.baseline.clone(),
            store: self.store.clone(),
        }
    }
}

fn sign_in(id: ClientId, generation: u32, now: DateTime<Utc>, ttl: Duration) -> Session {
    Session::login_for(
        format!("client-{id}"),
        format!("tok-{id}-{generation}"),
        now,
        ttl,
    )
}

fn remark(rng: &mut SimRng, round: u64) -> String {
    let text = rng.pick(REMARKS).copied().unwrap_or("Noted");
    format!("{text} (round {round})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_baseline;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().expect("ts")
    }

    fn client() -> SimulatedClient {
        let mut rng = SimRng::new(1);
        let baseline = seed_baseline(&mut rng, 3, start()).expect("baseline");
        SimulatedClient::new(0, &baseline, start(), Duration::minutes(30)).expect("client")
    }

    #[test]
    fn planned_gestures_dispatch_cleanly() {
        let mut client = client();
        let mut rng = SimRng::new(77);
        let mut dispatched = 0;
        for round in 0..60 {
            if let Some(action) = client.plan_gesture(&mut rng, round) {
                client
                    .dispatch(action, start() + Duration::seconds(i64::try_from(round).expect("small")))
                    .expect("planned gestures are always valid");
                dispatched += 1;
            }
        }
        assert!(dispatched > 0);
        assert_eq!(client.store().ledger().len(), dispatched);
    }

    #[test]
    fn settle_confirms_or_rolls_back_and_ignores_stale() {
        let mut client = client();
        let mut rng = SimRng::new(5);
        let action = std::iter::repeat_with(|| client.plan_gesture(&mut rng, 0))
            .flatten()
            .next()
            .expect("some gesture");
        let before: Vec<Entry> = client.store().iter().cloned().collect();
        let id = client.dispatch(action, start()).expect("dispatch");

        let settled = client
            .settle(id, SyncOutcome::Rejected { status: 503 })
            .expect("settle");
        assert!(matches!(settled, Settlement::RolledBack(_)));
        assert!(client.store().iter().eq(before.iter()));

        assert_eq!(
            client.settle(id, SyncOutcome::Accepted).expect("stale"),
            Settlement::Stale
        );
    }

    #[test]
    fn expiry_resets_baseline_and_ledger() {
        let mut client = client();
        let mut rng = SimRng::new(8);
        for round in 0..10 {
            if let Some(action) = client.plan_gesture(&mut rng, round) {
                client.dispatch(action, start()).expect("dispatch");
            }
        }
        let recorded = client.store().ledger().len();
        let dropped = client.expire_session(start() + Duration::minutes(5));
        assert_eq!(dropped, recorded);
        assert!(client.store().ledger().is_empty());
        assert!(client.is_signed_in(start() + Duration::minutes(6)));
        assert_eq!(client.snapshot().entries(), client.snapshot().baseline);
    }
}
