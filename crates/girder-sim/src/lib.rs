//! girder-sim library.
//!
//! Deterministic simulation of several clients working on the same feed.
//! Every client dispatches optimistic gestures into its own store; a
//! simulated backend answers each sync after a random delay, and rejected
//! commands are rolled back while later gestures are still pending. The
//! oracle then checks each client's store against its ledger.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod backend;
pub mod campaign;
pub mod client;
pub mod oracle;
pub mod rng;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Duration, TimeZone, Utc};
use girder_core::command::CommandId;
use girder_core::model::{
    Answer, Author, Comment, ContentId, LikeTally, Post, Question, VoteTally,
};
use girder_core::store::{ContentStore, Entry, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{BackendConfig, InFlight, SimulatedBackend, SyncOutcome};
use crate::client::{ClientId, ClientState, Settlement, SimulatedClient};
use crate::oracle::DivergenceReport;
use crate::rng::SimRng;

const EPOCH_SECS: i64 = 1_700_000_000;
const ROUND_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub seed: u64,
    pub client_count: usize,
    pub rounds: u64,
    /// Answers under the single seeded question.
    pub answers: usize,
    pub backend: BackendConfig,
    /// Chance per client per round that its session is forcibly ended.
    pub expire_percent: u8,
    /// Token lifetime; each round advances the clock by one minute.
    pub session_ttl_minutes: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            client_count: 3,
            rounds: 24,
            answers: 3,
            backend: BackendConfig::default(),
            expire_percent: 2,
            session_ttl_minutes: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    pub round: u64,
    pub client: ClientId,
    pub kind: TraceEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEventKind {
    Dispatched {
        command: CommandId,
        action: String,
        due_round: u64,
    },
    Refused {
        action: String,
        reason: String,
    },
    Confirmed {
        command: CommandId,
    },
    RolledBack {
        command: CommandId,
        status: u16,
        replayed: usize,
        cascaded: usize,
    },
    Stale {
        command: CommandId,
    },
    SessionEnded {
        dropped_commands: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub seed: u64,
    pub trace: Vec<TraceEvent>,
    pub baseline: Vec<Entry>,
    /// Client states halfway through, while syncs are still in flight.
    pub midpoint: Vec<ClientState>,
    /// Client states after every sync has been answered.
    pub states: Vec<ClientState>,
    pub divergence: DivergenceReport,
    /// A rollback had to replay or cascade later commands.
    pub interesting_state_reached: bool,
}

impl SimulationResult {
    /// Short digest of the trace and final states, for comparing replays.
    ///
    /// # Errors
    ///
    /// Serialization failures.
    pub fn fingerprint(&self) -> Result<String> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&serde_json::to_vec(&self.trace).context("encode trace")?);
        hasher.update(&serde_json::to_vec(&self.states).context("encode states")?);
        Ok(hasher.finalize().to_hex().as_str()[..16].to_string())
    }

    #[must_use]
    pub fn count(&self, pick: impl Fn(&TraceEventKind) -> bool) -> usize {
        self.trace.iter().filter(|e| pick(&e.kind)).count()
    }
}

pub struct Simulator {
    config: SimulationConfig,
    rng: SimRng,
    epoch: DateTime<Utc>,
    baseline: Vec<Entry>,
    clients: Vec<SimulatedClient>,
    backend: SimulatedBackend,
    trace: Vec<TraceEvent>,
    interesting: bool,
}

impl Simulator {
    /// # Errors
    ///
    /// Invalid config, or a baseline that cannot be loaded.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        if config.client_count == 0 {
            bail!("client_count must be > 0");
        }
        if config.session_ttl_minutes <= 0 {
            bail!("session_ttl_minutes must be > 0");
        }
        let epoch = Utc
            .timestamp_opt(EPOCH_SECS, 0)
            .single()
            .ok_or_else(|| anyhow!("invalid simulation epoch"))?;

        let mut rng = SimRng::new(config.seed);
        let baseline = seed_baseline(&mut rng, config.answers, epoch)?;
        let ttl = Duration::minutes(config.session_ttl_minutes);
        let clients = (0..config.client_count)
            .map(|id| SimulatedClient::new(id, &baseline, epoch, ttl))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            rng,
            epoch,
            baseline,
            clients,
            backend: SimulatedBackend::new(config.backend),
            trace: Vec::new(),
            interesting: false,
        })
    }

    /// # Errors
    ///
    /// Only unexpected store failures; rejected syncs are part of the run.
    pub fn run(&mut self) -> Result<SimulationResult> {
        info!(seed = self.config.seed, clients = self.clients.len(), rounds = self.config.rounds, "simulation started");
        let midpoint_round = (self.config.rounds / 2).max(1);
        let mut midpoint = Vec::new();

        for round in 0..self.config.rounds {
            self.step(round)?;
            if round + 1 == midpoint_round {
                midpoint = self.snapshots();
            }
        }

        let final_round = self.config.rounds;
        for in_flight in self.backend.drain() {
            self.settle(in_flight, final_round)?;
        }

        let states = self.snapshots();
        let divergence = DivergenceReport::evaluate(&states);
        info!(
            seed = self.config.seed,
            events = self.trace.len(),
            diverged = divergence.diverged,
            interesting = self.interesting,
            "simulation finished"
        );

        Ok(SimulationResult {
            seed: self.config.seed,
            trace: std::mem::take(&mut self.trace),
            baseline: self.baseline.clone(),
            midpoint,
            states,
            divergence,
            interesting_state_reached: self.interesting,
        })
    }

    fn step(&mut self, round: u64) -> Result<()> {
        for idx in 0..self.clients.len() {
            let now = self.clock(round, idx);
            let client = self
                .clients
                .get_mut(idx)
                .ok_or_else(|| anyhow!("unknown client {idx}"))?;

            if !client.is_signed_in(now) || self.rng.percent(self.config.expire_percent) {
                let dropped_commands = client.expire_session(now);
                self.trace.push(TraceEvent {
                    round,
                    client: idx,
                    kind: TraceEventKind::SessionEnded { dropped_commands },
                });
                continue;
            }

            let Some(action) = client.plan_gesture(&mut self.rng, round) else {
                continue;
            };
            let label = action.label().to_string();
            let kind = match client.dispatch(action, now) {
                Ok(command) => {
                    let due_round = self.backend.submit(idx, command, round, &mut self.rng);
                    TraceEventKind::Dispatched {
                        command,
                        action: label,
                        due_round,
                    }
                }
                Err(err) => TraceEventKind::Refused {
                    action: label,
                    reason: err.to_string(),
                },
            };
            self.trace.push(TraceEvent {
                round,
                client: idx,
                kind,
            });
        }

        for in_flight in self.backend.ready(round) {
            self.settle(in_flight, round)?;
        }
        Ok(())
    }

    fn settle(&mut self, in_flight: InFlight, round: u64) -> Result<()> {
        let outcome = self.backend.decide(&mut self.rng);
        let client = self
            .clients
            .get_mut(in_flight.client)
            .ok_or_else(|| anyhow!("unknown client {}", in_flight.client))?;
        let command = in_flight.command;

        let kind = match client.settle(command, outcome)? {
            Settlement::Confirmed => TraceEventKind::Confirmed { command },
            Settlement::Stale => TraceEventKind::Stale { command },
            Settlement::RolledBack(report) => {
                let status = match outcome {
                    SyncOutcome::Rejected { status } => status,
                    SyncOutcome::Accepted => 0,
                };
                if !report.replayed.is_empty()
                    || !report.cascaded.is_empty()
                    || !report.orphaned_confirmed.is_empty()
                {
                    self.interesting = true;
                }
                debug!(%command, client = in_flight.client, replayed = report.replayed.len(), cascaded = report.cascaded.len(), "sync rejected");
                TraceEventKind::RolledBack {
                    command,
                    status,
                    replayed: report.replayed.len(),
                    cascaded: report.cascaded.len(),
                }
            }
        };
        self.trace.push(TraceEvent {
            round,
            client: in_flight.client,
            kind,
        });
        Ok(())
    }

    fn clock(&self, round: u64, client: ClientId) -> DateTime<Utc> {
        let round = i64::try_from(round).unwrap_or(i64::MAX / ROUND_SECS);
        let client = i64::try_from(client).unwrap_or(0);
        self.epoch + Duration::seconds(round.saturating_mul(ROUND_SECS).saturating_add(client))
    }

    fn snapshots(&self) -> Vec<ClientState> {
        self.clients.iter().map(SimulatedClient::snapshot).collect()
    }
}

/// The shared starting feed: two news posts with one comment each and a
/// question with `answers` answers, all with random server counts.
///
/// # Errors
///
/// Store insert failures, which would mean two seeded ids collided.
pub fn seed_baseline(
    rng: &mut SimRng,
    answers: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Entry>, StoreError> {
    let mut store = ContentStore::new();

    for (i, title) in ["Tower crane lift plan, level 9", "Site diary: pour day"]
        .into_iter()
        .enumerate()
    {
        let mut post = Post::draft(Author::new("newsroom"), title, "", now);
        post.likes = LikeTally::new(count(rng, 40));
        post.comments.push(Comment {
            id: ContentId::new(format!("c-seed-{i}")),
            author: Author::new("site-lead"),
            body: "Following".to_string(),
            created_at: now,
            likes: LikeTally::new(count(rng, 5)),
            is_saved: false,
        });
        post.comment_count = 1;
        store.insert_post(post)?;
    }

    let mut question = Question::draft(
        Author::new("fay"),
        "Minimum concrete cover for footings?",
        "Cast against earth, no formwork.",
        now,
    );
    question.votes = VoteTally::new(count(rng, 20), count(rng, 5));
    let question_id = question.id.clone();
    store.insert_question(question)?;

    for i in 0..answers {
        let mut answer = Answer::draft(
            question_id.clone(),
            Author::new(format!("pro-{i}")),
            format!("{} mm, per the structural notes", 50 + 25 * i),
            now,
        );
        answer.votes = VoteTally::new(count(rng, 15), count(rng, 4));
        store.insert_answer(answer)?;
    }

    Ok(store.iter().cloned().collect())
}

fn count(rng: &mut SimRng, below: usize) -> u32 {
    u32::try_from(rng.below(below)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::EngagementOracle;

    #[test]
    fn baseline_is_seed_stable() {
        let epoch = Utc.timestamp_opt(EPOCH_SECS, 0).single().expect("ts");
        let a = seed_baseline(&mut SimRng::new(4), 3, epoch).expect("a");
        let b = seed_baseline(&mut SimRng::new(4), 3, epoch).expect("b");
        assert_eq!(a, b);
        assert_eq!(a.len(), 2 + 1 + 3);
    }

    #[test]
    fn simulation_is_deterministic() {
        let config = SimulationConfig {
            seed: 21,
            ..SimulationConfig::default()
        };
        let first = Simulator::new(config).expect("sim").run().expect("run");
        let second = Simulator::new(config).expect("sim").run().expect("run");
        assert_eq!(first.trace, second.trace);
        assert_eq!(first.states, second.states);
        assert_eq!(
            first.fingerprint().expect("fp"),
            second.fingerprint().expect("fp")
        );
    }

    #[test]
    fn every_sync_is_answered() {
        let result = Simulator::new(SimulationConfig {
            seed: 3,
            expire_percent: 0,
            session_ttl_minutes: 600,
            ..SimulationConfig::default()
        })
        .expect("sim")
        .run()
        .expect("run");

        let dispatched = result.count(|k| matches!(k, TraceEventKind::Dispatched { .. }));
        let answered = result.count(|k| {
            matches!(
                k,
                TraceEventKind::Confirmed { .. }
                    | TraceEventKind::RolledBack { .. }
                    | TraceEventKind::Stale { .. }
            )
        });
        assert!(dispatched > 0);
        assert_eq!(dispatched, answered);
        assert!(result.states.iter().all(|s| s.ledger().pending().next().is_none()));
    }

    #[test]
    fn heavy_rejection_reaches_replay_and_passes_oracle() {
        let result = Simulator::new(SimulationConfig {
            seed: 9,
            client_count: 2,
            rounds: 40,
            answers: 2,
            backend: BackendConfig {
                max_delay_rounds: 4,
                reject_percent: 60,
            },
            expire_percent: 0,
            session_ttl_minutes: 600,
        })
        .expect("sim")
        .run()
        .expect("run");

        assert!(result.count(|k| matches!(k, TraceEventKind::RolledBack { .. })) > 0);
        let mid = EngagementOracle::check_all(&result.midpoint);
        let end = EngagementOracle::check_all(&result.states);
        assert!(mid.passed, "{:?}", mid.violations);
        assert!(end.passed, "{:?}", end.violations);
    }

    #[test]
    fn zero_clients_is_rejected() {
        let err = Simulator::new(SimulationConfig {
            client_count: 0,
            ..SimulationConfig::default()
        })
        .err()
        .expect("invalid");
        assert!(err.to_string().contains("client_count"));
    }
}
