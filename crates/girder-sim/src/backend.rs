//! The sync endpoint clients push pending commands to.
//!
//! Each submitted command waits a random number of rounds and is then either
//! accepted or rejected. Delays are what make rollbacks interesting: by the
//! time a rejection lands, the client has usually stacked later gestures on
//! the same entries.

use girder_core::command::CommandId;
use serde::{Deserialize, Serialize};

use crate::client::ClientId;
use crate::rng::SimRng;

const REJECT_STATUSES: &[u16] = &[409, 422, 500, 503];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Longest a sync may wait before it is answered, in rounds.
    pub max_delay_rounds: u8,
    /// Share of syncs the backend refuses (percent, 0–100).
    pub reject_percent: u8,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            max_delay_rounds: 2,
            reject_percent: 15,
        }
    }
}

/// A command waiting for the backend's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlight {
    pub client: ClientId,
    pub command: CommandId,
    pub due_round: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Accepted,
    Rejected { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedBackend {
    config: BackendConfig,
    in_flight: Vec<InFlight>,
}

impl SimulatedBackend {
    #[must_use]
    pub const fn new(config: BackendConfig) -> Self {
        Self {
            config,
            in_flight: Vec::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> BackendConfig {
        self.config
    }

    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Queue `command` and return the round it will be answered in.
    pub fn submit(
        &mut self,
        client: ClientId,
        command: CommandId,
        round: u64,
        rng: &mut SimRng,
    ) -> u64 {
        let delay = rng.below(usize::from(self.config.max_delay_rounds) + 1);
        let due_round = round.saturating_add(u64::try_from(delay).unwrap_or(0));
        self.in_flight.push(InFlight {
            client,
            command,
            due_round,
        });
        due_round
    }

    /// Remove and return everything due by `round`, in submission order.
    pub fn ready(&mut self, round: u64) -> Vec<InFlight> {
        let (ready, waiting) = self
            .in_flight
            .drain(..)
            .partition(|f| f.due_round <= round);
        self.in_flight = waiting;
        ready
    }

    /// Remove and return everything still queued.
    pub fn drain(&mut self) -> Vec<InFlight> {
        std::mem::take(&mut self.in_flight)
    }

    /// Decide one sync.
    #[must_use]
    pub fn decide(&self, rng: &mut SimRng) -> SyncOutcome {
        if rng.percent(self.config.reject_percent) {
            let status = rng.pick(REJECT_STATUSES).copied().unwrap_or(500);
            SyncOutcome::Rejected { status }
        } else {
            SyncOutcome::Accepted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_respects_due_round_and_order() {
        let mut rng = SimRng::new(11);
        let mut backend = SimulatedBackend::new(BackendConfig {
            max_delay_rounds: 3,
            reject_percent: 0,
        });
        let mut dues = Vec::new();
        for n in 1..=6 {
            dues.push(backend.submit(0, CommandId::new(n), 0, &mut rng));
        }
        assert!(dues.iter().all(|&d| d <= 3));

        let first = backend.ready(0);
        assert!(first.iter().all(|f| f.due_round == 0));
        assert!(first.windows(2).all(|w| w[0].command < w[1].command));

        let rest = backend.drain();
        assert_eq!(first.len() + rest.len(), 6);
        assert_eq!(backend.in_flight_len(), 0);
    }

    #[test]
    fn decide_honors_reject_rate() {
        let mut rng = SimRng::new(4);
        let never = SimulatedBackend::new(BackendConfig {
            max_delay_rounds: 0,
            reject_percent: 0,
        });
        let always = SimulatedBackend::new(BackendConfig {
            max_delay_rounds: 0,
            reject_percent: 100,
        });
        for _ in 0..20 {
            assert_eq!(never.decide(&mut rng), SyncOutcome::Accepted);
            assert!(matches!(
                always.decide(&mut rng),
                SyncOutcome::Rejected { status } if REJECT_STATUSES.contains(&status)
            ));
        }
    }
}
