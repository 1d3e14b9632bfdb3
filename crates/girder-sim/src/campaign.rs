//! Campaign runner: many seeds, one report.
//!
//! Each seed is simulated once and checked by the oracle at the midpoint
//! (syncs still in flight) and at the end (every sync answered). The first
//! failing seed is kept for replay.

use std::ops::Range;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::BackendConfig;
use crate::oracle::{EngagementOracle, InvariantViolation, OracleResult};
use crate::{SimulationConfig, SimulationResult, Simulator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Seeds to run, e.g. `0..100`.
    pub seed_range: Range<u64>,
    pub client_count: usize,
    pub rounds: u64,
    pub answers: usize,
    /// Share of syncs the backend rejects (percent, 0–100).
    pub reject_percent: u8,
    /// Longest sync delay in rounds.
    pub max_delay_rounds: u8,
    /// Chance per client per round of a forced sign-out (percent, 0–100).
    pub expire_percent: u8,
    pub session_ttl_minutes: i64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        let sim = SimulationConfig::default();
        Self {
            seed_range: 0..100,
            client_count: sim.client_count,
            rounds: sim.rounds,
            answers: sim.answers,
            reject_percent: sim.backend.reject_percent,
            max_delay_rounds: sim.backend.max_delay_rounds,
            expire_percent: sim.expire_percent,
            session_ttl_minutes: sim.session_ttl_minutes,
        }
    }
}

impl CampaignConfig {
    #[must_use]
    pub const fn sim_config_for_seed(&self, seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed,
            client_count: self.client_count,
            rounds: self.rounds,
            answers: self.answers,
            backend: BackendConfig {
                max_delay_rounds: self.max_delay_rounds,
                reject_percent: self.reject_percent,
            },
            expire_percent: self.expire_percent,
            session_ttl_minutes: self.session_ttl_minutes,
        }
    }

    /// # Errors
    ///
    /// Empty seed range, zero clients or rounds, or a percentage above 100.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.client_count == 0 {
            bail!("client_count must be > 0");
        }
        if self.rounds == 0 {
            bail!("rounds must be > 0");
        }
        if self.reject_percent > 100 || self.expire_percent > 100 {
            bail!("percentages must be within 0..=100");
        }
        if self.session_ttl_minutes <= 0 {
            bail!("session_ttl_minutes must be > 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
    /// Seeds where a rollback replayed or cascaded later commands.
    pub interesting_states_reached: usize,
    /// Seeds whose clients ended with different public counts.
    pub divergent_seeds: usize,
}

impl CampaignReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One seed, replayed with everything kept.
#[derive(Debug, Clone)]
pub struct DetailedTrace {
    pub result: SimulationResult,
    pub oracle: OracleResult,
}

/// # Errors
///
/// Config validation or an unexpected simulation failure.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        first_failure: None,
        failures: Vec::new(),
        interesting_states_reached: 0,
        divergent_seeds: 0,
    };

    for seed in config.seed_range.clone() {
        let trace = simulate(seed, config)?;
        report.seeds_run += 1;
        if trace.result.interesting_state_reached {
            report.interesting_states_reached += 1;
        }
        if trace.result.divergence.diverged {
            report.divergent_seeds += 1;
        }

        if trace.oracle.passed {
            report.seeds_passed += 1;
        } else {
            warn!(seed, violations = trace.oracle.violations.len(), "seed failed");
            report.first_failure.get_or_insert(seed);
            report.failures.push(SeedFailure {
                seed,
                violations: trace.oracle.violations.iter().map(ToString::to_string).collect(),
            });
        }
    }

    Ok(report)
}

/// `Ok(Ok(()))` on pass, `Ok(Err(violations))` on failure.
///
/// # Errors
///
/// The outer error is reserved for the simulation itself failing.
pub fn run_single_seed(
    seed: u64,
    config: &CampaignConfig,
) -> Result<std::result::Result<(), Vec<InvariantViolation>>> {
    let trace = simulate(seed, config)?;
    if trace.oracle.passed {
        Ok(Ok(()))
    } else {
        Ok(Err(trace.oracle.violations))
    }
}

/// # Errors
///
/// Config validation or simulation failures.
pub fn replay_seed(seed: u64, config: &CampaignConfig) -> Result<DetailedTrace> {
    config.validate()?;
    simulate(seed, config)
}

fn simulate(seed: u64, config: &CampaignConfig) -> Result<DetailedTrace> {
    let mut simulator = Simulator::new(config.sim_config_for_seed(seed))?;
    let result = simulator.run()?;
    let oracle = EngagementOracle::check_all(&result.midpoint)
        .merge(EngagementOracle::check_all(&result.states));
    Ok(DetailedTrace { result, oracle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use girder_core::model::ContentId;

    #[test]
    fn default_campaign_passes() {
        let config = CampaignConfig {
            seed_range: 0..25,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign should not error");
        assert_eq!(report.seeds_run, 25);
        assert!(
            report.all_passed(),
            "campaign failed: {} failures, first at seed {:?}: {:?}",
            report.failures.len(),
            report.first_failure,
            report.failures.first(),
        );
    }

    #[test]
    fn rejection_heavy_campaign_reaches_interesting_states() {
        let config = CampaignConfig {
            seed_range: 0..20,
            client_count: 2,
            rounds: 30,
            reject_percent: 50,
            max_delay_rounds: 4,
            expire_percent: 0,
            session_ttl_minutes: 600,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign");
        assert!(report.all_passed(), "{:?}", report.failures.first());
        assert!(report.interesting_states_reached > 0);
    }

    #[test]
    fn replay_is_deterministic() {
        let config = CampaignConfig {
            seed_range: 0..1,
            ..CampaignConfig::default()
        };
        let a = replay_seed(7, &config).expect("replay 1");
        let b = replay_seed(7, &config).expect("replay 2");
        assert_eq!(a.result.trace, b.result.trace);
        assert_eq!(a.result.states, b.result.states);
        assert_eq!(a.oracle, b.oracle);
        assert!(!a.result.trace.is_empty());
    }

    #[test]
    fn single_seed_reports_pass() {
        let config = CampaignConfig::default();
        assert_eq!(run_single_seed(1, &config).expect("run"), Ok(()));
    }

    #[test]
    fn invalid_configs_are_refused() {
        let empty = CampaignConfig {
            seed_range: 5..5,
            ..CampaignConfig::default()
        };
        assert!(run_campaign(&empty).is_err());

        let over = CampaignConfig {
            reject_percent: 101,
            ..CampaignConfig::default()
        };
        assert!(over.validate().unwrap_err().to_string().contains("percentages"));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = CampaignReport {
            seeds_run: 10,
            seeds_passed: 9,
            first_failure: Some(7),
            failures: vec![SeedFailure {
                seed: 7,
                violations: vec![
                    InvariantViolation::MultipleAccepted {
                        client: 0,
                        question: ContentId::new("q-1"),
                        accepted: vec![ContentId::new("a-1"), ContentId::new("a-2")],
                    }
                    .to_string(),
                ],
            }],
            interesting_states_reached: 4,
            divergent_seeds: 10,
        };
        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains("\"seeds_run\":10"));
        assert!(json.contains("\"first_failure\":7"));
        assert!(json.contains("MultipleAccepted"));
    }
}
