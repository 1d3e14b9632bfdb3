//! `gd sim`: deterministic simulation of clients racing a flaky backend.
//!
//! `gd sim run`: execute a campaign across many seeds.
//! `gd sim replay`: replay a single seed with detailed trace output.

use std::io::Write;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use girder_sim::TraceEvent;
use girder_sim::campaign::{CampaignConfig, replay_seed, run_campaign};
use serde::Serialize;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct SimArgs {
    #[command(subcommand)]
    pub command: SimCommand,
}

#[derive(Subcommand, Debug)]
pub enum SimCommand {
    #[command(
        about = "Run a simulation campaign across multiple seeds",
        long_about = "Simulate several clients dispatching gestures against shared content while\n\
                      a backend confirms or rejects their syncs after random delays. Every seed\n\
                      is checked for engagement invariants mid-run and after all syncs settle.",
        after_help = "EXAMPLES:\n    # Run 100 seeds with defaults\n    gd sim run --seeds 100\n\n\
                      # Reject half of all syncs\n    gd sim run --seeds 200 --clients 4 --reject-percent 50\n\n\
                      # Machine-readable output\n    gd sim run --seeds 100 --json"
    )]
    Run(SimRunArgs),

    #[command(
        about = "Replay a single seed with detailed trace output",
        long_about = "Replay a specific seed to get the full trace, oracle results, and\n\
                      violation details. Use after a campaign failure to debug.",
        after_help = "EXAMPLES:\n    # Replay seed 42\n    gd sim replay --seed 42\n\n\
                      # Include every trace event\n    gd sim replay --seed 42 --trace --json"
    )]
    Replay(SimReplayArgs),
}

/// Knobs shared by `run` and `replay`.
#[derive(Args, Debug, Clone)]
pub struct SimParams {
    /// Number of simulated clients.
    #[arg(long, default_value = "3")]
    pub clients: usize,

    /// Rounds per seed before the backend is drained.
    #[arg(long, default_value = "24")]
    pub rounds: u64,

    /// Answers seeded under the shared question.
    #[arg(long, default_value = "3")]
    pub answers: usize,

    /// Share of syncs the backend rejects (0-100).
    #[arg(long, default_value = "15")]
    pub reject_percent: u8,

    /// Longest sync delay in rounds.
    #[arg(long, default_value = "2")]
    pub max_delay: u8,

    /// Chance per client per round of a forced sign-out (0-100).
    #[arg(long, default_value = "2")]
    pub expire_percent: u8,

    /// Session lifetime in simulated minutes.
    #[arg(long, default_value = "20")]
    pub session_ttl: i64,
}

#[derive(Args, Debug)]
pub struct SimRunArgs {
    /// Number of seeds to run.
    #[arg(long, default_value = "100")]
    pub seeds: u64,

    /// Starting seed value.
    #[arg(long, default_value = "0")]
    pub seed_start: u64,

    #[command(flatten)]
    pub params: SimParams,
}

#[derive(Args, Debug)]
pub struct SimReplayArgs {
    /// Seed to replay.
    #[arg(long)]
    pub seed: u64,

    /// Include every trace event in the output.
    #[arg(long)]
    pub trace: bool,

    #[command(flatten)]
    pub params: SimParams,
}

#[derive(Debug, Serialize)]
struct RunOutput {
    seeds_run: usize,
    seeds_passed: usize,
    seeds_failed: usize,
    first_failure: Option<u64>,
    interesting_states_reached: usize,
    divergent_seeds: usize,
    all_passed: bool,
    failures: Vec<FailureOutput>,
}

#[derive(Debug, Serialize)]
struct FailureOutput {
    seed: u64,
    violations: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ReplayOutput<'a> {
    seed: u64,
    trace_events: usize,
    clients: usize,
    diverged: bool,
    oracle_passed: bool,
    violations: Vec<String>,
    interesting_state_reached: bool,
    trace_fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a [TraceEvent]>,
}

fn campaign_config(seed_start: u64, seeds: u64, params: &SimParams) -> CampaignConfig {
    CampaignConfig {
        seed_range: seed_start..seed_start.saturating_add(seeds),
        client_count: params.clients,
        rounds: params.rounds,
        answers: params.answers,
        reject_percent: params.reject_percent,
        max_delay_rounds: params.max_delay,
        expire_percent: params.expire_percent,
        session_ttl_minutes: params.session_ttl,
    }
}

/// Execute `gd sim run`.
///
/// # Errors
///
/// Invalid parameters, or any seed violating an invariant (so CI sees a
/// non-zero exit).
pub fn run_sim_run(args: &SimRunArgs, output: OutputMode) -> Result<()> {
    let config = campaign_config(args.seed_start, args.seeds, &args.params);
    let report = run_campaign(&config)?;

    let out = RunOutput {
        seeds_run: report.seeds_run,
        seeds_passed: report.seeds_passed,
        seeds_failed: report.failures.len(),
        first_failure: report.first_failure,
        interesting_states_reached: report.interesting_states_reached,
        divergent_seeds: report.divergent_seeds,
        all_passed: report.all_passed(),
        failures: report
            .failures
            .iter()
            .map(|f| FailureOutput {
                seed: f.seed,
                violations: f.violations.clone(),
            })
            .collect(),
    };
    let params = &args.params;

    render_mode(
        output,
        &out,
        |o, w| {
            writeln!(
                w,
                "campaign seeds_run={} clients={} rounds={} reject_pct={}",
                o.seeds_run, params.clients, params.rounds, params.reject_percent
            )?;
            writeln!(
                w,
                "results passed={} failed={} interesting_states={} divergent={} all_passed={}",
                o.seeds_passed,
                o.seeds_failed,
                o.interesting_states_reached,
                o.divergent_seeds,
                o.all_passed
            )?;
            for failure in o.failures.iter().take(5) {
                writeln!(
                    w,
                    "failure seed={} violations={}",
                    failure.seed,
                    failure.violations.len()
                )?;
            }
            if let Some(seed) = o.first_failure {
                writeln!(w, "hint replay_seed={seed}")?;
            }
            Ok(())
        },
        |o, w| {
            pretty_section(w, "Simulation Campaign")?;
            pretty_kv(w, "Seeds", o.seeds_run.to_string())?;
            pretty_kv(w, "Clients", params.clients.to_string())?;
            pretty_kv(w, "Rounds", params.rounds.to_string())?;
            pretty_kv(w, "Rejects", format!("{}%", params.reject_percent))?;
            pretty_kv(
                w,
                "Results",
                format!(
                    "{} passed / {} failed ({} interesting, {} divergent)",
                    o.seeds_passed, o.seeds_failed, o.interesting_states_reached, o.divergent_seeds
                ),
            )?;
            match o.first_failure {
                None => pretty_kv(w, "Status", "all seeds passed"),
                Some(seed) => {
                    pretty_kv(w, "Status", format!("{} failures (first at seed {seed})", o.seeds_failed))?;
                    writeln!(w)?;
                    pretty_section(w, "Failure Samples")?;
                    for failure in o.failures.iter().take(5) {
                        writeln!(w, "seed {:<8} violations={}", failure.seed, failure.violations.len())?;
                        for violation in &failure.violations {
                            writeln!(w, "  - {violation}")?;
                        }
                    }
                    writeln!(w)?;
                    pretty_kv(w, "Replay", format!("gd sim replay --seed {seed}"))
                }
            }
        },
    )?;

    if !report.all_passed() {
        bail!("{} of {} seeds failed", report.failures.len(), report.seeds_run);
    }
    Ok(())
}

/// Execute `gd sim replay`.
///
/// # Errors
///
/// Invalid parameters or a simulation failure.
pub fn run_sim_replay(args: &SimReplayArgs, output: OutputMode) -> Result<()> {
    let config = campaign_config(args.seed, 1, &args.params);
    let detailed = replay_seed(args.seed, &config)?;
    let result = &detailed.result;

    let out = ReplayOutput {
        seed: args.seed,
        trace_events: result.trace.len(),
        clients: result.states.len(),
        diverged: result.divergence.diverged,
        oracle_passed: detailed.oracle.passed,
        violations: detailed.oracle.violations.iter().map(ToString::to_string).collect(),
        interesting_state_reached: result.interesting_state_reached,
        trace_fingerprint: result.fingerprint()?,
        trace: args.trace.then_some(result.trace.as_slice()),
    };

    let human = |o: &ReplayOutput<'_>, w: &mut dyn Write| -> std::io::Result<()> {
        pretty_section(w, &format!("Seed {}", o.seed))?;
        pretty_kv(w, "Events", o.trace_events.to_string())?;
        pretty_kv(w, "Clients", o.clients.to_string())?;
        pretty_kv(w, "Oracle", if o.oracle_passed { "passed" } else { "FAILED" })?;
        pretty_kv(w, "Diverged", o.diverged.to_string())?;
        pretty_kv(w, "Interesting", o.interesting_state_reached.to_string())?;
        pretty_kv(w, "Fingerprint", &o.trace_fingerprint)?;
        for violation in &o.violations {
            writeln!(w, "  - {violation}")?;
        }
        if let Some(trace) = o.trace {
            writeln!(w)?;
            pretty_section(w, "Trace")?;
            for event in trace {
                let kind = serde_json::to_string(&event.kind).unwrap_or_default();
                writeln!(w, "r{:<4} c{:<2} {kind}", event.round, event.client)?;
            }
        }
        Ok(())
    };
    render_mode(output, &out, human, human)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_map_onto_campaign_config() {
        let params = SimParams {
            clients: 4,
            rounds: 10,
            answers: 2,
            reject_percent: 40,
            max_delay: 3,
            expire_percent: 0,
            session_ttl: 90,
        };
        let config = campaign_config(5, 10, &params);
        assert_eq!(config.seed_range, 5..15);
        assert_eq!(config.client_count, 4);
        assert_eq!(config.reject_percent, 40);
        assert_eq!(config.session_ttl_minutes, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn seed_range_does_not_overflow() {
        let params = SimParams {
            clients: 1,
            rounds: 1,
            answers: 1,
            reject_percent: 0,
            max_delay: 0,
            expire_percent: 0,
            session_ttl: 1,
        };
        let config = campaign_config(u64::MAX, 5, &params);
        assert!(config.seed_range.is_empty());
    }
}
