#![forbid(unsafe_code)]

use anyhow::Result;
use girder_sim::oracle::EngagementOracle;
use girder_sim::{SimulationConfig, Simulator};

fn main() -> Result<()> {
    let mut simulator = Simulator::new(SimulationConfig::default())?;
    let result = simulator.run()?;
    let oracle = EngagementOracle::check_all(&result.states);

    println!(
        "simulation complete: trace_events={} passed={} diverged={} interesting={} fingerprint={}",
        result.trace.len(),
        oracle.passed,
        result.divergence.diverged,
        result.interesting_state_reached,
        result.fingerprint()?,
    );

    Ok(())
}
