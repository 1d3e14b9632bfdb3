use girder_sim::backend::BackendConfig;
use girder_sim::oracle::EngagementOracle;
use girder_sim::{SimulationConfig, Simulator, TraceEventKind};
use proptest::prelude::*;

fn arb_config() -> impl Strategy<Value = SimulationConfig> {
    (
        any::<u64>(),
        1usize..4,
        4u64..30,
        1usize..4,
        0u8..=100,
        0u8..5,
        0u8..10,
    )
        .prop_map(
            |(seed, client_count, rounds, answers, reject_percent, max_delay_rounds, expire_percent)| {
                SimulationConfig {
                    seed,
                    client_count,
                    rounds,
                    answers,
                    backend: BackendConfig {
                        max_delay_rounds,
                        reject_percent,
                    },
                    expire_percent,
                    session_ttl_minutes: 15,
                }
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn oracle_holds_for_any_config(config in arb_config()) {
        let result = Simulator::new(config).unwrap().run().unwrap();
        let mid = EngagementOracle::check_all(&result.midpoint);
        let end = EngagementOracle::check_all(&result.states);
        prop_assert!(mid.passed, "midpoint: {:?}", mid.violations);
        prop_assert!(end.passed, "end: {:?}", end.violations);
    }

    #[test]
    fn planned_gestures_are_never_refused(config in arb_config()) {
        let result = Simulator::new(config).unwrap().run().unwrap();
        prop_assert_eq!(
            result.count(|k| matches!(k, TraceEventKind::Refused { .. })),
            0
        );
    }

    #[test]
    fn accepting_everything_never_rolls_back(seed in any::<u64>()) {
        let config = SimulationConfig {
            seed,
            backend: BackendConfig { max_delay_rounds: 3, reject_percent: 0 },
            expire_percent: 0,
            session_ttl_minutes: 600,
            ..SimulationConfig::default()
        };
        let result = Simulator::new(config).unwrap().run().unwrap();
        prop_assert_eq!(result.count(|k| matches!(k, TraceEventKind::RolledBack { .. })), 0);
        prop_assert_eq!(result.count(|k| matches!(k, TraceEventKind::Stale { .. })), 0);
        for state in &result.states {
            prop_assert!(state.ledger().iter().all(|c| c.status.is_settled()));
        }
    }
}
