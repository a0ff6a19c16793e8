//! Property-based tests for selection and escalation.

use proptest::prelude::*;
use std::collections::HashSet;

use tempo::algorithm::{ExactSearch, GreedyRepair, SelectionStrategy};
use tempo::catalog::{apply_criteria, SeedCriteria};
use tempo::config::EngineConfig;
use tempo::oracle;
use tempo::playlist::{EscalationPolicy, PlaylistBuilder, ResolveError};
use tempo::track::{total_duration, TargetDuration, Track};

fn arb_pool(max_len: usize) -> impl Strategy<Value = Vec<Track>> {
    prop::collection::vec(1u32..600, 0..=max_len).prop_map(|durations| {
        durations
            .into_iter()
            .enumerate()
            .map(|(i, d)| Track::new(format!("t{i}"), d))
            .collect()
    })
}

fn arb_policy() -> impl Strategy<Value = EscalationPolicy> {
    (0u64..100, 1u64..60, 0u64..300, 1usize..20).prop_map(|(initial, step, headroom, attempts)| {
        EscalationPolicy {
            initial_tolerance: initial,
            step,
            max_tolerance: initial + headroom,
            max_attempts: attempts,
        }
    })
}

fn check_selection(strategy: &dyn SelectionStrategy, pool: &[Track], target: u64, tolerance: u64) -> Result<(), TestCaseError> {
    let outcome = strategy.search(pool, target, tolerance);

    let unique: HashSet<usize> = outcome.picks.iter().copied().collect();
    prop_assert_eq!(unique.len(), outcome.picks.len(), "{} reused a pool entry", strategy.name());
    prop_assert!(outcome.picks.iter().all(|&i| i < pool.len()));

    let sum = total_duration(outcome.selection(pool));
    prop_assert_eq!(sum, outcome.total_duration);
    prop_assert_eq!(outcome.residual_error, sum as i64 - target as i64);
    if outcome.matched {
        prop_assert!(outcome.residual_error.unsigned_abs() <= tolerance);
    }
    Ok(())
}

proptest! {
    #[test]
    fn greedy_selection_is_a_subset(pool in arb_pool(40), target in 0u64..6000, tolerance in 0u64..120) {
        check_selection(&GreedyRepair, &pool, target, tolerance)?;
    }

    #[test]
    fn exact_selection_is_a_subset(pool in arb_pool(12), target in 0u64..3000, tolerance in 0u64..120) {
        check_selection(&ExactSearch::default(), &pool, target, tolerance)?;
    }

    #[test]
    fn greedy_draws_each_track_at_most_once(pool in arb_pool(40), target in 0u64..6000, tolerance in 0u64..120) {
        let outcome = GreedyRepair.search(&pool, target, tolerance);
        prop_assert!(outcome.draws <= pool.len());
    }

    #[test]
    fn search_is_deterministic(pool in arb_pool(12), target in 0u64..3000, tolerance in 0u64..120) {
        prop_assert_eq!(GreedyRepair.search(&pool, target, tolerance), GreedyRepair.search(&pool, target, tolerance));
        let exact = ExactSearch::default();
        prop_assert_eq!(exact.search(&pool, target, tolerance), exact.search(&pool, target, tolerance));
    }

    #[test]
    fn escalation_widens_strictly(pool in arb_pool(30), target in 0u64..6000, policy in arb_policy()) {
        let builder = PlaylistBuilder::new(&GreedyRepair, policy).unwrap();

        match builder.resolve(&pool, TargetDuration::from_secs(target)) {
            Ok(playlist) => {
                let tolerances: Vec<u64> = playlist.attempts.iter().map(|a| a.tolerance).collect();
                prop_assert_eq!(tolerances.first().copied(), Some(policy.initial_tolerance));
                prop_assert!(tolerances.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(tolerances.iter().all(|&t| t <= policy.max_tolerance));
                prop_assert!(tolerances.len() <= policy.max_attempts);

                let (last, earlier) = playlist.attempts.split_last().unwrap();
                prop_assert!(last.matched);
                prop_assert!(earlier.iter().all(|a| !a.matched));
                prop_assert_eq!(playlist.tolerance, last.tolerance);
                prop_assert!(playlist.residual_error.unsigned_abs() <= playlist.tolerance);
                prop_assert_eq!(total_duration(&playlist.tracks), playlist.total_duration);
            }
            Err(ResolveError::NoCandidates) => prop_assert!(pool.is_empty()),
            Err(ResolveError::Unsatisfiable { attempts, .. }) => {
                prop_assert!(attempts >= 1);
                prop_assert!(attempts <= policy.max_attempts);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn greedy_agrees_with_exact_search(pool in arb_pool(12), target in 0u64..3000, tolerance in 0u64..120) {
        let report = oracle::compare(&pool, TargetDuration::from_secs(target), tolerance, &EngineConfig::default()).unwrap();
        prop_assert!(report.agrees(), "{report:?}");
        if !pool.is_empty() {
            prop_assert!(report.greedy_matched, "covering tolerance always matches: {report:?}");
        }
    }

    #[test]
    fn criteria_keep_a_subset_of_the_catalog(pool in arb_pool(40), seed in any::<u64>(), limit in 0usize..50) {
        let criteria = SeedCriteria { limit: Some(limit), shuffle: true, seed: Some(seed), dedup: true };
        let picked = apply_criteria(pool.clone(), &criteria);

        prop_assert_eq!(picked.len(), pool.len().min(limit));
        prop_assert!(picked.iter().all(|track| pool.contains(track)));
    }
}
