//! Checks the greedy strategy against exhaustive search.
//!
//! On a small pool, [`ExactSearch`] settles whether any selection lands within
//! a tolerance. If it does, escalating [`GreedyRepair`] must get there too,
//! even if it needs a wider tolerance to do so.

use crate::algorithm::{ExactSearch, GreedyRepair, Outcome, SelectionStrategy};
use crate::config::EngineConfig;
use crate::playlist::{EscalationPolicy, Playlist, PlaylistBuilder, ResolveError};
use crate::track::{TargetDuration, Track};
use log::{info, warn};
use serde::Serialize;

/// Side-by-side result of both strategies on one pool.
#[derive(Debug, Clone, Serialize)]
pub struct AgreementReport {
    pub pool_size: usize,
    pub target: u64,
    pub tolerance: u64,
    /// Exhaustive search found a selection within `tolerance`.
    pub exact_matched: bool,
    pub exact_residual: Option<i64>,
    /// Escalating greedy eventually matched.
    pub greedy_matched: bool,
    pub greedy_residual: Option<i64>,
    /// Tolerance greedy was accepted at.
    pub greedy_tolerance: Option<u64>,
    pub greedy_attempts: usize,
    pub greedy_error: Option<String>,
}

impl AgreementReport {
    /// Greedy never gives up on a pool the oracle can satisfy.
    #[must_use]
    pub fn agrees(&self) -> bool {
        !self.exact_matched || self.greedy_matched
    }
}

/// Run exact search at `tolerance` and escalating greedy side by side.
///
/// Greedy escalates up to whatever tolerance covers any selection of the
/// pool, so the only way it fails is if it cannot match at all.
///
/// # Errors
///
/// Fails if the pool is above the configured exhaustive-search limit.
pub fn compare(
    pool: &[Track],
    target: TargetDuration,
    tolerance: u64,
    config: &EngineConfig,
) -> Result<AgreementReport, ResolveError> {
    let exact = ExactSearch::with_limit(config.exact_search_limit);
    if pool.len() > exact.max_pool_size {
        return Err(ResolveError::PoolTooLarge {
            strategy: exact.name(),
            size: pool.len(),
            limit: exact.max_pool_size,
        });
    }

    let policy = covering_policy(pool, target.as_secs(), tolerance, config);
    let greedy = PlaylistBuilder::new(&GreedyRepair, policy)?;

    let (exact_outcome, greedy_result): (Outcome, Result<Playlist, ResolveError>) = rayon::join(
        || exact.search(pool, target.as_secs(), tolerance),
        || greedy.resolve(pool, target),
    );

    let report = AgreementReport {
        pool_size: pool.len(),
        target: target.as_secs(),
        tolerance,
        exact_matched: exact_outcome.matched,
        exact_residual: exact_outcome.matched.then_some(exact_outcome.residual_error),
        greedy_matched: greedy_result.is_ok(),
        greedy_residual: greedy_result.as_ref().ok().map(|p| p.residual_error),
        greedy_tolerance: greedy_result.as_ref().ok().map(|p| p.tolerance),
        greedy_attempts: match &greedy_result {
            Ok(playlist) => playlist.attempts.len(),
            Err(ResolveError::Unsatisfiable { attempts, .. } | ResolveError::DeadlineExceeded { attempts, .. }) => {
                *attempts
            }
            Err(_) => 0,
        },
        greedy_error: greedy_result.as_ref().err().map(ToString::to_string),
    };

    if report.agrees() {
        info!("Oracle agreement holds for {target} at ±{tolerance}s over {} tracks", pool.len());
    } else {
        warn!("Greedy gave up on {target} where exact search matched at ±{tolerance}s");
    }
    Ok(report)
}

/// Escalation that reaches [`covering_tolerance`] within the configured
/// number of attempts, stepping wider than configured if it has to.
fn covering_policy(pool: &[Track], target: u64, tolerance: u64, config: &EngineConfig) -> EscalationPolicy {
    let ceiling = covering_tolerance(pool, target).max(tolerance);
    let max_attempts = config.max_attempts.max(1);
    let steps = u64::try_from(max_attempts - 1).unwrap_or(u64::MAX);

    if steps == 0 {
        return EscalationPolicy {
            initial_tolerance: ceiling,
            step: 1,
            max_tolerance: ceiling,
            max_attempts,
        };
    }

    let initial_tolerance = config.initial_tolerance.min(tolerance);
    EscalationPolicy {
        initial_tolerance,
        step: config
            .tolerance_step
            .max((ceiling - initial_tolerance).div_ceil(steps))
            .max(1),
        max_tolerance: ceiling,
        max_attempts,
    }
}

/// A tolerance wide enough that greedy's fill phase alone is accepted.
///
/// Filling stops either below the target with the pool spent (off by at
/// most `target`) or after overshooting by less than one track.
fn covering_tolerance(pool: &[Track], target: u64) -> u64 {
    let longest = pool.iter().map(|track| u64::from(track.duration)).max().unwrap_or(0);
    target.max(longest)
}
