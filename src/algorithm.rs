//! Track selection strategies.
//!
//! Both strategies answer the same question: which entries of a pool add up
//! to a target duration, give or take a tolerance? They differ in cost.
//!
//! - [`GreedyRepair`] is linear in the pool size and is what playlists are
//!   normally built with.
//! - [`ExactSearch`] walks every include/exclude branch. It is exponential and
//!   only runs on small pools, mostly as an oracle for [`GreedyRepair`].
//!
//! Strategies never modify the pool they are given. Work happens on a private
//! list of indices into it, so one pool can serve any number of attempts.

use crate::track::Track;
use log::trace;

/// Largest pool [`ExactSearch`] accepts by default.
pub const DEFAULT_EXACT_SEARCH_LIMIT: usize = 20;

/// Result of one selection attempt at one tolerance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Indices into the pool, in selection order.
    pub picks: Vec<usize>,
    /// Whether the attempt is accepted at the tolerance it ran with.
    pub matched: bool,
    /// `sum(picks) - target`. Positive means the selection runs long.
    pub residual_error: i64,
    pub total_duration: u64,
    /// The working pool ran dry before the attempt stopped.
    pub pool_exhausted: bool,
    /// Pool entries drawn during the attempt.
    pub draws: usize,
}

impl Outcome {
    /// Outcome for an empty pool.
    #[must_use]
    pub fn no_candidates(target: u64) -> Self {
        Self {
            picks: Vec::new(),
            matched: false,
            residual_error: -to_signed(target),
            total_duration: 0,
            pool_exhausted: true,
            draws: 0,
        }
    }

    fn from_picks(pool: &[Track], picks: Vec<usize>, target: u64) -> Self {
        let total_duration: u64 = picks.iter().map(|&i| u64::from(pool[i].duration)).sum();
        Self {
            residual_error: to_signed(total_duration) - to_signed(target),
            total_duration,
            picks,
            matched: false,
            pool_exhausted: false,
            draws: 0,
        }
    }

    /// The acceptance predicate: `|sum - target| <= tolerance`.
    #[must_use]
    pub fn within(&self, tolerance: u64) -> bool {
        self.residual_error.unsigned_abs() <= tolerance
    }

    /// Resolve the picked indices against the pool they came from.
    #[must_use]
    pub fn selection<'p>(&self, pool: &'p [Track]) -> Vec<&'p Track> {
        self.picks.iter().map(|&i| &pool[i]).collect()
    }
}

/// A way of choosing tracks from a pool.
pub trait SelectionStrategy: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Attempt a selection at a single tolerance.
    fn search(&self, pool: &[Track], target: u64, tolerance: u64) -> Outcome;

    /// Largest pool this strategy can handle, if it has a limit.
    fn max_pool_size(&self) -> Option<usize> {
        None
    }
}

/// Fill from the back of the pool, then swap the latest pick until close
/// enough or out of candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyRepair;

impl SelectionStrategy for GreedyRepair {
    fn name(&self) -> &'static str {
        "greedy-repair"
    }

    fn search(&self, pool: &[Track], target: u64, tolerance: u64) -> Outcome {
        if pool.is_empty() {
            return Outcome::no_candidates(target);
        }

        let duration = |i: usize| i64::from(pool[i].duration);
        let mut working: Vec<usize> = (0..pool.len()).collect();
        let mut picks: Vec<usize> = Vec::new();
        let mut remaining = to_signed(target);
        let mut draws = 0;

        // Fill.
        while remaining > 0 {
            let Some(next) = working.pop() else { break };
            remaining -= duration(next);
            picks.push(next);
            draws += 1;
        }
        trace!("Fill phase took {} tracks, {remaining}s remaining", picks.len());

        // Repair: trade the most recent pick for the next candidate.
        while remaining.unsigned_abs() > tolerance {
            let Some(next) = working.pop() else { break };
            if let Some(dropped) = picks.pop() {
                remaining += duration(dropped);
            }
            remaining -= duration(next);
            picks.push(next);
            draws += 1;
        }

        let mut outcome = Outcome::from_picks(pool, picks, target);
        outcome.pool_exhausted = working.is_empty();
        outcome.draws = draws;
        outcome.matched = outcome.within(tolerance);
        trace!(
            "Greedy-repair at ±{tolerance}s: residual {}s after {draws} draws, matched={}",
            outcome.residual_error,
            outcome.matched
        );
        outcome
    }
}

/// Exhaustive include/exclude search.
///
/// Takes the first selection found down the "keep" side of each branch. That
/// is a tie-break, not a promise of the closest sum.
#[derive(Debug, Clone, Copy)]
pub struct ExactSearch {
    pub max_pool_size: usize,
}

impl Default for ExactSearch {
    fn default() -> Self {
        Self {
            max_pool_size: DEFAULT_EXACT_SEARCH_LIMIT,
        }
    }
}

impl ExactSearch {
    #[must_use]
    pub const fn with_limit(max_pool_size: usize) -> Self {
        Self { max_pool_size }
    }
}

impl SelectionStrategy for ExactSearch {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn search(&self, pool: &[Track], target: u64, tolerance: u64) -> Outcome {
        if pool.is_empty() {
            return Outcome::no_candidates(target);
        }

        let picks = search_prefix(pool, pool.len(), to_signed(target), to_signed(tolerance))
            .unwrap_or_default();
        let mut outcome = Outcome::from_picks(pool, picks, target);
        outcome.pool_exhausted = outcome.picks.is_empty();
        outcome.draws = pool.len();
        outcome.matched = !outcome.picks.is_empty() && outcome.within(tolerance);
        trace!(
            "Exact search at ±{tolerance}s over {} tracks: matched={}",
            pool.len(),
            outcome.matched
        );
        outcome
    }

    fn max_pool_size(&self) -> Option<usize> {
        Some(self.max_pool_size)
    }
}

/// Search `pool[..len]`, deciding on the last entry first.
fn search_prefix(pool: &[Track], len: usize, target: i64, tolerance: i64) -> Option<Vec<usize>> {
    let last = len.checked_sub(1)?;
    let duration = i64::from(pool[last].duration);

    if (target - duration).abs() <= tolerance {
        return Some(vec![last]);
    }

    if let Some(mut keep) = search_prefix(pool, last, target - duration, tolerance) {
        keep.push(last);
        return Some(keep);
    }

    search_prefix(pool, last, target, tolerance)
}

/// Seconds as a signed value, saturating far beyond any real playlist.
pub(crate) fn to_signed(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX)
}
