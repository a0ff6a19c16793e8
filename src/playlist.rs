//! # Playlist Resolution
//!
//! Turns a pool of tracks and a target length into a playlist by running a
//! [`SelectionStrategy`] at a widening tolerance until one attempt lands
//! close enough.
//!
//! ```text
//! ATTEMPTING(t) ──match──▶ MATCHED
//!      │
//!      ├──miss──▶ ATTEMPTING(min(t + step, max_tolerance))
//!      │
//!      └──miss, guard reached──▶ FAILED
//! ```
//!
//! Every attempt sees the complete original pool. Nothing carries over from
//! one tolerance to the next.
//!
//! ## Example
//!
//! ```
//! use tempo::algorithm::GreedyRepair;
//! use tempo::playlist::{EscalationPolicy, PlaylistBuilder};
//! use tempo::track::{TargetDuration, Track};
//!
//! let pool = vec![Track::new("a", 600), Track::new("b", 300)];
//! let builder = PlaylistBuilder::new(&GreedyRepair, EscalationPolicy::default())?;
//! let playlist = builder.resolve(&pool, TargetDuration::from_secs(900))?;
//! assert_eq!(playlist.total_duration, 900);
//! # Ok::<(), tempo::playlist::ResolveError>(())
//! ```

use crate::algorithm::{to_signed, Outcome, SelectionStrategy};
use crate::track::{TargetDuration, Track};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Why a playlist could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The pool was empty. Nothing to pick from at any tolerance.
    #[error("no candidate tracks to choose from")]
    NoCandidates,

    /// Tracks exist, but no attempt up to the guard got close enough.
    #[error(
        "no combination of {pool_size} tracks lands within ±{max_tolerance}s of {target}s \
         after {attempts} attempts (closest was {best_residual:+}s)"
    )]
    Unsatisfiable {
        target: u64,
        pool_size: usize,
        max_tolerance: u64,
        attempts: usize,
        best_residual: i64,
    },

    /// A strategy reported a selection the acceptance check rejects.
    #[error("{strategy} returned an invalid selection at ±{tolerance}s: {detail}")]
    InvariantViolation {
        strategy: &'static str,
        tolerance: u64,
        detail: String,
    },

    #[error("{strategy} handles at most {limit} tracks, pool has {size}")]
    PoolTooLarge {
        strategy: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("deadline passed after {attempts} attempts (last tolerance ±{tolerance}s)")]
    DeadlineExceeded { attempts: usize, tolerance: u64 },

    #[error("invalid escalation settings: {0}")]
    InvalidConfig(String),
}

/// How tolerance grows between attempts, and when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub initial_tolerance: u64,
    pub step: u64,
    /// No attempt runs above this tolerance.
    pub max_tolerance: u64,
    pub max_attempts: usize,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            initial_tolerance: 0,
            step: 30,
            max_tolerance: 900,
            max_attempts: 64,
        }
    }
}

impl EscalationPolicy {
    /// Reject settings that could loop forever or never run.
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.step == 0 {
            return Err(ResolveError::InvalidConfig(
                "tolerance step must be greater than zero".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ResolveError::InvalidConfig(
                "at least one attempt is required".to_string(),
            ));
        }
        if self.initial_tolerance > self.max_tolerance {
            return Err(ResolveError::InvalidConfig(format!(
                "initial tolerance {}s exceeds maximum {}s",
                self.initial_tolerance, self.max_tolerance
            )));
        }
        Ok(())
    }

    /// Tolerance for the attempt after `current`, or `None` once the guard is hit.
    ///
    /// The last attempt runs at exactly `max_tolerance`.
    #[must_use]
    pub fn next_tolerance(&self, current: u64, attempts_made: usize) -> Option<u64> {
        if attempts_made >= self.max_attempts || current >= self.max_tolerance {
            return None;
        }
        Some(current.saturating_add(self.step).min(self.max_tolerance))
    }
}

/// One try at one tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub tolerance: u64,
    pub matched: bool,
    pub residual_error: i64,
}

/// A resolved playlist.
#[derive(Debug, Clone, Serialize)]
pub struct Playlist {
    pub tracks: Vec<Track>,
    pub target: TargetDuration,
    /// Tolerance of the accepted attempt.
    pub tolerance: u64,
    pub total_duration: u64,
    pub residual_error: i64,
    pub strategy: &'static str,
    pub attempts: Vec<Attempt>,
}

impl Playlist {
    /// Track ids in playlist order, as the persistence layer stores them.
    #[must_use]
    pub fn track_ids(&self) -> Vec<&str> {
        self.tracks.iter().map(|track| track.id.as_str()).collect()
    }
}

/// Runs a strategy under an [`EscalationPolicy`].
#[derive(Clone, Copy)]
pub struct PlaylistBuilder<'s> {
    strategy: &'s dyn SelectionStrategy,
    policy: EscalationPolicy,
}

impl std::fmt::Debug for PlaylistBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistBuilder")
            .field("strategy", &self.strategy.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<'s> PlaylistBuilder<'s> {
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidConfig`] if the policy could not terminate.
    pub fn new(strategy: &'s dyn SelectionStrategy, policy: EscalationPolicy) -> Result<Self, ResolveError> {
        policy.validate()?;
        Ok(Self { strategy, policy })
    }

    /// Resolve a playlist with no deadline.
    pub fn resolve(&self, pool: &[Track], target: TargetDuration) -> Result<Playlist, ResolveError> {
        self.resolve_until(pool, target, None)
    }

    /// Resolve a playlist, giving up once `deadline` passes.
    ///
    /// The deadline is checked before each attempt.
    pub fn resolve_until(
        &self,
        pool: &[Track],
        target: TargetDuration,
        deadline: Option<Instant>,
    ) -> Result<Playlist, ResolveError> {
        if pool.is_empty() {
            warn!("No candidates to build a {target} playlist from");
            return Err(ResolveError::NoCandidates);
        }
        if let Some(limit) = self.strategy.max_pool_size() {
            if pool.len() > limit {
                return Err(ResolveError::PoolTooLarge {
                    strategy: self.strategy.name(),
                    size: pool.len(),
                    limit,
                });
            }
        }

        let target_secs = target.as_secs();
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut best_residual = -to_signed(target_secs);
        let mut tolerance = self.policy.initial_tolerance;

        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!("Deadline passed before attempt {} at ±{tolerance}s", attempts.len() + 1);
                return Err(ResolveError::DeadlineExceeded {
                    attempts: attempts.len(),
                    tolerance,
                });
            }

            debug!(
                "Attempt {} with {} over {} tracks: target {target}, tolerance ±{tolerance}s",
                attempts.len() + 1,
                self.strategy.name(),
                pool.len()
            );
            let outcome = self.strategy.search(pool, target_secs, tolerance);
            attempts.push(Attempt {
                tolerance,
                matched: outcome.matched,
                residual_error: outcome.residual_error,
            });

            if outcome.matched {
                self.certify(pool, &outcome, target_secs, tolerance)?;
                info!(
                    "Built {target} playlist: {} tracks, {:+}s off, at ±{tolerance}s after {} attempts",
                    outcome.picks.len(),
                    outcome.residual_error,
                    attempts.len()
                );
                return Ok(Playlist {
                    tracks: outcome.selection(pool).into_iter().cloned().collect(),
                    target,
                    tolerance,
                    total_duration: outcome.total_duration,
                    residual_error: outcome.residual_error,
                    strategy: self.strategy.name(),
                    attempts,
                });
            }

            if !outcome.picks.is_empty()
                && outcome.residual_error.unsigned_abs() < best_residual.unsigned_abs()
            {
                best_residual = outcome.residual_error;
            }

            match self.policy.next_tolerance(tolerance, attempts.len()) {
                Some(next) => tolerance = next,
                None => break,
            }
        }

        warn!(
            "Gave up on {target} playlist after {} attempts up to ±{tolerance}s",
            attempts.len()
        );
        Err(ResolveError::Unsatisfiable {
            target: target_secs,
            pool_size: pool.len(),
            max_tolerance: tolerance,
            attempts: attempts.len(),
            best_residual,
        })
    }

    /// Resolve several targets against the same pool in parallel.
    ///
    /// Results come back in the order of `targets`.
    pub fn resolve_batch(
        &self,
        pool: &[Track],
        targets: &[TargetDuration],
    ) -> Vec<Result<Playlist, ResolveError>> {
        targets
            .par_iter()
            .map(|&target| self.resolve(pool, target))
            .collect()
    }

    /// Check a claimed match against the pool and the acceptance predicate.
    fn certify(
        &self,
        pool: &[Track],
        outcome: &Outcome,
        target: u64,
        tolerance: u64,
    ) -> Result<(), ResolveError> {
        let violation = |detail: String| {
            error!("{} broke its contract at ±{tolerance}s: {detail}", self.strategy.name());
            ResolveError::InvariantViolation {
                strategy: self.strategy.name(),
                tolerance,
                detail,
            }
        };

        let mut seen = vec![false; pool.len()];
        for &index in &outcome.picks {
            match seen.get_mut(index) {
                None => return Err(violation(format!("index {index} is outside the pool"))),
                Some(true) => return Err(violation(format!("index {index} picked twice"))),
                Some(slot) => *slot = true,
            }
        }

        let total: u64 = outcome.picks.iter().map(|&i| u64::from(pool[i].duration)).sum();
        let residual = to_signed(total) - to_signed(target);
        if total != outcome.total_duration
            || residual != outcome.residual_error
            || residual.unsigned_abs() > tolerance
        {
            return Err(violation(format!(
                "selection totals {total}s but reports {}s ({:+}s off)",
                outcome.total_duration, outcome.residual_error
            )));
        }
        Ok(())
    }
}
