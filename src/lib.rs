//! Tempo builds playlists that fit the time you have.
//!
//! Given a pool of candidate tracks and a target length, Tempo picks a
//! subset whose total duration lands within a tolerance of the target. If
//! nothing fits at the requested tolerance, the tolerance widens step by
//! step until a selection is accepted or a configured ceiling is reached.
//!
//! Core modules:
//! - [`track`] - Tracks, target durations and time formatting
//! - [`algorithm`] - Selection strategies (greedy fill-and-repair, exhaustive search)
//! - [`playlist`] - Tolerance escalation and certified results
//! - [`oracle`] - Greedy versus exhaustive-search agreement checks
//!
//! ### Supporting Modules
//!
//! - [`catalog`] - Candidate pools from catalog exports
//! - [`db`] - Saved playlists in SQLite
//! - [`config`] - Data directory and engine settings
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`commands`] - Subcommand handlers
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use tempo::algorithm::GreedyRepair;
//! use tempo::catalog::{CandidateSource, JsonCatalog, SeedCriteria};
//! use tempo::config::EngineConfig;
//! use tempo::playlist::PlaylistBuilder;
//! use tempo::track::TargetDuration;
//!
//! let config = EngineConfig::load(&tempo::config::get_config_path()?)?;
//! let pool = JsonCatalog::new("recent.json").fetch_candidates(&SeedCriteria {
//!     shuffle: true,
//!     ..SeedCriteria::default()
//! })?;
//!
//! let builder = PlaylistBuilder::new(&GreedyRepair, config.escalation_policy())?;
//! let target = TargetDuration::from_hms(1, 20, 0).unwrap_or_default();
//! let playlist = builder.resolve(&pool, target)?;
//! println!("{} tracks, off by {}s", playlist.tracks.len(), playlist.residual_error);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Selection Details
//!
//! ### Greedy Repair
//! - Takes tracks from the back of the pool until the target is reached
//! - Swaps the latest pick for a later candidate while that improves the fit
//! - Linear in the pool size; any pool size
//!
//! ### Exact Search
//! - Tries including and excluding every track
//! - Finds a fitting selection whenever one exists
//! - Exponential; refused above a configurable pool size (20 by default)
//!
//! ## Error Handling
//!
//! The engine reports failures as [`playlist::ResolveError`]. Everything that
//! touches files, the database or the terminal returns `anyhow::Result`.
//!
//! ## Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```

pub mod algorithm;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod db;
pub mod oracle;
pub mod playlist;
pub mod track;
