//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `tempo` binary.
//!
//! ## Commands
//!
//! - `generate`: Build a playlist of a given length from a catalog export
//! - `validate`: Compare greedy selection against exhaustive search
//! - `playlists`: List, show or delete saved playlists
//! - `completion`: Print a shell completion script
//!
//! ## Examples
//!
//! ```bash
//! tempo generate --catalog recent.json --hours 1 --minutes 20
//! tempo generate --catalog recent.json --minutes 45 --shuffle --save --title "Run"
//! tempo validate --catalog small.json --target-seconds 900 --tolerance 30
//! tempo playlists list --owner alice
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Which selection strategy builds the playlist.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum StrategyKind {
    /// Linear fill-and-swap; works on pools of any size
    #[default]
    Greedy,
    /// Exhaustive search; small pools only
    Exact,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "tempo")]
#[command(about = "Tempo: playlists that fit the time you have")]
#[command(version)]
pub struct Args {
    /// Playlist database to use instead of the one in the data directory
    #[arg(long, global = true, env = "TEMPO_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Settings file to use instead of the one in the data directory
    #[arg(long, global = true, env = "TEMPO_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Requested length, as a listener would say it.
#[derive(ClapArgs, Debug, Clone, Copy, Default)]
pub struct LengthArgs {
    #[arg(long, default_value_t = 0)]
    pub hours: u64,

    #[arg(long, default_value_t = 0)]
    pub minutes: u64,

    #[arg(long, default_value_t = 0)]
    pub seconds: u64,
}

/// Overrides for the escalation settings in the config file.
#[derive(ClapArgs, Debug, Clone, Copy, Default)]
pub struct EscalationArgs {
    /// Tolerance of the first attempt, in seconds
    #[arg(long)]
    pub initial_tolerance: Option<u64>,

    /// Seconds of slack added after each failed attempt
    #[arg(long)]
    pub step: Option<u64>,

    /// Widest tolerance to try before giving up, in seconds
    #[arg(long)]
    pub max_tolerance: Option<u64>,

    /// Most attempts to make before giving up
    #[arg(long)]
    pub max_attempts: Option<usize>,
}

/// How to pull the candidate pool out of a catalog.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct PoolArgs {
    /// Catalog export (JSON) to draw candidates from
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub catalog: PathBuf,

    /// Use at most this many candidates
    #[arg(long)]
    pub limit: Option<usize>,

    /// Shuffle candidates first, so each run gives a different playlist
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for --shuffle, for reproducible playlists
    #[arg(long, requires = "shuffle")]
    pub seed: Option<u64>,

    /// Drop repeated track ids from the catalog
    #[arg(long)]
    pub dedup: bool,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a playlist whose length matches a target
    ///
    /// Picks tracks from the catalog until their total length is within a
    /// tolerance of the target. If no selection is close enough, the
    /// tolerance widens step by step up to the configured maximum.
    Generate {
        #[command(flatten)]
        pool: PoolArgs,

        #[command(flatten)]
        length: LengthArgs,

        #[command(flatten)]
        escalation: EscalationArgs,

        /// Selection strategy
        #[arg(long, value_enum, default_value_t = StrategyKind::Greedy)]
        strategy: StrategyKind,

        /// Save the playlist to the database
        #[arg(long)]
        save: bool,

        /// Owner to save the playlist under
        #[arg(long, default_value = "local", env = "TEMPO_OWNER")]
        owner: String,

        /// Title to save the playlist under (defaults to its length)
        #[arg(long)]
        title: Option<String>,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Check greedy selection against exhaustive search on a small pool
    ///
    /// Exhaustive search decides whether any selection lands within the
    /// tolerance. If one does, the escalating greedy strategy must also
    /// succeed. Pools above the exact-search limit are refused; use --limit.
    Validate {
        #[command(flatten)]
        pool: PoolArgs,

        /// Target length in seconds
        #[arg(long)]
        target_seconds: u64,

        /// Tolerance for exhaustive search, in seconds
        #[arg(long, default_value_t = 0)]
        tolerance: u64,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Manage saved playlists
    Playlists {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// Generate shell completions
    ///
    /// Usage: tempo completion bash > ~/.local/share/bash-completion/completions/tempo
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Saved playlist actions
#[derive(Subcommand, Debug)]
pub enum PlaylistAction {
    /// List saved playlists, newest first
    List {
        /// Only playlists saved by this owner
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show the tracks of a saved playlist
    Show {
        id: i64,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Delete a saved playlist
    Delete { id: i64 },
}
