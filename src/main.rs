//! # Tempo - Playlists That Fit
//!
//! Builds playlists whose total length matches the time you have, from a
//! catalog export of candidate tracks.
//!
//! ## Usage
//!
//! ```bash
//! # A playlist for an 80 minute drive
//! tempo generate --catalog recent.json --hours 1 --minutes 20
//!
//! # Different every time, and saved
//! tempo generate --catalog recent.json --minutes 45 --shuffle --save --title "Run"
//!
//! # Check the greedy strategy on a small pool
//! tempo validate --catalog small.json --target-seconds 900 --tolerance 30
//!
//! # Saved playlists
//! tempo playlists list
//! tempo playlists show 3
//! ```

use anyhow::Result;
use clap::Parser;
use tempo::{cli, commands};

/// Main entry point for Tempo.
///
/// Initializes logging, parses command-line arguments and hands them to the
/// command router.
///
/// # Logging
///
/// Controlled via `RUST_LOG`:
/// - `RUST_LOG=debug tempo generate ...` - Enable debug logging
/// - `RUST_LOG=tempo::playlist=trace tempo generate ...` - Follow every attempt
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(args, &mut out)
}
