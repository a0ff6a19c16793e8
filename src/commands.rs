//! Subcommand handlers.
//!
//! Each handler wires a collaborator (catalog, playlist store) to the engine
//! and writes its result to `out`. User-facing failures come back as
//! `anyhow` errors with a message fit for a terminal.

use crate::algorithm::{ExactSearch, GreedyRepair, SelectionStrategy};
use crate::catalog::{CandidateSource, JsonCatalog, SeedCriteria};
use crate::cli::{self, EscalationArgs, LengthArgs, PlaylistAction, PoolArgs, StrategyKind};
use crate::completion;
use crate::config::{EngineConfig, RuntimeConfig};
use crate::db::{PlaylistRecord, PlaylistStore};
use crate::oracle;
use crate::playlist::{Playlist, PlaylistBuilder, ResolveError};
use crate::track::{format_hms, TargetDuration, Track};
use anyhow::{bail, Context, Result};
use clap::CommandFactory;
use log::info;
use serde::Serialize;
use std::io::Write;

/// Options for `tempo generate` beyond pool and length.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub strategy: StrategyKind,
    pub save: bool,
    pub owner: String,
    pub title: Option<String>,
    pub json: bool,
}

/// Route a parsed command line to its handler.
pub fn run(args: cli::Args, out: &mut dyn Write) -> Result<()> {
    if let cli::Command::Completion { shell } = args.command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd, out);
        return Ok(());
    }

    let runtime = RuntimeConfig::resolve(args.db, args.config)?;

    match args.command {
        cli::Command::Generate {
            pool,
            length,
            escalation,
            strategy,
            save,
            owner,
            title,
            json,
        } => {
            let options = GenerateOptions {
                strategy,
                save,
                owner,
                title,
                json,
            };
            generate(&runtime, &pool, length, escalation, &options, out)
        }
        cli::Command::Validate {
            pool,
            target_seconds,
            tolerance,
            json,
        } => validate(&runtime, &pool, target_seconds, tolerance, json, out),
        cli::Command::Playlists { action } => playlists(&runtime, action, out),
        cli::Command::Completion { .. } => Ok(()),
    }
}

/// Build a playlist from a catalog and print (and maybe save) it.
pub fn generate(
    runtime: &RuntimeConfig,
    pool_args: &PoolArgs,
    length: LengthArgs,
    escalation: EscalationArgs,
    options: &GenerateOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let target = TargetDuration::from_hms(length.hours, length.minutes, length.seconds)
        .context("Requested length is too long")?;
    if target.as_secs() == 0 {
        bail!("Give a playlist length with --hours, --minutes or --seconds");
    }

    let config = apply_overrides(runtime.engine_config()?, escalation);
    let pool = load_pool(pool_args)?;

    let strategy: Box<dyn SelectionStrategy> = match options.strategy {
        StrategyKind::Greedy => Box::new(GreedyRepair),
        StrategyKind::Exact => Box::new(ExactSearch::with_limit(config.exact_search_limit)),
    };
    let builder = PlaylistBuilder::new(strategy.as_ref(), config.escalation_policy())?;
    let playlist = builder.resolve(&pool, target).map_err(explain_failure)?;

    let saved = if options.save {
        let title = options
            .title
            .clone()
            .unwrap_or_else(|| format!("{target} playlist"));
        let mut store = PlaylistStore::open(&runtime.db_path)?;
        Some(store.save_playlist(&options.owner, &title, &playlist)?)
    } else {
        None
    };

    if options.json {
        #[derive(Serialize)]
        struct GenerateReport<'a> {
            playlist: &'a Playlist,
            saved: Option<&'a PlaylistRecord>,
        }
        let report = GenerateReport {
            playlist: &playlist,
            saved: saved.as_ref(),
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    write_playlist(&playlist, out)?;
    if let Some(record) = saved {
        writeln!(out, "Saved as playlist {} '{}' for {}", record.id, record.title, record.owner)?;
    }
    Ok(())
}

/// Run the oracle comparison and print the report.
pub fn validate(
    runtime: &RuntimeConfig,
    pool_args: &PoolArgs,
    target_seconds: u64,
    tolerance: u64,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let config = runtime.engine_config()?;
    let pool = load_pool(pool_args)?;
    let report = oracle::compare(&pool, TargetDuration::from_secs(target_seconds), tolerance, &config)
        .map_err(|err| match err {
            ResolveError::PoolTooLarge { .. } => {
                anyhow::Error::new(err).context("Pool is too large for exhaustive search; narrow it with --limit")
            }
            other => explain_failure(other),
        })?;

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        writeln!(
            out,
            "{} tracks, target {}, tolerance ±{}s",
            report.pool_size,
            format_hms(report.target),
            report.tolerance
        )?;
        match report.exact_residual {
            Some(residual) => writeln!(out, "  exact:  matched ({residual:+}s)")?,
            None => writeln!(out, "  exact:  no selection within tolerance")?,
        }
        match (report.greedy_residual, report.greedy_tolerance, &report.greedy_error) {
            (Some(residual), Some(at), _) => writeln!(out, "  greedy: matched ({residual:+}s at ±{at}s)")?,
            (_, _, Some(error)) => writeln!(out, "  greedy: failed: {error}")?,
            _ => writeln!(out, "  greedy: failed")?,
        }
    }

    if !report.agrees() {
        bail!("Greedy selection gave up on a pool that exhaustive search can satisfy");
    }
    Ok(())
}

/// Handle `tempo playlists ...`.
pub fn playlists(runtime: &RuntimeConfig, action: PlaylistAction, out: &mut dyn Write) -> Result<()> {
    match action {
        PlaylistAction::List { owner } => {
            let store = PlaylistStore::open(&runtime.db_path)?;
            let records = store.list_playlists(owner.as_deref())?;
            if records.is_empty() {
                writeln!(out, "No saved playlists")?;
            }
            for record in records {
                writeln!(
                    out,
                    "{:>4}  {}  [{}]  {} of {}, {} tracks, {}",
                    record.id,
                    record.title,
                    record.owner,
                    format_hms(record.total_seconds),
                    format_hms(record.target_seconds),
                    record.tracks.len(),
                    record.created_at
                )?;
            }
        }
        PlaylistAction::Show { id, json } => {
            let store = PlaylistStore::open(&runtime.db_path)?;
            let Some(record) = store.get_playlist(id)? else {
                bail!("No saved playlist with id {id}");
            };
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
            } else {
                writeln!(
                    out,
                    "{} [{}]: {} of {} requested",
                    record.title,
                    record.owner,
                    format_hms(record.total_seconds),
                    format_hms(record.target_seconds)
                )?;
                for (position, track) in record.tracks.iter().enumerate() {
                    writeln!(
                        out,
                        "{:>3}. {} ({})",
                        position + 1,
                        track.name.as_deref().unwrap_or(&track.track_id),
                        format_hms(u64::from(track.duration))
                    )?;
                }
            }
        }
        PlaylistAction::Delete { id } => {
            let mut store = PlaylistStore::open(&runtime.db_path)?;
            if !store.delete_playlist(id)? {
                bail!("No saved playlist with id {id}");
            }
            writeln!(out, "Deleted playlist {id}")?;
        }
    }
    Ok(())
}

fn load_pool(pool_args: &PoolArgs) -> Result<Vec<Track>> {
    let criteria = SeedCriteria {
        limit: pool_args.limit,
        shuffle: pool_args.shuffle,
        seed: pool_args.seed,
        dedup: pool_args.dedup,
    };
    let pool = JsonCatalog::new(&pool_args.catalog).fetch_candidates(&criteria)?;
    info!("Selecting from {} candidates", pool.len());
    Ok(pool)
}

fn apply_overrides(mut config: EngineConfig, escalation: EscalationArgs) -> EngineConfig {
    if let Some(initial) = escalation.initial_tolerance {
        config.initial_tolerance = initial;
    }
    if let Some(step) = escalation.step {
        config.tolerance_step = step;
    }
    if let Some(max) = escalation.max_tolerance {
        config.max_tolerance = max;
    }
    if let Some(attempts) = escalation.max_attempts {
        config.max_attempts = attempts;
    }
    config
}

/// Put a user-facing explanation on top of an engine failure.
fn explain_failure(err: ResolveError) -> anyhow::Error {
    let message = match &err {
        ResolveError::NoCandidates => "Not enough tracks: the catalog gave no candidates",
        ResolveError::Unsatisfiable { .. } => "No combination of tracks comes close enough to that length",
        ResolveError::PoolTooLarge { .. } => "Too many candidates for exhaustive search; use --limit or --strategy greedy",
        ResolveError::DeadlineExceeded { .. } => "Ran out of time building the playlist",
        ResolveError::InvalidConfig(_) => "Escalation settings are invalid",
        ResolveError::InvariantViolation { .. } => "Selection produced an inconsistent playlist",
    };
    anyhow::Error::new(err).context(message)
}

fn write_playlist(playlist: &Playlist, out: &mut dyn Write) -> Result<()> {
    writeln!(
        out,
        "Playlist: {} requested, {} built ({:+}s, ±{}s after {} attempt{}, {})",
        playlist.target,
        format_hms(playlist.total_duration),
        playlist.residual_error,
        playlist.tolerance,
        playlist.attempts.len(),
        if playlist.attempts.len() == 1 { "" } else { "s" },
        playlist.strategy
    )?;
    for (position, track) in playlist.tracks.iter().enumerate() {
        writeln!(
            out,
            "{:>3}. {} - {} ({})",
            position + 1,
            track.display_name(),
            track.display_artists(),
            format_hms(u64::from(track.duration))
        )?;
    }
    Ok(())
}
