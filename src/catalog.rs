//! # Catalog Module
//!
//! Where candidate pools come from. The selection engine never fetches
//! anything itself; a [`CandidateSource`] hands it a finished pool.
//!
//! [`JsonCatalog`] reads catalog exports in the shape streaming services
//! return track objects:
//!
//! ```json
//! { "tracks": [
//!   { "id": "4u7EnebtmKWzUH433cf5Qv",
//!     "name": "Bohemian Rhapsody",
//!     "duration_ms": 354320,
//!     "artists": [{ "name": "Queen" }],
//!     "href": "https://api.example.com/v1/tracks/4u7EnebtmKWzUH433cf5Qv",
//!     "album": { "images": [{ "url": "https://img.example.com/cover.jpg" }] } }
//! ] }
//! ```
//!
//! A bare top-level array of track objects is accepted too.

use crate::track::Track;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// What to ask a catalog for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedCriteria {
    /// Keep at most this many candidates, after shuffling.
    pub limit: Option<usize>,
    /// Shuffle the pool so repeated requests give different playlists.
    pub shuffle: bool,
    /// Makes the shuffle reproducible.
    pub seed: Option<u64>,
    /// Drop later entries whose id was already seen.
    pub dedup: bool,
}

/// Anything that can produce a candidate pool.
pub trait CandidateSource {
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn fetch_candidates(&self, criteria: &SeedCriteria) -> Result<Vec<Track>>;
}

/// A catalog export on disk.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CandidateSource for JsonCatalog {
    fn fetch_candidates(&self, criteria: &SeedCriteria) -> Result<Vec<Track>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read catalog: {}", self.path.display()))?;
        let tracks = parse_catalog(&content)
            .with_context(|| format!("Invalid catalog file: {}", self.path.display()))?;
        info!("Loaded {} tracks from {}", tracks.len(), self.path.display());
        Ok(apply_criteria(tracks, criteria))
    }
}

/// Parse catalog JSON into tracks, skipping entries that cannot be used.
pub fn parse_catalog(content: &str) -> Result<Vec<Track>> {
    let export: CatalogExport = serde_json::from_str(content).context("Catalog is not valid JSON")?;
    let entries = match export {
        CatalogExport::Bare(tracks) | CatalogExport::Wrapped { tracks } => tracks,
    };

    let mut tracks = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        match entry.into_track() {
            Some(track) => tracks.push(track),
            None => warn!("Skipping catalog entry {position}: no id, href or name"),
        }
    }
    Ok(tracks)
}

/// Apply dedup, shuffle and limit, in that order.
#[must_use]
pub fn apply_criteria(mut tracks: Vec<Track>, criteria: &SeedCriteria) -> Vec<Track> {
    if criteria.dedup {
        tracks = dedup_by_id(tracks);
    }

    if criteria.shuffle {
        match criteria.seed {
            Some(seed) => tracks.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => tracks.shuffle(&mut thread_rng()),
        }
    }

    if let Some(limit) = criteria.limit {
        tracks.truncate(limit);
    }

    debug!("Pool has {} candidates after {criteria:?}", tracks.len());
    tracks
}

/// Keep the first occurrence of each id, preserving order.
#[must_use]
pub fn dedup_by_id(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.id.clone()))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogExport {
    Bare(Vec<CatalogTrack>),
    Wrapped { tracks: Vec<CatalogTrack> },
}

#[derive(Debug, Deserialize)]
struct CatalogTrack {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<CatalogArtist>,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    album: Option<CatalogAlbum>,
}

#[derive(Debug, Deserialize)]
struct CatalogArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CatalogAlbum {
    #[serde(default)]
    images: Vec<CatalogImage>,
}

#[derive(Debug, Deserialize)]
struct CatalogImage {
    url: String,
}

impl CatalogTrack {
    fn into_track(self) -> Option<Track> {
        let id = self
            .id
            .or_else(|| self.href.clone())
            .or_else(|| self.name.clone())?;
        let image_url = self
            .album
            .and_then(|album| album.images.into_iter().next())
            .map(|image| image.url);

        Some(Track {
            id,
            duration: ms_to_secs(self.duration_ms),
            name: self.name,
            artists: self.artists.into_iter().map(|artist| artist.name).collect(),
            href: self.href,
            image_url,
        })
    }
}

/// Round milliseconds to the nearest whole second.
fn ms_to_secs(ms: u64) -> u32 {
    u32::try_from(ms.saturating_add(500) / 1000).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EXPORT: &str = r#"{
        "tracks": [
            { "id": "a", "name": "Song A", "duration_ms": 180499,
              "artists": [{ "name": "First" }, { "name": "Second" }],
              "href": "https://api.example.com/v1/tracks/a",
              "album": { "images": [{ "url": "https://img.example.com/a.jpg" }, { "url": "small.jpg" }] } },
            { "name": "Song B", "duration_ms": 240500, "href": "https://api.example.com/v1/tracks/b" },
            { "duration_ms": 1000 },
            { "id": "a", "name": "Song A again", "duration_ms": 180000 }
        ]
    }"#;

    #[test]
    fn test_parse_wrapped_export() {
        let tracks = parse_catalog(EXPORT).unwrap();
        assert_eq!(tracks.len(), 3, "entry with no identity is skipped");

        assert_eq!(tracks[0].id, "a");
        assert_eq!(tracks[0].duration, 180);
        assert_eq!(tracks[0].artists, vec!["First", "Second"]);
        assert_eq!(tracks[0].image_url.as_deref(), Some("https://img.example.com/a.jpg"));

        assert_eq!(tracks[1].id, "https://api.example.com/v1/tracks/b");
        assert_eq!(tracks[1].duration, 241);
        assert!(tracks[1].image_url.is_none());
    }

    #[test]
    fn test_parse_bare_array() {
        let tracks = parse_catalog(r#"[{ "name": "Only", "duration_ms": 60000 }]"#).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "Only");
        assert_eq!(tracks[0].duration, 60);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_catalog("not json").is_err());
        assert!(parse_catalog(r#"{ "songs": [] }"#).is_err());
    }

    #[test]
    fn test_duplicates_kept_unless_asked() {
        let tracks = parse_catalog(EXPORT).unwrap();
        let kept = apply_criteria(tracks.clone(), &SeedCriteria::default());
        assert_eq!(kept.len(), 3);

        let deduped = apply_criteria(
            tracks,
            &SeedCriteria {
                dedup: true,
                ..SeedCriteria::default()
            },
        );
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name.as_deref(), Some("Song A"));
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let tracks: Vec<Track> = (0..50).map(|i| Track::new(format!("t{i}"), 100 + i)).collect();
        let criteria = SeedCriteria {
            shuffle: true,
            seed: Some(7),
            ..SeedCriteria::default()
        };

        let first = apply_criteria(tracks.clone(), &criteria);
        let second = apply_criteria(tracks.clone(), &criteria);
        assert_eq!(first, second);
        assert_ne!(first, tracks, "50 tracks should not shuffle back into order");

        let mut sorted = first;
        sorted.sort_by_key(|track| track.duration);
        assert_eq!(sorted, tracks);
    }

    #[test]
    fn test_limit_applies_last() {
        let tracks: Vec<Track> = (0..10).map(|i| Track::new(format!("t{i}"), 60)).collect();
        let limited = apply_criteria(
            tracks,
            &SeedCriteria {
                limit: Some(4),
                ..SeedCriteria::default()
            },
        );
        let ids: Vec<&str> = limited.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2", "t3"]);
    }

    #[test]
    fn test_fetch_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, EXPORT).unwrap();

        let catalog = JsonCatalog::new(&path);
        let tracks = catalog.fetch_candidates(&SeedCriteria::default()).unwrap();
        assert_eq!(tracks.len(), 3);

        let missing = JsonCatalog::new(dir.path().join("missing.json"));
        assert!(missing.fetch_candidates(&SeedCriteria::default()).is_err());
    }

    #[test]
    fn test_ms_rounding() {
        assert_eq!(ms_to_secs(0), 0);
        assert_eq!(ms_to_secs(499), 0);
        assert_eq!(ms_to_secs(500), 1);
        assert_eq!(ms_to_secs(u64::MAX), u32::MAX);
    }
}
