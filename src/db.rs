//! Saved playlists in SQLite.
//!
//! A saved playlist is a row in `playlists` plus one row per track in
//! `playlist_tracks`, ordered by `position`. Only what is needed to show the
//! playlist again or fetch playback metadata later is stored.

use crate::playlist::Playlist;
use anyhow::{Context, Result};
use log::{debug, info, trace};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

/// A playlist as it was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistRecord {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub target_seconds: u64,
    pub total_seconds: u64,
    pub created_at: String,
    pub tracks: Vec<SavedTrack>,
}

impl PlaylistRecord {
    #[must_use]
    pub fn track_ids(&self) -> Vec<&str> {
        self.tracks.iter().map(|track| track.track_id.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedTrack {
    pub track_id: String,
    pub name: Option<String>,
    pub duration: u32,
}

/// Playlist storage backed by one SQLite connection.
pub struct PlaylistStore {
    conn: Connection,
}

impl PlaylistStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open playlist database at {}", path.display()))?;
        debug!("Opened playlist database at {}", path.display());
        Self::with_connection(conn)
    }

    /// Throwaway store, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS playlists (
                id             INTEGER PRIMARY KEY,
                owner          TEXT    NOT NULL,
                title          TEXT    NOT NULL,
                target_seconds INTEGER NOT NULL,
                total_seconds  INTEGER NOT NULL,
                created_at     TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS playlist_tracks (
                playlist_id INTEGER NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                track_id    TEXT    NOT NULL,
                name        TEXT,
                duration    INTEGER NOT NULL,
                PRIMARY KEY (playlist_id, position)
            );
            CREATE INDEX IF NOT EXISTS idx_playlists_owner ON playlists(owner);",
        )
        .context("Failed to create playlist tables")?;
        Ok(Self { conn })
    }

    /// Store a resolved playlist under `owner`.
    pub fn save_playlist(&mut self, owner: &str, title: &str, playlist: &Playlist) -> Result<PlaylistRecord> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO playlists (owner, title, target_seconds, total_seconds) VALUES (?1, ?2, ?3, ?4)",
            params![
                owner,
                title,
                to_sql_int(playlist.target.as_secs()),
                to_sql_int(playlist.total_duration)
            ],
        )
        .with_context(|| format!("Failed to INSERT playlist '{title}' for {owner}"))?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO playlist_tracks (playlist_id, position, track_id, name, duration) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, track) in playlist.tracks.iter().enumerate() {
                trace!("Saving track {position} of playlist {id}: {}", track.id);
                stmt.execute(params![id, position, track.id, track.name, track.duration])
                    .with_context(|| format!("Failed to INSERT track {} into playlist {id}", track.id))?;
            }
        }

        tx.commit().context("Committing playlist transaction failed")?;
        info!("Saved playlist {id} '{title}' ({} tracks) for {owner}", playlist.tracks.len());

        self.get_playlist(id)?
            .with_context(|| format!("Playlist {id} vanished right after saving"))
    }

    /// All playlists, newest first, optionally for one owner.
    pub fn list_playlists(&self, owner: Option<&str>) -> Result<Vec<PlaylistRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM playlists WHERE (?1 IS NULL OR owner = ?1) ORDER BY id DESC",
        )?;
        let ids = stmt
            .query_map([owner], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Cannot query playlists")?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_playlist(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn get_playlist(&self, id: i64) -> Result<Option<PlaylistRecord>> {
        let header = self
            .conn
            .query_row(
                "SELECT id, owner, title, target_seconds, total_seconds, created_at FROM playlists WHERE id = ?1",
                [id],
                |row| {
                    Ok(PlaylistRecord {
                        id: row.get(0)?,
                        owner: row.get(1)?,
                        title: row.get(2)?,
                        target_seconds: from_sql_int(row.get(3)?),
                        total_seconds: from_sql_int(row.get(4)?),
                        created_at: row.get(5)?,
                        tracks: Vec::new(),
                    })
                },
            )
            .optional()
            .with_context(|| format!("Failed to query playlist {id}"))?;

        let Some(mut record) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT track_id, name, duration FROM playlist_tracks WHERE playlist_id = ?1 ORDER BY position",
        )?;
        record.tracks = stmt
            .query_map([id], |row| {
                Ok(SavedTrack {
                    track_id: row.get(0)?,
                    name: row.get(1)?,
                    duration: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to query tracks of playlist {id}"))?;

        Ok(Some(record))
    }

    /// Returns whether a playlist was deleted.
    pub fn delete_playlist(&mut self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM playlists WHERE id = ?1", [id])
            .with_context(|| format!("Failed to DELETE playlist {id}"))?;
        if deleted > 0 {
            info!("Deleted playlist {id}");
        }
        Ok(deleted > 0)
    }
}

fn to_sql_int(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX)
}

fn from_sql_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::GreedyRepair;
    use crate::playlist::{EscalationPolicy, PlaylistBuilder};
    use crate::track::{TargetDuration, Track};
    use tempfile::TempDir;

    fn sample_playlist() -> Playlist {
        let pool = vec![
            Track {
                name: Some("Opening".to_string()),
                ..Track::new("a", 600)
            },
            Track::new("b", 300),
        ];
        PlaylistBuilder::new(&GreedyRepair, EscalationPolicy::default())
            .unwrap()
            .resolve(&pool, TargetDuration::from_secs(900))
            .unwrap()
    }

    #[test]
    fn test_save_and_read_back() {
        let mut store = PlaylistStore::open_in_memory().unwrap();
        let playlist = sample_playlist();
        let record = store.save_playlist("alice", "Commute", &playlist).unwrap();

        assert_eq!(record.owner, "alice");
        assert_eq!(record.title, "Commute");
        assert_eq!(record.target_seconds, 900);
        assert_eq!(record.total_seconds, 900);
        assert_eq!(record.track_ids(), playlist.track_ids());
        assert_eq!(record.tracks[1].name.as_deref(), Some("Opening"));
        assert!(!record.created_at.is_empty());

        let fetched = store.get_playlist(record.id).unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn test_list_filters_by_owner() {
        let mut store = PlaylistStore::open_in_memory().unwrap();
        let playlist = sample_playlist();
        store.save_playlist("alice", "One", &playlist).unwrap();
        store.save_playlist("bob", "Two", &playlist).unwrap();
        store.save_playlist("alice", "Three", &playlist).unwrap();

        let all = store.list_playlists(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "Three", "newest first");

        let alice: Vec<String> = store
            .list_playlists(Some("alice"))
            .unwrap()
            .into_iter()
            .map(|record| record.title)
            .collect();
        assert_eq!(alice, vec!["Three", "One"]);
        assert!(store.list_playlists(Some("carol")).unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_tracks() {
        let mut store = PlaylistStore::open_in_memory().unwrap();
        let record = store.save_playlist("alice", "Gone", &sample_playlist()).unwrap();

        assert!(store.delete_playlist(record.id).unwrap());
        assert!(!store.delete_playlist(record.id).unwrap());
        assert!(store.get_playlist(record.id).unwrap().is_none());

        let orphans: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM playlist_tracks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tempo.db");

        let id = {
            let mut store = PlaylistStore::open(&path).unwrap();
            store.save_playlist("alice", "Kept", &sample_playlist()).unwrap().id
        };

        let store = PlaylistStore::open(&path).unwrap();
        let record = store.get_playlist(id).unwrap().unwrap();
        assert_eq!(record.title, "Kept");
        assert_eq!(record.tracks.len(), 2);
    }

    #[test]
    fn test_missing_playlist() {
        let store = PlaylistStore::open_in_memory().unwrap();
        assert!(store.get_playlist(42).unwrap().is_none());
    }
}
