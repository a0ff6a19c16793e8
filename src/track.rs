//! Track and duration types shared by the selection engine and its callers.
//!
//! The engine only ever looks at [`Track::duration`]. Everything else on a
//! track is display metadata carried forward for persistence and output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single candidate in a pool.
///
/// Immutable once fetched. Two tracks may share an `id`; each pool entry is
/// still its own unit of selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque catalog identifier.
    pub id: String,
    /// Length in whole seconds.
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artists: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Track {
    /// Bare candidate with no display metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, duration: u32) -> Self {
        Self {
            id: id.into(),
            duration,
            ..Self::default()
        }
    }

    /// Name to show a user, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    #[must_use]
    pub fn display_artists(&self) -> String {
        if self.artists.is_empty() {
            "Unknown".to_string()
        } else {
            self.artists.join(", ")
        }
    }
}

/// Summed duration of any run of tracks, in seconds.
#[must_use]
pub fn total_duration<'a>(tracks: impl IntoIterator<Item = &'a Track>) -> u64 {
    tracks.into_iter().map(|track| u64::from(track.duration)).sum()
}

/// Requested playlist length in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetDuration(u64);

impl TargetDuration {
    #[must_use]
    pub const fn from_secs(seconds: u64) -> Self {
        Self(seconds)
    }

    /// Build a target from the hours/minutes/seconds a user typed in.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn from_hms(hours: u64, minutes: u64, seconds: u64) -> Option<Self> {
        hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(seconds)
            .map(Self)
    }

    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_hms(self.0))
    }
}

/// `H:MM:SS`, or `M:SS` under an hour.
#[must_use]
pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_hours_and_minutes() {
        let target = TargetDuration::from_hms(1, 20, 0).unwrap();
        assert_eq!(target.as_secs(), 4800);
        assert_eq!(target.to_string(), "1:20:00");
    }

    #[test]
    fn test_target_overflow_is_rejected() {
        assert!(TargetDuration::from_hms(u64::MAX, 0, 0).is_none());
        assert!(TargetDuration::from_hms(0, u64::MAX, 1).is_none());
    }

    #[test]
    fn test_format_under_an_hour() {
        assert_eq!(format_hms(0), "0:00");
        assert_eq!(format_hms(59), "0:59");
        assert_eq!(format_hms(605), "10:05");
        assert_eq!(format_hms(3600), "1:00:00");
    }

    #[test]
    fn test_total_duration_counts_duplicates() {
        let tracks = vec![Track::new("a", 100), Track::new("a", 100), Track::new("b", 50)];
        assert_eq!(total_duration(&tracks), 250);
    }

    #[test]
    fn test_display_fallbacks() {
        let bare = Track::new("spotify:track:1", 200);
        assert_eq!(bare.display_name(), "spotify:track:1");
        assert_eq!(bare.display_artists(), "Unknown");

        let named = Track {
            name: Some("Blue in Green".to_string()),
            artists: vec!["Miles Davis".to_string(), "Bill Evans".to_string()],
            ..bare
        };
        assert_eq!(named.display_name(), "Blue in Green");
        assert_eq!(named.display_artists(), "Miles Davis, Bill Evans");
    }
}
