//! Rating functions for the matcher.
//!
//! This module contains:
//! - Token-gated Sørensen–Dice similarity between normalized strings
//! - Precomputed comparison keys for remote and local tracks
//! - The per-candidate rating (best of up to four comparisons)
//! - The track-number confirmation bonus

use strsim::sorensen_dice;
use tracing::debug;

use crate::models::{AlbumTrack, LocalTrack};
use crate::normalize::{has_token_overlap, leading_track_number, normalize_for_match};

// ============================================================================
// Score Constants
// ============================================================================

/// Added when the local file's leading number confirms an explicit remote number
pub const TRACK_NUMBER_BONUS: f64 = 0.12;

/// Ratings at or above this never receive the track-number bonus
pub const BONUS_CEILING: f64 = 0.9;

/// Starting point for the best-candidate search, below any reachable rating
pub const NO_RATING: f64 = -1.0;

// ============================================================================
// Similarity
// ============================================================================

/// Sørensen–Dice similarity of two normalized strings, 0.0 unless they share
/// at least one token.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() || !has_token_overlap(a, b) {
        return 0.0;
    }
    sorensen_dice(a, b)
}

// ============================================================================
// Comparison Keys
// ============================================================================

/// Normalized forms of one remote track, computed once per remote track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteKeys {
    pub title: String,
    /// "artist - title" with the track artist, else the album artist. "" when neither exists.
    pub full: String,
}

impl RemoteKeys {
    pub fn new(track: &AlbumTrack, album_artist: &str) -> Self {
        let track_artist = track.artist.trim();
        let full = if !track_artist.is_empty() {
            normalize_for_match(&format!("{} - {}", track_artist, track.title))
        } else if !album_artist.is_empty() {
            normalize_for_match(&format!("{} - {}", album_artist, track.title))
        } else {
            String::new()
        };
        Self {
            title: normalize_for_match(&track.title),
            full,
        }
    }
}

/// Normalized forms of one local file, computed once per scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalKeys {
    pub name: String,
    pub tag_title: String,
    pub tag_full: String,
    /// Leading track number of the file stem, e.g. 3 for "03 Song.flac"
    pub leading_number: Option<i64>,
}

impl LocalKeys {
    pub fn new(local: &LocalTrack) -> Self {
        let stem = local.stem();
        let tag_title = local.tag_title();
        let tag_artist = local.tag_artist();
        let tag_full = if !tag_title.is_empty() && !tag_artist.is_empty() {
            normalize_for_match(&format!("{} - {}", tag_artist, tag_title))
        } else {
            String::new()
        };
        Self {
            name: normalize_for_match(stem),
            tag_title: normalize_for_match(tag_title),
            tag_full,
            leading_number: leading_track_number(stem),
        }
    }
}

// ============================================================================
// Candidate Rating
// ============================================================================

/// Best of the filename and tag comparisons against the remote title and
/// "artist - title" forms.
pub fn rate_candidate(remote: &RemoteKeys, local: &LocalKeys) -> f64 {
    let from_name = similarity(&remote.title, &local.name).max(similarity(&remote.full, &local.name));
    let from_tags = similarity(&remote.title, &local.tag_title).max(similarity(&remote.full, &local.tag_full));
    from_name.max(from_tags)
}

/// Reward exact positional confirmation without pushing a rating past 1.0.
pub fn apply_track_number_bonus(rating: f64, track: &AlbumTrack, local_number: Option<i64>) -> f64 {
    let confirmed = track.track_num_explicit
        && track.track_num > 0
        && local_number == Some(track.track_num);
    if confirmed && rating < BONUS_CEILING {
        (rating + TRACK_NUMBER_BONUS).min(1.0)
    } else {
        rating
    }
}

/// Final rating of one local candidate for one remote track.
pub fn score_candidate(track: &AlbumTrack, remote: &RemoteKeys, local: &LocalKeys) -> f64 {
    let rating = rate_candidate(remote, local);
    let rated = apply_track_number_bonus(rating, track, local.leading_number);
    debug!(
        "  '{}' vs '{}': {:.3} (with number bonus {:.3})",
        remote.title, local.name, rating, rated
    );
    rated
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn local(name: &str) -> LocalTrack {
        LocalTrack::new(PathBuf::from(format!("/music/{}", name)), name)
    }

    fn remote(title: &str, num: i64, explicit: bool) -> AlbumTrack {
        AlbumTrack {
            title: title.to_string(),
            track_num: num,
            track_num_explicit: explicit,
            ..Default::default()
        }
    }

    #[test]
    fn test_similarity_requires_token_overlap() {
        assert!(!has_token_overlap("night drive", "totally unrelated"));
        assert_eq!(similarity("night drive", "totally unrelated"), 0.0);
        assert_eq!(similarity("night drive", "night drive"), 1.0);
        assert_eq!(similarity("", "night drive"), 0.0);
    }

    #[test]
    fn test_similarity_partial() {
        let score = similarity("night drive", "night drive extended mix");
        assert!(score > 0.4 && score < 1.0, "got {}", score);
    }

    #[test]
    fn test_remote_keys_artist_fallback() {
        let mut track = remote("Night Drive", 1, true);
        assert_eq!(RemoteKeys::new(&track, "").full, "");
        assert_eq!(RemoteKeys::new(&track, "DJ Foo").full, "dj foo night drive");
        track.artist = " Guest ".to_string();
        assert_eq!(RemoteKeys::new(&track, "DJ Foo").full, "guest night drive");
    }

    #[test]
    fn test_local_keys() {
        let keys = LocalKeys::new(
            &local("03 - DJ Foo - Night Drive.flac")
                .with_tags(Some("DJ Foo".to_string()), Some("Night Drive".to_string())),
        );
        assert_eq!(keys.name, "dj foo night drive");
        assert_eq!(keys.tag_title, "night drive");
        assert_eq!(keys.tag_full, "dj foo night drive");
        assert_eq!(keys.leading_number, Some(3));
    }

    #[test]
    fn test_rate_candidate_uses_tags() {
        let track = remote("Night Drive", 1, true);
        let remote_keys = RemoteKeys::new(&track, "DJ Foo");
        let untagged = LocalKeys::new(&local("track01.wav"));
        let tagged = LocalKeys::new(
            &local("track01.wav").with_tags(Some("DJ Foo".to_string()), Some("Night Drive".to_string())),
        );
        assert_eq!(rate_candidate(&remote_keys, &untagged), 0.0);
        assert_eq!(rate_candidate(&remote_keys, &tagged), 1.0);
    }

    #[test]
    fn test_track_number_bonus() {
        let track = remote("Track One", 1, true);
        let bonus = apply_track_number_bonus(0.6, &track, Some(1));
        assert!((bonus - 0.72).abs() < 1e-9);
        assert_eq!(apply_track_number_bonus(0.6, &track, Some(2)), 0.6);
        assert_eq!(apply_track_number_bonus(0.6, &track, None), 0.6);
        assert_eq!(apply_track_number_bonus(0.9, &track, Some(1)), 0.9);
        assert!((apply_track_number_bonus(0.89, &track, Some(1)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_track_number_bonus_requires_explicit_number() {
        let inferred = remote("Track One", 1, false);
        assert_eq!(apply_track_number_bonus(0.6, &inferred, Some(1)), 0.6);
        let unnumbered = remote("Track One", 0, true);
        assert_eq!(apply_track_number_bonus(0.6, &unnumbered, Some(0)), 0.6);
    }

    #[test]
    fn test_score_candidate_breaks_tie_with_number() {
        let track = remote("Track One Remix", 1, true);
        let keys = RemoteKeys::new(&track, "");
        let plain = LocalKeys::new(&local("Track One Edit.mp3"));
        let numbered = LocalKeys::new(&local("01 Track One Edit.mp3"));
        let base = rate_candidate(&keys, &plain);
        assert_eq!(base, rate_candidate(&keys, &numbered));
        assert!(base < BONUS_CEILING);
        assert!(score_candidate(&track, &keys, &numbered) > score_candidate(&track, &keys, &plain));
    }
}
