//! Greedy assignment of remote listing tracks to local files.
//!
//! Remote tracks are processed in listing order. Each one claims the best
//! still-unclaimed local file whose rating clears the storefront's acceptance
//! floor; claimed files never return to the pool. Remote tracks that claim
//! nothing are dropped from the output.

use tracing::{debug, info};

use crate::models::{AlbumData, AlbumTrack, LocalTrack, MatchStatus, MatchedTrack, Source};
use crate::normalize::clean_track_title;
use crate::scoring::{score_candidate, LocalKeys, RemoteKeys, NO_RATING};

// ============================================================================
// Naming
// ============================================================================

/// Album artist, else the part of the album title before " - ".
pub fn album_artist_fallback(album: &AlbumData) -> String {
    let artist = album.artist.trim();
    if !artist.is_empty() {
        return artist.to_string();
    }
    album
        .title
        .split_once(" - ")
        .map(|(artist, _)| artist.trim().to_string())
        .unwrap_or_default()
}

/// Track number shown in the proposed name. The remote number is used unless
/// the local file's own leading number should override it: always when the
/// remote number was inferred, and on Beatport when explicit numbers disagree.
pub fn display_track_number(source: Source, track: &AlbumTrack, local_number: Option<i64>) -> i64 {
    match local_number {
        Some(n) if !track.track_num_explicit => n,
        Some(n) if source == Source::Beatport && track.track_num != n => n,
        _ => track.track_num,
    }
}

/// "NN. <name>.<ext>" for an accepted match.
pub fn proposed_name(album: &AlbumData, track: &AlbumTrack, number: i64, extension: &str) -> String {
    let title = if track.track_num_explicit && track.track_num > 0 {
        clean_track_title(&track.title, track.track_num)
    } else {
        track.title.clone()
    };

    let track_artist = track.artist.trim();
    let album_artist = album_artist_fallback(album);
    let body = if title.contains('-') {
        title
    } else if !track_artist.is_empty() {
        format!("{} - {}", track_artist, title)
    } else if !album_artist.is_empty() {
        format!("{} - {}", album_artist, title)
    } else {
        title
    };

    format!("{:02}. {}{}", number, body, extension)
}

// ============================================================================
// Matching
// ============================================================================

/// Pool of local files still available for claiming.
struct CandidatePool<'a> {
    locals: &'a [LocalTrack],
    keys: Vec<LocalKeys>,
    claimed: Vec<bool>,
    remaining: usize,
}

impl<'a> CandidatePool<'a> {
    fn new(locals: &'a [LocalTrack]) -> Self {
        Self {
            locals,
            keys: locals.iter().map(LocalKeys::new).collect(),
            claimed: vec![false; locals.len()],
            remaining: locals.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Highest-rated unclaimed file; the earliest wins ties.
    fn best_for(&self, track: &AlbumTrack, remote: &RemoteKeys) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        let mut best_rating = NO_RATING;
        for (idx, keys) in self.keys.iter().enumerate() {
            if self.claimed[idx] {
                continue;
            }
            let rating = score_candidate(track, remote, keys);
            if rating > best_rating {
                best_rating = rating;
                best = Some((idx, rating));
            }
        }
        best
    }

    fn claim(&mut self, idx: usize) -> &'a LocalTrack {
        self.claimed[idx] = true;
        self.remaining -= 1;
        &self.locals[idx]
    }
}

/// Match the remote listing against the scanned files.
pub fn match_tracks(album: &AlbumData, locals: &[LocalTrack]) -> Vec<MatchedTrack> {
    let floor = album.source.min_confidence();
    let mut pool = CandidatePool::new(locals);
    let mut matched = Vec::new();

    for track in &album.tracks {
        if pool.is_empty() {
            break;
        }
        debug!("Processing remote track '{}' (#{})", track.title, track.track_num);

        let remote = RemoteKeys::new(track, &album.artist);
        let Some((idx, rating)) = pool.best_for(track, &remote) else {
            continue;
        };
        if rating < floor {
            debug!(
                "  Best rating {:.3} below {} floor {:.2}, skipping",
                rating, album.source, floor
            );
            continue;
        }

        let local_number = pool.keys[idx].leading_number;
        let local = pool.claim(idx);
        let number = display_track_number(album.source, track, local_number);
        let proposed = proposed_name(album, track, number, local.extension());
        info!("{} -> {} ({:.2})", local.original_name, proposed, rating);

        matched.push(MatchedTrack {
            local_path: local.path.clone(),
            original_name: local.original_name.clone(),
            proposed_new_name: proposed,
            confidence: rating,
            status: MatchStatus::Storefront(album.source),
        });
    }

    matched
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::split_extension;
    use rustc_hash::FxHashSet;
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

    fn album(source: Source, artist: &str, tracks: Vec<AlbumTrack>) -> AlbumData {
        AlbumData {
            artist: artist.to_string(),
            title: String::new(),
            tracks,
            source,
        }
    }

    #[test]
    fn test_strips_duplicated_prefix_and_uses_album_artist() {
        let listing = album(Source::Bandcamp, "DJ Foo", vec![remote("03. Night Drive", 3, true)]);
        let result = match_tracks(&listing, &[local("Night Drive.flac")]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].proposed_new_name, "03. DJ Foo - Night Drive.flac");
        assert_eq!(result[0].status.to_string(), "Bandcamp Match");

        let no_artist = album(Source::Bandcamp, "", vec![remote("03. Night Drive", 3, true)]);
        let result = match_tracks(&no_artist, &[local("Night Drive.flac")]);
        assert_eq!(result[0].proposed_new_name, "03. Night Drive.flac");
    }

    #[test]
    fn test_album_artist_from_title() {
        let mut listing = album(Source::Bandcamp, "  ", vec![]);
        listing.title = "DJ Foo - Night EP".to_string();
        assert_eq!(album_artist_fallback(&listing), "DJ Foo");
        listing.title = "Night EP".to_string();
        assert_eq!(album_artist_fallback(&listing), "");
    }

    #[test]
    fn test_name_shapes() {
        let listing = album(Source::Bandcamp, "Album Artist", vec![]);
        let hyphenated = remote("Guest - Night Drive", 2, true);
        assert_eq!(proposed_name(&listing, &hyphenated, 2, ".mp3"), "02. Guest - Night Drive.mp3");

        let mut with_artist = remote("Night Drive", 2, true);
        with_artist.artist = "Guest".to_string();
        assert_eq!(proposed_name(&listing, &with_artist, 2, ".mp3"), "02. Guest - Night Drive.mp3");

        let inferred = remote("1 - Night Drive", 1, false);
        assert_eq!(proposed_name(&listing, &inferred, 1, ".wav"), "01. 1 - Night Drive.wav");
    }

    #[test]
    fn test_display_track_number() {
        let explicit = remote("A", 3, true);
        let inferred = remote("A", 3, false);
        assert_eq!(display_track_number(Source::Bandcamp, &explicit, Some(5)), 3);
        assert_eq!(display_track_number(Source::Beatport, &explicit, Some(5)), 5);
        assert_eq!(display_track_number(Source::Beatport, &explicit, Some(3)), 3);
        assert_eq!(display_track_number(Source::Bandcamp, &inferred, Some(5)), 5);
        assert_eq!(display_track_number(Source::Beatport, &explicit, None), 3);
    }

    #[test]
    fn test_number_confirmation_breaks_tie() {
        let listing = album(Source::Bandcamp, "", vec![remote("Track One Remix", 1, true)]);
        let locals = [local("Track One Edit.mp3"), local("01 Track One Edit.mp3")];
        let result = match_tracks(&listing, &locals);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].original_name, "01 Track One Edit.mp3");
    }

    #[test]
    fn test_exclusive_and_bounded() {
        let listing = album(
            Source::Bandcamp,
            "DJ Foo",
            vec![
                remote("Night Drive", 1, true),
                remote("Night Drive (Reprise)", 2, true),
                remote("Sunrise", 3, true),
            ],
        );
        let locals = [local("night drive.mp3"), local("sunrise.flac")];
        let result = match_tracks(&listing, &locals);
        assert!(result.len() <= locals.len().min(listing.tracks.len()));
        let paths: FxHashSet<&PathBuf> = result.iter().map(|m| &m.local_path).collect();
        assert_eq!(paths.len(), result.len());
        for m in &result {
            assert_eq!(split_extension(&m.proposed_new_name).1, split_extension(&m.original_name).1);
            assert!(m.confidence >= 0.0);
        }
    }

    #[test]
    fn test_greedy_claims_in_listing_order() {
        let listing = album(
            Source::Bandcamp,
            "",
            vec![remote("Night Drive", 1, true), remote("Night Drive Dub", 2, true)],
        );
        let locals = [local("Night Drive Dub.mp3")];
        let result = match_tracks(&listing, &locals);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].proposed_new_name, "01. Night Drive.mp3");
    }

    #[test]
    fn test_beatport_floor_rejects_weak_matches() {
        let beatport = album(Source::Beatport, "DJ Foo", vec![remote("Night Drive", 1, true)]);
        let locals = [local("completely different.mp3")];
        assert!(match_tracks(&beatport, &locals).is_empty());

        let bandcamp = album(Source::Bandcamp, "DJ Foo", vec![remote("Night Drive", 1, true)]);
        let result = match_tracks(&bandcamp, &locals);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].confidence, 0.0);
    }

    #[test]
    fn test_empty_inputs() {
        let listing = album(Source::Bandcamp, "", vec![remote("A", 1, true)]);
        assert!(match_tracks(&listing, &[]).is_empty());
        let empty = album(Source::Bandcamp, "", vec![]);
        assert!(match_tracks(&empty, &[local("a.mp3")]).is_empty());
    }
}
