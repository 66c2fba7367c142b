//! Core data models for filename reconciliation.
//!
//! This module contains the struct definitions and enums shared by the
//! template parser, the remote listing extractor, the matcher and the renamer.

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Local Files
// ============================================================================

/// Audio file found by the directory scan. Never mutated after the scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LocalTrack {
    pub path: PathBuf,
    pub original_name: String, // File name including extension
    pub tag_artist: Option<String>,
    pub tag_title: Option<String>,
}

impl LocalTrack {
    pub fn new(path: PathBuf, original_name: impl Into<String>) -> Self {
        Self {
            path,
            original_name: original_name.into(),
            tag_artist: None,
            tag_title: None,
        }
    }

    pub fn with_tags(mut self, artist: Option<String>, title: Option<String>) -> Self {
        self.tag_artist = artist.filter(|a| !a.trim().is_empty());
        self.tag_title = title.filter(|t| !t.trim().is_empty());
        self
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        split_extension(&self.original_name).0
    }

    /// Extension including the leading dot, or "" when there is none.
    pub fn extension(&self) -> &str {
        split_extension(&self.original_name).1
    }

    /// Trimmed embedded artist, "" when absent.
    pub fn tag_artist(&self) -> &str {
        self.tag_artist.as_deref().map(str::trim).unwrap_or("")
    }

    /// Trimmed embedded title, "" when absent.
    pub fn tag_title(&self) -> &str {
        self.tag_title.as_deref().map(str::trim).unwrap_or("")
    }
}

/// Split "name.ext" into ("name", ".ext"). The extension is everything from
/// the last dot, so "a.b.flac" yields ("a.b", ".flac") and "noext" yields ("noext", "").
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

// ============================================================================
// Template Candidates
// ============================================================================

/// How a BPM annotation was written in the source filename, kept so the
/// proposed name can reproduce it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BpmStyle {
    /// "128 bpm"
    Space,
    /// "128bpm"
    Compact,
}

/// Structured guess produced by one parsing strategy.
/// The default value means "no usable structure found".
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TemplateCandidate {
    pub artist: String,
    pub title: String,
    pub track: String, // Track number as written, e.g. "03"
    pub bpm: String,   // BPM digits, "" when absent
    pub bpm_style: Option<BpmStyle>,
    pub confidence: f64, // Fixed per-strategy constant in [0, 1]
}

impl TemplateCandidate {
    /// A candidate is only usable when both artist and title are present.
    pub fn is_usable(&self) -> bool {
        !self.artist.is_empty() && !self.title.is_empty()
    }
}

// ============================================================================
// Remote Listing
// ============================================================================

/// Storefront the remote listing was scraped from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Bandcamp,
    Beatport,
}

impl Source {
    pub fn label(self) -> &'static str {
        match self {
            Source::Bandcamp => "Bandcamp",
            Source::Beatport => "Beatport",
        }
    }

    /// Minimum rating a local file must reach before a remote track may claim it.
    pub fn min_confidence(self) -> f64 {
        match self {
            Source::Beatport => 0.25,
            Source::Bandcamp => 0.0,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Track recovered from a storefront page. Position in the listing matters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AlbumTrack {
    pub title: String,
    pub artist: String, // Empty means "use the album artist"
    pub track_num: i64,
    pub track_num_explicit: bool, // false when inferred from list position
    pub track_id: i64,            // 0 = unknown
}

/// Album-level listing built once per fetch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlbumData {
    pub artist: String,
    pub title: String,
    pub tracks: Vec<AlbumTrack>,
    pub source: Source,
}

impl AlbumData {
    pub fn new(source: Source) -> Self {
        Self {
            artist: String::new(),
            title: String::new(),
            tracks: Vec::new(),
            source,
        }
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// Outcome label shown next to a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStatus {
    Matched,
    NoMatch,
    Storefront(Source),
    Ai,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Matched => f.write_str("Matched"),
            MatchStatus::NoMatch => f.write_str("No Match"),
            MatchStatus::Storefront(source) => write!(f, "{} Match", source),
            MatchStatus::Ai => f.write_str("AI Match"),
        }
    }
}

impl Serialize for MatchStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Proposed rename for one local file.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedTrack {
    pub local_path: PathBuf,
    pub original_name: String,
    pub proposed_new_name: String,
    pub confidence: f64,
    pub status: MatchStatus,
}

impl MatchedTrack {
    /// Entry for a file that keeps its name.
    pub fn unmatched(local: &LocalTrack) -> Self {
        Self {
            local_path: local.path.clone(),
            original_name: local.original_name.clone(),
            proposed_new_name: local.original_name.clone(),
            confidence: 0.0,
            status: MatchStatus::NoMatch,
        }
    }

    pub fn is_rename(&self) -> bool {
        self.original_name != self.proposed_new_name
    }
}

/// Shape of names produced in template mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NameFormat {
    /// "03. Artist - Title.ext"
    #[default]
    TrackArtistTitle,
    /// "03. Title.ext"
    TrackTitle,
}

// ============================================================================
// Rename Statistics
// ============================================================================

/// Counters reported by the rename pass.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameSummary {
    pub renamed: usize,
    pub unchanged: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

impl RenameSummary {
    pub fn message(&self) -> String {
        format!("Successfully renamed {} track(s).", self.renamed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("Song.flac"), ("Song", ".flac"));
        assert_eq!(split_extension("01. A.B - C.mp3"), ("01. A.B - C", ".mp3"));
        assert_eq!(split_extension("noext"), ("noext", ""));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(MatchStatus::Matched.to_string(), "Matched");
        assert_eq!(MatchStatus::NoMatch.to_string(), "No Match");
        assert_eq!(
            MatchStatus::Storefront(Source::Beatport).to_string(),
            "Beatport Match"
        );
    }

    #[test]
    fn test_with_tags_drops_blank_values() {
        let track = LocalTrack::new(PathBuf::from("/m/a.mp3"), "a.mp3")
            .with_tags(Some("  ".to_string()), Some(" Title ".to_string()));
        assert_eq!(track.tag_artist, None);
        assert_eq!(track.tag_title(), "Title");
    }

    #[test]
    fn test_min_confidence_by_source() {
        assert_eq!(Source::Beatport.min_confidence(), 0.25);
        assert_eq!(Source::Bandcamp.min_confidence(), 0.0);
    }

    #[test]
    fn test_matched_track_serializes_camel_case() {
        let local = LocalTrack::new(PathBuf::from("/m/a.mp3"), "a.mp3");
        let json = serde_json::to_string(&MatchedTrack::unmatched(&local)).unwrap();
        assert!(json.contains("\"proposedNewName\":\"a.mp3\""));
        assert!(json.contains("\"status\":\"No Match\""));
    }
}
