//! Template candidate parser.
//!
//! Turns one loose filename (plus optional embedded tags) into a structured
//! (artist, title, track number, BPM) guess. Three independent strategies run
//! on every name and the most confident usable result wins:
//! - legacy pattern: `artist - album - NN title (bpm)`
//! - parts-based: reads the " - "-delimited parts
//! - token-based: reads whitespace tokens when there is no dash structure

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::{
    split_extension, BpmStyle, LocalTrack, MatchStatus, MatchedTrack, NameFormat,
    TemplateCandidate,
};
use crate::normalize::{
    append_bpm_if_missing, collapse_spaces, extract_bpm, extract_track_number,
    extract_track_prefix, format_track_prefix, has_token_overlap, is_catalog_code_token,
    normalize_for_match, normalize_template_base, strip_trailing_code_tokens, DIGITS_ONLY,
    LABEL_KEYWORDS,
};

// ============================================================================
// Strategy Confidence
// ============================================================================

pub const LEGACY_CONFIDENCE: f64 = 0.9;
pub const LABEL_PREFIX_CONFIDENCE: f64 = 0.95;
pub const LEADING_NUMBER_PART_CONFIDENCE: f64 = 0.8;
pub const TRAILING_NUMBER_PART_CONFIDENCE: f64 = 0.8;
pub const NUMBERED_ARTIST_PART_CONFIDENCE: f64 = 0.7;
pub const TWO_PART_CONFIDENCE: f64 = 0.6;
pub const MULTI_PART_CONFIDENCE: f64 = 0.55;
pub const VS_TOKEN_CONFIDENCE: f64 = 0.55;
pub const AMPERSAND_TOKEN_CONFIDENCE: f64 = 0.5;
pub const FIRST_TOKEN_CONFIDENCE: f64 = 0.4;
/// Reported when embedded tags share a token with the filename and replace its parse.
pub const TAG_CONFIDENCE: f64 = 0.85;

// ============================================================================
// Regex Patterns
// ============================================================================

/// "Artist - Album - 03 Title (128)"
pub static LEGACY_TEMPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<artist>.+?)\s+-\s+(?P<album>.+?)\s+-\s+(?P<track>\d+)\s+(?P<title>.+?)(?:\s+\((?P<bpm>\d+)\))?$",
    )
    .unwrap()
});

// ============================================================================
// Part Splitting
// ============================================================================

fn collect_parts<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut parts: Vec<String> = raw
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if parts.len() > 1 && parts.last().is_some_and(|p| is_catalog_code_token(p)) {
        parts.pop();
    }
    parts
}

/// Split on " - " separators, dropping empty parts and a trailing catalog code.
pub fn split_template_parts(s: &str) -> Vec<String> {
    collect_parts(s.split(" - "))
}

/// Looser split on bare "-", only when at least two hyphens exist so that a
/// single hyphenated name ("Jay-Z") is not torn apart.
pub fn split_template_parts_loose(s: &str) -> Vec<String> {
    if s.contains(" - ") {
        return split_template_parts(s);
    }
    if s.matches('-').count() < 2 {
        return vec![s.trim().to_string()];
    }
    collect_parts(s.split('-'))
}

pub fn is_label_part(s: &str) -> bool {
    LABEL_KEYWORDS.is_match(s)
}

// ============================================================================
// Strategies
// ============================================================================

/// Rigid `artist - album - NN title (bpm)` shape.
pub fn parse_legacy_template(base: &str) -> Option<TemplateCandidate> {
    let caps = LEGACY_TEMPLATE.captures(base)?;
    let field = |name: &str| caps.name(name).map_or("", |m| m.as_str()).trim().to_string();

    let mut candidate = TemplateCandidate {
        artist: field("artist"),
        title: field("title"),
        track: field("track"),
        confidence: LEGACY_CONFIDENCE,
        ..Default::default()
    };
    let bpm = field("bpm");
    if !bpm.is_empty() {
        candidate.bpm = bpm;
        candidate.bpm_style = Some(BpmStyle::Compact);
    }
    Some(candidate)
}

/// Reads the " - "-delimited parts list.
pub fn parse_template_from_parts(parts: &[String]) -> Option<TemplateCandidate> {
    let (first, last) = (parts.first()?, parts.last()?);

    // "03 - Artist - Title"
    if parts.len() >= 3 && DIGITS_ONLY.is_match(first) {
        return Some(TemplateCandidate {
            artist: parts[1].clone(),
            title: parts[2..].join(" - "),
            track: first.clone(),
            confidence: LEADING_NUMBER_PART_CONFIDENCE,
            ..Default::default()
        });
    }

    // "Artist - Album - 03 Title"
    if let Some((track, rest)) = extract_track_prefix(last) {
        return Some(TemplateCandidate {
            artist: first.clone(),
            title: rest,
            track,
            confidence: TRAILING_NUMBER_PART_CONFIDENCE,
            ..Default::default()
        });
    }

    // "03 Artist - Title"
    if let Some((track, rest)) = extract_track_prefix(first) {
        if !rest.is_empty() {
            let title = if parts.len() == 2 { &parts[1] } else { last };
            return Some(TemplateCandidate {
                artist: rest,
                title: title.clone(),
                track,
                confidence: NUMBERED_ARTIST_PART_CONFIDENCE,
                ..Default::default()
            });
        }
    }

    if parts.len() >= 3 {
        // "Some Records - Artist - Title"
        if is_label_part(first) {
            return Some(TemplateCandidate {
                artist: parts[1].clone(),
                title: parts[2..].join(" - "),
                confidence: LABEL_PREFIX_CONFIDENCE,
                ..Default::default()
            });
        }
        return Some(TemplateCandidate {
            artist: first.clone(),
            title: parts[1..].join(" - "),
            confidence: MULTI_PART_CONFIDENCE,
            ..Default::default()
        });
    }

    if parts.len() == 2 {
        return Some(TemplateCandidate {
            artist: first.clone(),
            title: parts[1].clone(),
            confidence: TWO_PART_CONFIDENCE,
            ..Default::default()
        });
    }

    None
}

fn is_vs_token(token: &str) -> bool {
    token.eq_ignore_ascii_case("vs") || token.eq_ignore_ascii_case("vs.")
}

fn join_artist_tokens(tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|t| if is_vs_token(t) { "Vs." } else { *t })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads whitespace tokens; used for names without dash structure.
pub fn parse_template_from_tokens(s: &str) -> Option<TemplateCandidate> {
    let (track, base) = match extract_track_prefix(s) {
        Some((track, rest)) => (track, rest),
        None => (String::new(), s.trim().to_string()),
    };
    let base = strip_trailing_code_tokens(&base);

    let mut tokens: Vec<&str> = base.split_whitespace().collect();
    // "Artist Artist Title" noise
    if tokens.len() >= 2 && tokens[0].eq_ignore_ascii_case(tokens[1]) {
        tokens.remove(0);
    }
    if tokens.is_empty() {
        return None;
    }

    let split_at = |idx: usize, confidence: f64| TemplateCandidate {
        artist: join_artist_tokens(&tokens[..idx + 2]),
        title: tokens[idx + 2..].join(" "),
        track: track.clone(),
        confidence,
        ..Default::default()
    };

    // "A vs. B Title": needs an artist before and a title after "vs. B"
    if let Some(idx) = tokens
        .iter()
        .enumerate()
        .position(|(i, t)| is_vs_token(t) && i >= 1 && i + 2 < tokens.len())
    {
        return Some(split_at(idx, VS_TOKEN_CONFIDENCE));
    }

    // "A & B Title": last interior ampersand
    if let Some(idx) = tokens
        .iter()
        .enumerate()
        .rposition(|(i, t)| *t == "&" && i >= 1 && i + 2 < tokens.len())
    {
        return Some(split_at(idx, AMPERSAND_TOKEN_CONFIDENCE));
    }

    if tokens.len() >= 2 {
        return Some(TemplateCandidate {
            artist: tokens[0].to_string(),
            title: tokens[1..].join(" "),
            track,
            confidence: FIRST_TOKEN_CONFIDENCE,
            ..Default::default()
        });
    }

    None
}

/// Strictly-highest confidence among usable candidates; the first one wins exact ties.
pub fn choose_best_candidate(
    candidates: impl IntoIterator<Item = Option<TemplateCandidate>>,
) -> Option<TemplateCandidate> {
    let mut best: Option<TemplateCandidate> = None;
    for candidate in candidates.into_iter().flatten() {
        if !candidate.is_usable() {
            continue;
        }
        let better = match &best {
            Some(current) => candidate.confidence > current.confidence,
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

// ============================================================================
// Candidate Builder
// ============================================================================

/// Best-guess structure for one local file. Returns the default (empty) candidate
/// when nothing usable was found; artist and title are always both set or both empty.
pub fn build_template_candidate(local: &LocalTrack) -> TemplateCandidate {
    let extracted = extract_bpm(local.stem());
    let normalized = strip_trailing_code_tokens(&normalize_template_base(&extracted.rest));

    let mut parts = split_template_parts(&normalized);
    if parts.len() <= 1 {
        parts = split_template_parts_loose(&normalized);
    }

    // A trailing bare number without a BPM marker could be anything
    if extracted.bpm.is_empty()
        && parts.len() >= 3
        && parts.last().is_some_and(|p| DIGITS_ONLY.is_match(p))
    {
        debug!(file = %local.original_name, "ambiguous numeric tail, leaving name alone");
        return TemplateCandidate::default();
    }

    let legacy = parse_legacy_template(&normalized);
    let from_parts = parse_template_from_parts(&parts);
    let from_tokens = parse_template_from_tokens(&normalized);
    let file_candidate = choose_best_candidate([legacy, from_parts, from_tokens]);

    let tag_artist = local.tag_artist();
    let tag_title = local.tag_title();
    if !tag_artist.is_empty() && !tag_title.is_empty() {
        let tag_norm = normalize_for_match(&format!("{} - {}", tag_artist, tag_title));
        let filename_norm = normalize_for_match(&extracted.rest);
        if has_token_overlap(&tag_norm, &filename_norm) {
            let track = file_candidate
                .as_ref()
                .map(|c| c.track.clone())
                .filter(|t| !t.is_empty())
                .or_else(|| extract_track_number(&extracted.rest).map(str::to_string))
                .unwrap_or_default();
            debug!(file = %local.original_name, "embedded tags agree with filename");
            return TemplateCandidate {
                artist: tag_artist.to_string(),
                title: tag_title.to_string(),
                track,
                bpm: extracted.bpm,
                bpm_style: extracted.style,
                confidence: TAG_CONFIDENCE,
            };
        }
    }

    let Some(mut candidate) = file_candidate else {
        return TemplateCandidate::default();
    };
    // The legacy shape may carry its own "(128)" when no "bpm" marker was present
    if !extracted.bpm.is_empty() || candidate.bpm.is_empty() {
        candidate.bpm = extracted.bpm;
        candidate.bpm_style = extracted.style;
    }
    candidate
}

// ============================================================================
// Proposed Names
// ============================================================================

/// Build "NN. Artist - Title (bpm).ext" (or "NN. Title (bpm).ext") for a usable candidate.
pub fn propose_name(candidate: &TemplateCandidate, format: NameFormat, original_name: &str) -> String {
    let title = append_bpm_if_missing(&candidate.title, &candidate.bpm, candidate.bpm_style);
    let base = match format {
        NameFormat::TrackTitle => title,
        NameFormat::TrackArtistTitle if candidate.artist.is_empty() => title,
        NameFormat::TrackArtistTitle => format!("{} - {}", candidate.artist, title),
    };
    let proposed = collapse_spaces(&format!("{}{}", format_track_prefix(&candidate.track), base));
    let (_, ext) = split_extension(original_name);
    format!("{}{}", proposed, ext)
}

/// Template-mode proposals: one entry per local file, "No Match" keeps the original name.
pub fn generate_template_renames(tracks: &[LocalTrack], format: NameFormat) -> Vec<MatchedTrack> {
    tracks
        .iter()
        .map(|local| {
            let candidate = build_template_candidate(local);
            if !candidate.is_usable() {
                return MatchedTrack::unmatched(local);
            }
            MatchedTrack {
                local_path: local.path.clone(),
                original_name: local.original_name.clone(),
                proposed_new_name: propose_name(&candidate, format, &local.original_name),
                confidence: candidate.confidence,
                status: MatchStatus::Matched,
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn local(name: &str) -> LocalTrack {
        LocalTrack::new(PathBuf::from("/music").join(name), name)
    }

    fn parts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_legacy_shape_wins() {
        let cand = build_template_candidate(&local("DJ Foo - Cool Track - 03 Night Drive (128 bpm).flac"));
        assert_eq!(cand.artist, "DJ Foo");
        assert_eq!(cand.title, "Night Drive");
        assert_eq!(cand.track, "03");
        assert_eq!(cand.bpm, "128");
        assert_eq!(cand.bpm_style, Some(BpmStyle::Space));
        assert_eq!(cand.confidence, LEGACY_CONFIDENCE);
    }

    #[test]
    fn test_legacy_proposed_name() {
        let renames = generate_template_renames(
            &[local("DJ Foo - Cool Track - 03 Night Drive (128 bpm).flac")],
            NameFormat::TrackArtistTitle,
        );
        assert_eq!(renames[0].proposed_new_name, "03. DJ Foo - Night Drive (128 bpm).flac");
        assert_eq!(renames[0].status, MatchStatus::Matched);
        assert_eq!(renames[0].confidence, 0.9);
    }

    #[test]
    fn test_track_title_format() {
        let renames = generate_template_renames(&[local("01. Artist - Title.mp3")], NameFormat::TrackTitle);
        assert_eq!(renames[0].proposed_new_name, "01. Title.mp3");
    }

    #[test]
    fn test_numbered_artist_part() {
        let cand = build_template_candidate(&local("01. Artist - Title.mp3"));
        assert_eq!(cand.artist, "Artist");
        assert_eq!(cand.title, "Title");
        assert_eq!(cand.track, "01");
        assert_eq!(cand.confidence, NUMBERED_ARTIST_PART_CONFIDENCE);
    }

    #[test]
    fn test_leading_number_part() {
        let cand = parse_template_from_parts(&parts(&["03", "Artist", "Title", "Remix"])).unwrap();
        assert_eq!(cand.track, "03");
        assert_eq!(cand.artist, "Artist");
        assert_eq!(cand.title, "Title - Remix");
        assert_eq!(cand.confidence, 0.8);
    }

    #[test]
    fn test_label_prefix_part() {
        let cand = parse_template_from_parts(&parts(&["Night Records", "Artist", "Title"])).unwrap();
        assert_eq!(cand.artist, "Artist");
        assert_eq!(cand.title, "Title");
        assert_eq!(cand.confidence, LABEL_PREFIX_CONFIDENCE);
    }

    #[test]
    fn test_multi_part_fallback() {
        let cand = parse_template_from_parts(&parts(&["Artist", "Title", "Extended"])).unwrap();
        assert_eq!(cand.artist, "Artist");
        assert_eq!(cand.title, "Title - Extended");
        assert_eq!(cand.confidence, MULTI_PART_CONFIDENCE);
    }

    #[test]
    fn test_two_part() {
        let cand = parse_template_from_parts(&parts(&["Artist", "Title"])).unwrap();
        assert_eq!(cand.confidence, TWO_PART_CONFIDENCE);
        assert!(parse_template_from_parts(&parts(&["Solo"])).is_none());
        assert!(parse_template_from_parts(&[]).is_none());
    }

    #[test]
    fn test_tokens_vs() {
        let cand = parse_template_from_tokens("Foo vs Bar Night Drive").unwrap();
        assert_eq!(cand.artist, "Foo Vs. Bar");
        assert_eq!(cand.title, "Night Drive");
        assert_eq!(cand.confidence, VS_TOKEN_CONFIDENCE);
    }

    #[test]
    fn test_tokens_ampersand() {
        let cand = parse_template_from_tokens("05 Foo & Bar Night Drive").unwrap();
        assert_eq!(cand.artist, "Foo & Bar");
        assert_eq!(cand.title, "Night Drive");
        assert_eq!(cand.track, "05");
        assert_eq!(cand.confidence, AMPERSAND_TOKEN_CONFIDENCE);
    }

    #[test]
    fn test_tokens_duplicate_artist_and_first_token() {
        let cand = parse_template_from_tokens("Foo Foo Night Drive").unwrap();
        assert_eq!(cand.artist, "Foo");
        assert_eq!(cand.title, "Night Drive");
        assert_eq!(cand.confidence, FIRST_TOKEN_CONFIDENCE);
        assert!(parse_template_from_tokens("Single").is_none());
    }

    #[test]
    fn test_loose_split_needs_two_hyphens() {
        assert_eq!(split_template_parts_loose("Jay-Z Song"), vec!["Jay-Z Song"]);
        assert_eq!(
            split_template_parts_loose("Artist-Album-Title"),
            vec!["Artist", "Album", "Title"]
        );
    }

    #[test]
    fn test_ambiguous_numeric_tail_abandons() {
        let cand = build_template_candidate(&local("Artist - Title - 12.mp3"));
        assert_eq!(cand, TemplateCandidate::default());
    }

    #[test]
    fn test_choose_best_first_wins_tie() {
        let a = TemplateCandidate {
            artist: "A".into(),
            title: "T".into(),
            confidence: 0.55,
            ..Default::default()
        };
        let b = TemplateCandidate {
            artist: "B".into(),
            ..a.clone()
        };
        let best = choose_best_candidate([Some(a), Some(b)]).unwrap();
        assert_eq!(best.artist, "A");
    }

    #[test]
    fn test_choose_best_skips_unusable() {
        let half = TemplateCandidate {
            artist: "A".into(),
            confidence: 0.99,
            ..Default::default()
        };
        let whole = TemplateCandidate {
            artist: "A".into(),
            title: "T".into(),
            confidence: 0.4,
            ..Default::default()
        };
        assert_eq!(choose_best_candidate([Some(half), None, Some(whole)]).unwrap().confidence, 0.4);
    }

    #[test]
    fn test_tags_win_when_they_overlap() {
        let track = local("03 foo_night_drive.mp3")
            .with_tags(Some("Foo".to_string()), Some("Night Drive".to_string()));
        let cand = build_template_candidate(&track);
        assert_eq!(cand.artist, "Foo");
        assert_eq!(cand.title, "Night Drive");
        assert_eq!(cand.track, "03");
        assert_eq!(cand.confidence, TAG_CONFIDENCE);
    }

    #[test]
    fn test_tags_ignored_without_overlap() {
        let track = local("Artist - Title.mp3")
            .with_tags(Some("Someone".to_string()), Some("Else".to_string()));
        let cand = build_template_candidate(&track);
        assert_eq!(cand.artist, "Artist");
        assert_eq!(cand.title, "Title");
    }

    #[test]
    fn test_no_structure_is_no_match() {
        let renames = generate_template_renames(&[local("Untitled.wav")], NameFormat::TrackArtistTitle);
        assert_eq!(renames[0].status, MatchStatus::NoMatch);
        assert_eq!(renames[0].proposed_new_name, "Untitled.wav");
        assert_eq!(renames[0].confidence, 0.0);
    }

    #[test]
    fn test_artist_and_title_both_or_neither() {
        let names = [
            "Untitled.wav",
            "A.mp3",
            "01.mp3",
            "Foo vs.mp3",
            "- - -.flac",
            "Some Records - Artist - Title.flac",
            "x & y.mp3",
            "03 - 04 - 05.mp3",
        ];
        for name in names {
            let cand = build_template_candidate(&local(name));
            assert_eq!(
                cand.artist.is_empty(),
                cand.title.is_empty(),
                "half-filled candidate for {:?}: {:?}",
                name,
                cand
            );
        }
    }

    #[test]
    fn test_extension_preserved() {
        let renames = generate_template_renames(
            &[local("Artist - Title.AIFF"), local("Foo Bar.flac")],
            NameFormat::TrackArtistTitle,
        );
        assert!(renames[0].proposed_new_name.ends_with(".AIFF"));
        assert!(renames[1].proposed_new_name.ends_with(".flac"));
    }
}
