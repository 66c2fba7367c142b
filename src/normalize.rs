//! Filename normalization for template parsing and match comparison.
//!
//! `normalize_for_match` output feeds every similarity score in the matcher,
//! so its tests double as matcher regression tests.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::models::BpmStyle;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// BPM wrapped in brackets: "(128 bpm)", "[174Bpm]". Tried first so no empty brackets remain.
pub static BPM_BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\(\[]\s*(\d{2,3})([\s_-]*)bpm\s*[\)\]]").unwrap());

/// Bare BPM annotation: "128 bpm", "128bpm", "128_BPM"
pub static BPM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d{2,3})([\s_-]*)bpm").unwrap());

/// Leading track number followed by a separator and text: "03 - Song", "7_Song", "12.Song"
pub static TRACK_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})[.\s_-]+(.+)$").unwrap());

/// Leading 1-2 digit number as a whole word.
pub static TRACK_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{1,2})\b").unwrap());

/// A part made only of 1-3 digits.
pub static DIGITS_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}$").unwrap());

/// Words that mark a filename part as a record label name.
pub static LABEL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(records?|recordings|music|label|netlabel|rec|recs)\b").unwrap()
});

static MULTI_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"--+").unwrap());

static SPACED_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+-\s+").unwrap());

/// Regex to collapse whitespace runs into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Dash variants folded into " - ": figure dash, en dash, em dash, horizontal bar, minus sign.
const DASH_VARIANTS: [char; 5] = ['\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}'];

// ============================================================================
// BPM
// ============================================================================

/// Result of pulling a BPM annotation out of a raw name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpmExtraction {
    pub bpm: String,
    pub style: Option<BpmStyle>,
    pub rest: String,
}

/// Find "<2-3 digits> [separator] bpm" (case-insensitive) and remove it.
/// Returns empty BPM and the input unchanged when no annotation is present.
/// Only whitespace before "bpm" counts as the spaced style; "128-bpm" is compact.
/// e.g., "Night Drive (128 bpm)" → ("128", Space, "Night Drive")
pub fn extract_bpm(raw: &str) -> BpmExtraction {
    let caps = BPM_BRACKETED
        .captures(raw)
        .or_else(|| BPM.captures(raw));
    let Some(caps) = caps else {
        return BpmExtraction {
            bpm: String::new(),
            style: None,
            rest: raw.to_string(),
        };
    };

    // Group 0 always participates in a match
    let whole = caps.get(0).map_or(0..0, |m| m.range());
    let digits = caps.get(1).map_or("", |m| m.as_str());
    let separator = caps.get(2).map_or("", |m| m.as_str());
    let style = if separator.chars().any(char::is_whitespace) {
        BpmStyle::Space
    } else {
        BpmStyle::Compact
    };
    let rest = format!("{} {}", &raw[..whole.start], &raw[whole.end..]);

    BpmExtraction {
        bpm: digits.to_string(),
        style: Some(style),
        rest: rest.trim().to_string(),
    }
}

/// Format a BPM value the way it was written: "(128 bpm)" or "(128Bpm)".
pub fn format_bpm(bpm: &str, style: Option<BpmStyle>) -> String {
    if bpm.is_empty() {
        return String::new();
    }
    match style {
        Some(BpmStyle::Compact) => format!("({}Bpm)", bpm),
        _ => format!("({} bpm)", bpm),
    }
}

/// Append the BPM annotation unless the title already mentions one.
pub fn append_bpm_if_missing(title: &str, bpm: &str, style: Option<BpmStyle>) -> String {
    if bpm.is_empty() || title.to_lowercase().contains("bpm") {
        return title.to_string();
    }
    format!("{} {}", title.trim(), format_bpm(bpm, style))
}

// ============================================================================
// SEPARATORS AND NOISE TOKENS
// ============================================================================

/// Unify underscores, dash variants and runs of hyphens into " - " separators,
/// then collapse whitespace.
pub fn normalize_template_base(raw: &str) -> String {
    let mut result = raw.replace('_', " ");
    result = result.replace(DASH_VARIANTS, " - ");
    result = MULTI_DASH.replace_all(&result, " - ").to_string();
    result = SPACED_DASH.replace_all(&result, " - ").to_string();
    collapse_spaces(&result)
}

/// Collapse whitespace runs and trim.
pub fn collapse_spaces(s: &str) -> String {
    MULTI_SPACE.replace_all(s, " ").trim().to_string()
}

/// Catalog-number token such as "CAT042" or "lbl12x": at least 4 chars,
/// only ASCII letters and digits, with at least one of each.
pub fn is_catalog_code_token(token: &str) -> bool {
    if token.len() < 4 || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    token.chars().any(|c| c.is_ascii_digit()) && token.chars().any(|c| c.is_ascii_alphabetic())
}

/// Drop trailing single-character and catalog-code tokens.
/// e.g., "Artist - Title CAT042 A" → "Artist - Title"
pub fn strip_trailing_code_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        if last.chars().count() == 1 || is_catalog_code_token(last) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

// ============================================================================
// TRACK NUMBERS
// ============================================================================

/// Split a leading track number from the rest: "03 - Song" → ("03", "Song").
pub fn extract_track_prefix(s: &str) -> Option<(String, String)> {
    let caps = TRACK_PREFIX.captures(s)?;
    let number = caps.get(1)?.as_str().to_string();
    let rest = caps.get(2)?.as_str().trim().to_string();
    Some((number, rest))
}

/// Leading 1-2 digit number of a name, if any: "07 Song" → Some("07").
pub fn extract_track_number(s: &str) -> Option<&str> {
    TRACK_ONLY
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Leading track number parsed as an integer.
pub fn leading_track_number(s: &str) -> Option<i64> {
    extract_track_number(s).and_then(|n| n.parse().ok())
}

/// "3" → "03. ", "" → "", non-numeric values are kept as written.
pub fn format_track_prefix(track: &str) -> String {
    if track.is_empty() {
        return String::new();
    }
    match track.parse::<i64>() {
        Ok(n) => format!("{:02}. ", n),
        Err(_) => format!("{}. ", track),
    }
}

/// Remove one duplicated track-number prefix ("3. ", "03. ", "3 - ", "03 - ") from a title.
pub fn clean_track_title(title: &str, track_num: i64) -> String {
    let prefixes = [
        format!("{}. ", track_num),
        format!("{:02}. ", track_num),
        format!("{} - ", track_num),
        format!("{:02} - ", track_num),
    ];
    let cleaned = prefixes
        .iter()
        .find_map(|prefix| title.strip_prefix(prefix.as_str()))
        .unwrap_or(title);
    cleaned.trim().to_string()
}

// ============================================================================
// MATCH NORMALIZATION
// ============================================================================

fn normalize_for_match_once(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let mut base = normalize_template_base(&extract_bpm(raw).rest);
    if let Some((_, rest)) = extract_track_prefix(&base) {
        base = rest;
    }
    base = strip_trailing_code_tokens(&base).to_lowercase();
    let spaced = NON_ALNUM.replace_all(&base, " ");
    collapse_spaces(&spaced)
}

/// Canonical comparison form: BPM, separators, leading track number and trailing
/// code tokens removed, lowercased, everything outside [a-z0-9] collapsed to single spaces.
/// Only used for similarity comparisons, never for display.
///
/// Each reduction pass only removes text, so repeating until the output stops
/// changing terminates and makes the function idempotent.
pub fn normalize_for_match(raw: &str) -> String {
    let mut current = normalize_for_match_once(raw);
    loop {
        let next = normalize_for_match_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// True iff two normalized strings share at least one whitespace token.
pub fn has_token_overlap(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let tokens: FxHashSet<&str> = a.split_whitespace().collect();
    b.split_whitespace().any(|t| tokens.contains(t))
}

// ============================================================================
// TESTS
// ============================================================================
