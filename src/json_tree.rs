//! Shape-sniffing helpers over untyped storefront JSON.
//!
//! Storefront payloads disagree on field names, nesting and value types, so
//! everything here reads `serde_json::Value` leniently: a missing or
//! oddly-typed field degrades to "" / 0 instead of failing.
//!
//! The generic tree miner is split in two so the scoring stays testable:
//! - `collect_track_arrays` walks the tree and gathers every all-track-like array
//! - `score_track_candidate` is a pure function over one such array

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};

use crate::models::AlbumTrack;

// ============================================================================
// Type Aliases
// ============================================================================

pub type JsonObject = Map<String, Value>;

/// Track id → 1-based position, rebuilt from an independent ordered reference list.
pub type OrderMap = FxHashMap<i64, i64>;

// ============================================================================
// Field Keys
// ============================================================================

pub const TRACK_NUMBER_KEYS: [&str; 6] = [
    "trackNumber",
    "track_number",
    "position",
    "number",
    "index",
    "trackNo",
];

pub const TITLE_KEYS: [&str; 2] = ["name", "title"];

pub const MIX_NAME_KEYS: [&str; 2] = ["mixName", "mix_name"];

// ============================================================================
// Scalar Readers
// ============================================================================

/// First of `keys` holding a string, trimmed. "" when none does.
pub fn get_string(obj: &JsonObject, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Integer reading of one value: positive numbers (floats truncated) and numeric strings.
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .filter(|v| *v > 0)
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First readable integer among `values`, 0 when none is.
pub fn parse_int_any(values: &[Option<&Value>]) -> i64 {
    values
        .iter()
        .flatten()
        .find_map(|v| parse_int(v))
        .unwrap_or(0)
}

/// Artist credit that may be a string, an object with a name, or a list of either.
/// Lists are joined with ", ".
pub fn parse_artists(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Object(obj)) => get_string(obj, &["name"]),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(obj) => Some(get_string(obj, &["name"])),
                _ => None,
            })
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

/// Track artist from "artists", falling back to "artist".
pub fn track_artist(obj: &JsonObject) -> String {
    let artist = parse_artists(obj.get("artists"));
    if artist.is_empty() {
        parse_artists(obj.get("artist"))
    } else {
        artist
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Explicit track number, if the object carries a readable positive one.
pub fn track_number(obj: &JsonObject) -> Option<i64> {
    let values: Vec<Option<&Value>> = TRACK_NUMBER_KEYS.iter().map(|k| obj.get(*k)).collect();
    Some(parse_int_any(&values)).filter(|n| *n > 0)
}

pub fn track_id(obj: &JsonObject) -> i64 {
    parse_int_any(&[obj.get("id"), obj.get("trackId"), obj.get("track_id")])
}

/// Release the object belongs to: "releaseId", "release_id" or a nested "release" object.
pub fn release_id(obj: &JsonObject) -> i64 {
    if let Some(v) = obj.get("releaseId") {
        return parse_int(v).unwrap_or(0);
    }
    if let Some(v) = obj.get("release_id") {
        return parse_int(v).unwrap_or(0);
    }
    match obj.get("release") {
        Some(Value::Object(release)) => parse_int_any(&[
            release.get("id"),
            release.get("releaseId"),
            release.get("release_id"),
        ]),
        _ => 0,
    }
}

/// Trailing numeric path segment: ".../track/night-drive/123456/" → 123456.
pub fn trailing_numeric_segment(s: &str) -> i64 {
    s.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|last| last.parse().ok())
        .unwrap_or(0)
}

/// Track id from a reference that may be an object, a URL string or a bare number.
pub fn track_id_from_any(value: &Value) -> i64 {
    match value {
        Value::String(s) => trailing_numeric_segment(s),
        Value::Object(obj) => {
            let id = track_id(obj);
            if id != 0 {
                return id;
            }
            obj.get("url")
                .and_then(Value::as_str)
                .map(trailing_numeric_segment)
                .unwrap_or(0)
        }
        Value::Number(_) => parse_int(value).unwrap_or(0),
        _ => 0,
    }
}

// ============================================================================
// Order Map
// ============================================================================

/// Build {track id → 1-based position} from an ordered reference list.
/// Duplicate ids keep their first position; unreadable references are skipped.
pub fn build_order_map(value: &Value) -> Option<OrderMap> {
    let items = value.as_array()?;
    let mut order = OrderMap::default();
    for id in items.iter().map(track_id_from_any).filter(|id| *id != 0) {
        let next = order.len() as i64 + 1;
        order.entry(id).or_insert(next);
    }
    Some(order).filter(|o| !o.is_empty())
}

/// Depth-first search for the node whose "id" is the target release and that
/// carries its own "tracks" reference list.
pub fn find_release_track_order(value: &Value, target_release: i64) -> Option<OrderMap> {
    match value {
        Value::Object(obj) => {
            if target_release != 0
                && obj.get("id").and_then(parse_int) == Some(target_release)
            {
                if let Some(order) = obj.get("tracks").and_then(build_order_map) {
                    return Some(order);
                }
            }
            obj.values()
                .find_map(|nested| find_release_track_order(nested, target_release))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_release_track_order(item, target_release)),
        _ => None,
    }
}

// ============================================================================
// Track Objects
// ============================================================================

/// Non-empty title-ish field plus an artist-ish field.
pub fn is_track_like(obj: &JsonObject) -> bool {
    !get_string(obj, &TITLE_KEYS).is_empty()
        && (obj.contains_key("artists") || obj.contains_key("artist"))
}

/// Title with a separate mix name appended as "(Mix)" unless already present.
pub fn title_with_mix(obj: &JsonObject, title_keys: &[&str]) -> String {
    let title = get_string(obj, title_keys);
    let mix = get_string(obj, &MIX_NAME_KEYS);
    if mix.is_empty() || title.to_lowercase().contains(&mix.to_lowercase()) {
        return title;
    }
    format!("{} ({})", title.trim(), mix)
}

/// Build an AlbumTrack from a storefront track object. The number comes from an
/// explicit field, else the order map, else `fallback_position` (inferred).
pub fn album_track_from_object(
    obj: &JsonObject,
    title_keys: &[&str],
    artist: String,
    fallback_position: i64,
    order_map: Option<&OrderMap>,
) -> Option<AlbumTrack> {
    let title = title_with_mix(obj, title_keys);
    if title.is_empty() {
        return None;
    }
    let id = track_id(obj);
    let mapped = order_map
        .filter(|_| id != 0)
        .and_then(|order| order.get(&id).copied());
    let (track_num, track_num_explicit) = match (track_number(obj), mapped) {
        (Some(n), _) => (n, true),
        (None, Some(n)) => (n, true),
        (None, None) => (fallback_position, false),
    };
    Some(AlbumTrack {
        title,
        artist,
        track_num,
        track_num_explicit,
        track_id: id,
    })
}

/// Build AlbumTracks from an ordered list of track objects (hydration results,
/// mined arrays). Positions count every object, emitted or not.
pub fn album_tracks_from_objects(objs: &[&JsonObject], order_map: Option<&OrderMap>) -> Vec<AlbumTrack> {
    objs.iter()
        .enumerate()
        .filter_map(|(i, obj)| {
            album_track_from_object(obj, &TITLE_KEYS, track_artist(obj), i as i64 + 1, order_map)
        })
        .collect()
}

// ============================================================================
// Generic Tree Mining
// ============================================================================

/// Collect every non-empty array whose elements are all track-like objects.
pub fn collect_track_arrays<'a>(value: &'a Value, out: &mut Vec<Vec<&'a JsonObject>>) {
    match value {
        Value::Object(obj) => {
            for nested in obj.values() {
                collect_track_arrays(nested, out);
            }
        }
        Value::Array(items) => {
            if !items.is_empty() {
                let tracks: Option<Vec<&JsonObject>> = items
                    .iter()
                    .map(|item| item.as_object().filter(|obj| is_track_like(obj)))
                    .collect();
                if let Some(tracks) = tracks {
                    out.push(tracks);
                }
            }
            for nested in items {
                collect_track_arrays(nested, out);
            }
        }
        _ => {}
    }
}

/// True when `nums` are distinct positives covering every value in 1..=expected.
pub fn is_sequential_from_one(nums: &[i64], expected: usize) -> bool {
    if nums.is_empty() || nums.iter().any(|n| *n <= 0) {
        return false;
    }
    let seen: FxHashSet<i64> = nums.iter().copied().collect();
    if seen.len() != nums.len() {
        return false;
    }
    let expected = if expected == 0 { nums.len() } else { expected };
    (1..=expected as i64).all(|i| seen.contains(&i))
}

/// Plausibility score for one candidate track array.
pub fn score_track_candidate(arr: &[&JsonObject], target_release: i64, order_map: Option<&OrderMap>) -> i64 {
    let len = arr.len();
    let nums: Vec<i64> = arr.iter().filter_map(|obj| track_number(obj)).collect();
    let artist_count = arr
        .iter()
        .filter(|obj| obj.contains_key("artists") || obj.contains_key("artist"))
        .count();

    let mut release_seen = 0;
    let mut release_match = 0;
    if target_release != 0 {
        for rid in arr.iter().map(|obj| release_id(obj)).filter(|rid| *rid != 0) {
            release_seen += 1;
            if rid == target_release {
                release_match += 1;
            }
        }
    }

    let order_matches = match order_map {
        Some(order) => arr
            .iter()
            .map(|obj| track_id(obj))
            .filter(|id| *id != 0 && order.contains_key(id))
            .count(),
        None => 0,
    };

    let mut score = len as i64 + artist_count as i64;

    if !nums.is_empty() {
        score += nums.len() as i64 * 3;
        if is_sequential_from_one(&nums, len) {
            score += 200; // Full 1..N listing
        } else if is_sequential_from_one(&nums, nums.len()) {
            score += 100; // Numbered subset is contiguous
        }
    }

    if release_seen > 0 {
        if release_match == release_seen && release_match >= len / 2 {
            score += 1000;
        } else if release_match > 0 {
            score += release_match as i64 * 10;
        }
    }

    if order_matches > 0 {
        score += order_matches as i64 * 5;
        if order_matches >= len / 2 {
            score += 50;
        }
    }

    score
}

/// Reorder mined track objects: by the order map if it places at least half of
/// them, else by explicit numbers if they rebuild a full permutation, else as found.
pub fn order_track_objects<'a>(arr: &[&'a JsonObject], order_map: Option<&OrderMap>) -> Vec<&'a JsonObject> {
    if arr.is_empty() {
        return Vec::new();
    }

    if let Some(order) = order_map.filter(|o| !o.is_empty()) {
        let mut used = vec![false; arr.len()];
        let mut ordered = Vec::with_capacity(arr.len());
        for position in 1..=order.len() as i64 {
            let hit = arr.iter().enumerate().find(|(idx, obj)| {
                !used[*idx] && {
                    let id = track_id(obj);
                    id != 0 && order.get(&id) == Some(&position)
                }
            });
            if let Some((idx, obj)) = hit {
                used[idx] = true;
                ordered.push(*obj);
            }
        }
        if ordered.len() * 2 >= arr.len() {
            ordered.extend(
                arr.iter()
                    .enumerate()
                    .filter(|(idx, _)| !used[*idx])
                    .map(|(_, obj)| *obj),
            );
            return ordered;
        }
    }

    let nums: Vec<i64> = arr.iter().filter_map(|obj| track_number(obj)).collect();
    if nums.is_empty() {
        return arr.to_vec();
    }
    if !is_sequential_from_one(&nums, arr.len()) && nums.len() * 2 < arr.len() {
        return arr.to_vec();
    }

    let mut used = vec![false; arr.len()];
    let mut ordered = Vec::with_capacity(arr.len());
    for position in 1..=arr.len() as i64 {
        let hit = arr
            .iter()
            .enumerate()
            .find(|(idx, obj)| !used[*idx] && track_number(obj) == Some(position));
        match hit {
            Some((idx, obj)) => {
                used[idx] = true;
                ordered.push(*obj);
            }
            None => break,
        }
    }
    if ordered.len() == arr.len() {
        ordered
    } else {
        arr.to_vec()
    }
}

/// Highest-scoring track array anywhere in the tree, reordered. First wins ties.
pub fn mine_track_list<'a>(
    value: &'a Value,
    target_release: i64,
    order_map: Option<&OrderMap>,
) -> Option<Vec<&'a JsonObject>> {
    let mut candidates = Vec::new();
    collect_track_arrays(value, &mut candidates);

    let mut best: Option<(i64, Vec<&'a JsonObject>)> = None;
    for candidate in candidates {
        let score = score_track_candidate(&candidate, target_release, order_map);
        let better = match &best {
            Some((best_score, _)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, tracks)| order_track_objects(&tracks, order_map))
}

// ============================================================================
// TESTS
// ============================================================================
