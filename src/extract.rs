//! Remote listing extraction from storefront pages.
//!
//! Bandcamp pages describe the whole album in one `data-tralbum` attribute.
//! Beatport pages have no single authoritative container, so the listing is
//! discovered by trying several sources in order:
//! 1. JSON-LD album/release blocks (richest block wins)
//! 2. `__NEXT_DATA__` hydration query for the release's tracks
//! 3. Per-track `span[data-json]` blobs
//! 4. Generic mining of the `__NEXT_DATA__` tree
//!
//! The first source yielding tracks wins. The og:title meta only fills album
//! title/artist left empty by the winning source.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::json_tree::{
    album_track_from_object, album_tracks_from_objects, find_release_track_order, get_string,
    mine_track_list, parse_artists, parse_int_any, title_with_mix, track_id, track_number,
    trailing_numeric_segment, JsonObject, OrderMap, TITLE_KEYS,
};
use crate::models::{AlbumData, AlbumTrack, Source};
use crate::page::Page;

const LINKED_DATA_TYPES: [&str; 3] = ["MusicAlbum", "MusicRelease", "MusicPlaylist"];

// ============================================================================
// Dispatch
// ============================================================================

/// Storefront implied by a listing URL.
pub fn storefront_for_url(url: &str) -> Source {
    if url.to_lowercase().contains("beatport.com") {
        Source::Beatport
    } else {
        Source::Bandcamp
    }
}

/// Release id from the URL's trailing numeric path segment, 0 when absent.
pub fn release_id_from_url(url: &str) -> i64 {
    trailing_numeric_segment(url)
}

/// Extract the listing from an already-fetched page.
pub fn extract_album(page: &Page, url: &str) -> Result<AlbumData, ExtractError> {
    let album = match storefront_for_url(url) {
        Source::Bandcamp => extract_bandcamp(page)?,
        Source::Beatport => extract_beatport(page, release_id_from_url(url))?,
    };
    info!(
        "{} listing: '{}' by '{}' ({} tracks)",
        album.source,
        album.title,
        album.artist,
        album.tracks.len()
    );
    Ok(album)
}

// ============================================================================
// Bandcamp
// ============================================================================

#[derive(Debug, Deserialize)]
struct TralbumData {
    artist: Option<String>,
    #[serde(default)]
    trackinfo: Vec<TralbumTrack>,
    current: Option<TralbumCurrent>,
}

#[derive(Debug, Deserialize)]
struct TralbumCurrent {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TralbumTrack {
    title: Option<String>,
    artist: Option<String>,
    track_num: Option<i64>,
}

pub fn extract_bandcamp(page: &Page) -> Result<AlbumData, ExtractError> {
    let raw = page
        .first_attr("script[data-tralbum]", "data-tralbum")
        .filter(|raw| !raw.is_empty())
        .ok_or(ExtractError::NoAlbumData)?;
    let data: TralbumData = serde_json::from_str(&raw)?;

    let mut album = AlbumData::new(Source::Bandcamp);
    album.artist = data.artist.unwrap_or_default();
    album.title = data.current.and_then(|c| c.title).unwrap_or_default();
    album.tracks = data
        .trackinfo
        .into_iter()
        .map(|t| AlbumTrack {
            title: t.title.unwrap_or_default(),
            artist: t.artist.unwrap_or_default(),
            track_num: t.track_num.unwrap_or(0),
            track_num_explicit: true,
            track_id: 0,
        })
        .collect();
    Ok(album)
}

// ============================================================================
// Beatport
// ============================================================================

/// Split an og:title of the form "<title> by <artist> on Beatport".
pub fn parse_meta_title(s: &str) -> (String, String) {
    let s = s.replace(" on Beatport", "");
    match s.trim().split_once(" by ") {
        Some((title, artist)) => (title.trim().to_string(), artist.trim().to_string()),
        None => (s.trim().to_string(), String::new()),
    }
}

pub fn extract_beatport(page: &Page, release_id: i64) -> Result<AlbumData, ExtractError> {
    let mut album = AlbumData::new(Source::Beatport);

    let next_data = page
        .first_text("script#__NEXT_DATA__")
        .and_then(|raw| parse_json_block(&raw, "__NEXT_DATA__"));
    let order_map = next_data
        .as_ref()
        .and_then(|data| find_release_track_order(data, release_id));
    if let Some(order) = &order_map {
        debug!("Release {} order map covers {} tracks", release_id, order.len());
    }

    let order = order_map.as_ref();
    if let Some(linked) = linked_data_album(page) {
        debug!("Using JSON-LD listing ({} tracks)", linked.tracks.len());
        album.title = linked.title;
        album.artist = linked.artist;
        album.tracks = linked.tracks;
    } else {
        let hydrated = || {
            next_data
                .as_ref()
                .map(|data| hydrated_release_tracks(data, release_id, order))
                .unwrap_or_default()
        };
        let blobs = || element_blob_tracks(page, release_id, order);
        let mined = || {
            next_data
                .as_ref()
                .and_then(|data| mine_track_list(data, release_id, order))
                .map(|objs| album_tracks_from_objects(&objs, order))
                .unwrap_or_default()
        };
        // Release-scoped sources run before mining, which can land on an unrelated chart array.
        let strategies: [(&str, &dyn Fn() -> Vec<AlbumTrack>); 3] = [
            ("hydrated tracks query", &hydrated),
            ("per-element track blobs", &blobs),
            ("mined track array", &mined),
        ];
        let (name, tracks) = strategies
            .iter()
            .map(|(name, strategy)| (*name, strategy()))
            .find(|(_, tracks)| !tracks.is_empty())
            .ok_or(ExtractError::NoTrackData {
                storefront: Source::Beatport.label(),
            })?;
        debug!("Using {} ({} tracks)", name, tracks.len());
        album.tracks = tracks;
    }

    if let Some(meta) = page.first_attr("meta[property='og:title']", "content") {
        let (title, artist) = parse_meta_title(&meta);
        if album.title.is_empty() {
            album.title = title;
        }
        if album.artist.is_empty() {
            album.artist = artist;
        }
    }

    Ok(album)
}

fn parse_json_block(raw: &str, what: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("Skipping unparsable {} block: {}", what, err);
            None
        }
    }
}

// ----------------------------------------------------------------------------
// JSON-LD
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LinkedDataAlbum {
    title: String,
    artist: String,
    tracks: Vec<AlbumTrack>,
}

/// Richer of two results; the earlier one wins ties.
fn richer(best: Option<LinkedDataAlbum>, candidate: Option<LinkedDataAlbum>) -> Option<LinkedDataAlbum> {
    match (best, candidate) {
        (Some(b), Some(c)) if c.tracks.len() > b.tracks.len() => Some(c),
        (Some(b), _) => Some(b),
        (None, c) => c,
    }
}

fn linked_data_album(page: &Page) -> Option<LinkedDataAlbum> {
    page.all_texts("script[type='application/ld+json']")
        .iter()
        .filter_map(|raw| parse_json_block(raw, "JSON-LD"))
        .map(|data| find_linked_data_album(&data))
        .fold(None, richer)
}

fn has_album_type(obj: &JsonObject) -> bool {
    match obj.get("@type") {
        Some(Value::String(t)) => LINKED_DATA_TYPES.contains(&t.trim()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| LINKED_DATA_TYPES.contains(&t.trim())),
        _ => false,
    }
}

fn find_linked_data_album(value: &Value) -> Option<LinkedDataAlbum> {
    match value {
        Value::Array(items) => items.iter().map(find_linked_data_album).fold(None, richer),
        Value::Object(obj) => {
            if let Some(graph) = obj.get("@graph") {
                return find_linked_data_album(graph);
            }
            if has_album_type(obj) {
                let mut artist = parse_artists(obj.get("byArtist"));
                if artist.is_empty() {
                    artist = parse_artists(obj.get("artist"));
                }
                let album = LinkedDataAlbum {
                    title: get_string(obj, &TITLE_KEYS),
                    artist,
                    tracks: linked_data_tracks(obj.get("track")),
                };
                return Some(album).filter(|a| !a.tracks.is_empty());
            }
            obj.values().map(find_linked_data_album).fold(None, richer)
        }
        _ => None,
    }
}

/// Tracks from a JSON-LD "track" value: a plain list, or an ItemList whose
/// elements wrap the track in "item" and carry the position themselves.
fn linked_data_tracks(value: Option<&Value>) -> Vec<AlbumTrack> {
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(Value::Object(list)) => match list.get("itemListElement") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let element = item.as_object()?;
            let obj = element
                .get("item")
                .and_then(Value::as_object)
                .unwrap_or(element);
            let title = title_with_mix(obj, &TITLE_KEYS);
            if title.is_empty() {
                return None;
            }
            let mut artist = parse_artists(obj.get("byArtist"));
            if artist.is_empty() {
                artist = parse_artists(obj.get("artist"));
            }
            let (track_num, track_num_explicit) =
                match track_number(obj).or_else(|| track_number(element)) {
                    Some(n) => (n, true),
                    None => (i as i64 + 1, false),
                };
            Some(AlbumTrack {
                title,
                artist,
                track_num,
                track_num_explicit,
                track_id: track_id(obj),
            })
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Hydration payload
// ----------------------------------------------------------------------------

/// Cached results of the "tracks" query for the target release.
fn hydrated_release_tracks(data: &Value, release_id: i64, order_map: Option<&OrderMap>) -> Vec<AlbumTrack> {
    let Some(queries) = data
        .pointer("/props/pageProps/dehydratedState/queries")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    for query in queries {
        let Some(key) = query.get("queryKey").and_then(Value::as_array) else {
            continue;
        };
        if key.len() < 2 || key[0].as_str() != Some("tracks") {
            continue;
        }
        let Some(params) = key[1].as_object() else {
            continue;
        };
        if release_id != 0
            && parse_int_any(&[params.get("release_id"), params.get("releaseId")]) != release_id
        {
            continue;
        }
        let results: Vec<&JsonObject> = query
            .pointer("/state/data/results")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();
        if results.is_empty() {
            continue;
        }
        return album_tracks_from_objects(&results, order_map);
    }
    Vec::new()
}

// ----------------------------------------------------------------------------
// Per-element blobs
// ----------------------------------------------------------------------------

fn element_blob_tracks(page: &Page, release_id: i64, order_map: Option<&OrderMap>) -> Vec<AlbumTrack> {
    let mut tracks = Vec::new();
    for raw in page.all_attrs("span[data-json]", "data-json") {
        let Some(Value::Object(obj)) = parse_json_block(&raw, "data-json") else {
            continue;
        };
        if release_id != 0 {
            let blob_release = crate::json_tree::release_id(&obj);
            if blob_release != 0 && blob_release != release_id {
                continue;
            }
        }
        let position = tracks.len() as i64 + 1;
        let artist = parse_artists(obj.get("artists"));
        if let Some(track) = album_track_from_object(&obj, &["title", "name"], artist, position, order_map) {
            tracks.push(track);
        }
    }
    tracks
}

// ============================================================================
// TESTS
// ============================================================================
