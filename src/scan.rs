//! Directory scan and embedded tag reading.

use lofty::file::TaggedFileExt;
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::Tag;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::models::LocalTrack;
use crate::progress::{create_progress_bar, log_progress};

/// Extensions treated as audio, compared case-insensitively.
pub const AUDIO_EXTENSIONS: [&str; 4] = ["flac", "mp3", "wav", "aiff"];

pub fn is_audio_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

fn first_non_empty<F>(primary: Option<&Tag>, tags: &[Tag], extractor: F) -> Option<String>
where
    F: Fn(&Tag) -> Option<String>,
{
    primary
        .into_iter()
        .chain(tags.iter())
        .filter_map(|tag| extractor(tag))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Embedded (artist, title). Unreadable files yield (None, None).
pub fn read_tags(path: &Path) -> (Option<String>, Option<String>) {
    let tagged_file = match read_from_path(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("No tags for {}: {}", path.display(), e);
            return (None, None);
        }
    };
    let primary = tagged_file.primary_tag();
    let tags = tagged_file.tags();
    let artist = first_non_empty(primary, tags, |tag| tag.artist().map(|v| v.into_owned()));
    let title = first_non_empty(primary, tags, |tag| tag.title().map(|v| v.into_owned()));
    (artist, title)
}

/// Audio files directly inside `folder`, sorted by name, with their tags.
pub fn scan_folder(folder: &Path) -> io::Result<Vec<LocalTrack>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_audio_file(&name) {
            entries.push((entry.path(), name));
        }
    }
    entries.sort_by(|a, b| a.1.cmp(&b.1));

    let total = entries.len() as u64;
    let pb = create_progress_bar(total, "Reading tags");
    let mut tracks = Vec::with_capacity(entries.len());
    for (i, (path, name)) in entries.into_iter().enumerate() {
        let (artist, title) = read_tags(&path);
        tracks.push(LocalTrack::new(path, name).with_tags(artist, title));
        pb.inc(1);
        log_progress("Reading tags", i as u64 + 1, total, 50);
    }
    pb.finish_with_message(format!("Read {} audio files", tracks.len()));
    info!("Found {} audio files in {}", tracks.len(), folder.display());

    Ok(tracks)
}
