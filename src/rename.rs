//! Applying proposed renames on disk.
//!
//! Every file is renamed independently. Collisions, unsafe names and OS errors
//! are logged and skipped; nothing is rolled back.

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::{MatchedTrack, RenameSummary};
use crate::progress::{create_progress_bar, log_progress};

/// Outcome of one rename attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    Unchanged,
    DestinationExists,
    Failed,
}

/// Validates that a proposed name stays inside the file's own directory.
///
/// Checks:
/// - Name must not be empty, "." or ".."
/// - Name must not contain a path separator
pub fn validate_proposed_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name == "." || name == ".." {
        bail!("Safety check failed: '{}' is not a usable file name", name);
    }
    if name.contains('/') || name.contains('\\') {
        bail!(
            "Safety check failed: '{}' contains a path separator",
            name
        );
    }
    Ok(())
}

/// Destination path: the proposed name in the original file's directory.
pub fn destination_path(local_path: &Path, proposed: &str) -> PathBuf {
    match local_path.parent() {
        Some(dir) => dir.join(proposed),
        None => PathBuf::from(proposed),
    }
}

/// Rename one file if its proposal differs from the current name.
pub fn rename_track(track: &MatchedTrack) -> RenameOutcome {
    if !track.is_rename() {
        return RenameOutcome::Unchanged;
    }
    if let Err(e) = validate_proposed_name(&track.proposed_new_name) {
        warn!("Skipping {}: {}", track.local_path.display(), e);
        return RenameOutcome::Failed;
    }

    let dest = destination_path(&track.local_path, &track.proposed_new_name);
    match dest.try_exists() {
        Ok(false) => {}
        Ok(true) => {
            warn!(
                "Skipping {}: destination {} already exists",
                track.original_name,
                dest.display()
            );
            return RenameOutcome::DestinationExists;
        }
        Err(e) => {
            warn!("Skipping {}: cannot check {}: {}", track.original_name, dest.display(), e);
            return RenameOutcome::Failed;
        }
    }

    match fs::rename(&track.local_path, &dest) {
        Ok(()) => {
            debug!("Renamed {} -> {}", track.local_path.display(), dest.display());
            RenameOutcome::Renamed
        }
        Err(e) => {
            warn!(
                "Error renaming {} to {}: {}",
                track.local_path.display(),
                dest.display(),
                e
            );
            RenameOutcome::Failed
        }
    }
}

/// Apply every proposal, returning per-outcome counts.
pub fn rename_matched_tracks(tracks: &[MatchedTrack]) -> RenameSummary {
    let total = tracks.len() as u64;
    let pb = create_progress_bar(total, "Renaming");
    let mut summary = RenameSummary::default();

    for (i, track) in tracks.iter().enumerate() {
        match rename_track(track) {
            RenameOutcome::Renamed => summary.renamed += 1,
            RenameOutcome::Unchanged => summary.unchanged += 1,
            RenameOutcome::DestinationExists => summary.skipped_existing += 1,
            RenameOutcome::Failed => summary.failed += 1,
        }
        pb.inc(1);
        log_progress("Renaming", i as u64 + 1, total, 25);
    }

    pb.finish_with_message(format!("Renamed {} of {} files", summary.renamed, total));
    info!(
        "{} ({} unchanged, {} existing, {} failed)",
        summary.message(),
        summary.unchanged,
        summary.skipped_existing,
        summary.failed
    );
    summary
}
