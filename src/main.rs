use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracklist_renamer::ai::ai_renames;
use tracklist_renamer::fetch::fetch_album_data;
use tracklist_renamer::matcher::match_tracks;
use tracklist_renamer::models::{MatchedTrack, NameFormat};
use tracklist_renamer::progress::{create_spinner, format_duration, set_log_only};
use tracklist_renamer::rename::rename_matched_tracks;
use tracklist_renamer::scan::scan_folder;
use tracklist_renamer::template::generate_template_renames;

#[derive(Parser)]
#[command(name = "tracklist-renamer")]
#[command(about = "Propose and apply clean \"NN. Artist - Title\" names for a folder of audio files")]
struct Args {
    /// Folder containing the audio files
    folder: PathBuf,

    /// Bandcamp or Beatport release page to match against
    #[arg(long)]
    url: Option<String>,

    /// Name shape used when no URL is given
    #[arg(long, value_enum, default_value_t = NameFormat::TrackArtistTitle)]
    format: NameFormat,

    /// Parse filenames with the AI model instead of the built-in rules
    #[arg(long, conflicts_with = "url")]
    ai: bool,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Rename files instead of only listing the proposals
    #[arg(long)]
    apply: bool,

    /// Print proposals as JSON
    #[arg(long)]
    json: bool,

    /// Hide progress bars (tail-friendly output)
    #[arg(long)]
    log_only: bool,
}

fn print_proposals(tracks: &[MatchedTrack]) {
    println!("{:<12} {:>5}  {:<45} -> {}", "STATUS", "CONF", "ORIGINAL", "PROPOSED");
    println!("{:-<100}", "");
    for t in tracks {
        let arrow = if t.is_rename() { "->" } else { "  " };
        println!(
            "{:<12} {:>5.2}  {:<45} {} {}",
            t.status.to_string(),
            t.confidence,
            t.original_name,
            arrow,
            t.proposed_new_name
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracklist_renamer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    set_log_only(args.log_only);
    let start = Instant::now();

    let locals = scan_folder(&args.folder)
        .with_context(|| format!("Failed to scan {}", args.folder.display()))?;

    let proposals = if let Some(url) = &args.url {
        let spinner = create_spinner("Fetching listing");
        let album = fetch_album_data(url);
        spinner.finish_and_clear();
        let album = album.context("Failed to fetch or parse album data")?;
        match_tracks(&album, &locals)
    } else if args.ai {
        let key = args.api_key.as_deref().unwrap_or_default();
        let spinner = create_spinner("Waiting for AI");
        let result = ai_renames(&locals, key, args.format);
        spinner.finish_and_clear();
        result.context("AI filename parsing failed")?
    } else {
        generate_template_renames(&locals, args.format)
    };

    let changes = proposals.iter().filter(|t| t.is_rename()).count();
    info!(
        "{} proposals, {} renames, {} files scanned",
        proposals.len(),
        changes,
        locals.len()
    );

    if args.json {
        let json = serde_json::to_string_pretty(&proposals).context("Failed to serialize proposals")?;
        println!("{}", json);
    } else {
        print_proposals(&proposals);
    }

    if args.apply {
        let summary = rename_matched_tracks(&proposals);
        println!("{}", summary.message());
    } else if !args.json {
        println!("\nDry run: pass --apply to rename {} file(s).", changes);
    }

    info!("Done in {}", format_duration(start.elapsed()));
    Ok(())
}
