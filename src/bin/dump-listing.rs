//! Run the listing extractor on a saved storefront page and print the result.
//! Usage: cargo run --bin dump-listing -- <page.html> --url <release url>

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tracklist_renamer::extract::extract_album;
use tracklist_renamer::page::Page;

#[derive(Parser)]
#[command(name = "dump-listing")]
#[command(about = "Print the track listing recovered from a saved storefront page")]
struct Args {
    /// Saved HTML of the release page
    html: PathBuf,

    /// URL the page was saved from (selects the storefront and release id)
    #[arg(long)]
    url: String,

    /// Print a compact table instead of JSON
    #[arg(long)]
    table: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let html = std::fs::read_to_string(&args.html)
        .with_context(|| format!("Failed to read {}", args.html.display()))?;
    let album = extract_album(&Page::parse(&html), &args.url).context("Extraction failed")?;

    if !args.table {
        println!("{}", serde_json::to_string_pretty(&album)?);
        return Ok(());
    }

    println!("{} - {} [{}]", album.artist, album.title, album.source);
    println!("{:-<80}", "");
    for t in &album.tracks {
        let marker = if t.track_num_explicit { ' ' } else { '*' };
        println!("{:>3}{} {:<30} {}", t.track_num, marker, t.artist, t.title);
    }
    println!("{:-<80}", "");
    println!("{} tracks (* = position inferred)", album.tracks.len());
    Ok(())
}
