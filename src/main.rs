mod cli;
mod config;
mod domain;
mod infra;
mod matching;
mod media;
mod report;
mod workflows;

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Mode};
use config::Settings;
use domain::episode::EpisodeId;
use infra::cache::EpisodeCache;
use report::{Report, ReportContext};
use workflows::embedder::{self, EmbedOptions, EmbedStatus};
use workflows::pairing::pair;
use workflows::renamer::{self, RenameOptions};
use workflows::scan::scan_directory;

/// Exit code when some merges failed.
const EXIT_PARTIAL_FAILURE: i32 = 2;
/// Exit code when every attempted merge failed.
const EXIT_ALL_FAILED: i32 = 3;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subtitle_matcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    if cli.mode == Mode::Identify {
        identify_files(&cli.inputs, cli.json)?;
        return Ok(0);
    }

    let mut settings = config::load(cli.config.as_deref())?;
    if let Some(suffix) = &cli.language_suffix {
        settings.renaming.language_suffix = suffix.trim().to_string();
    }
    if let Some(path) = &cli.mkvmerge {
        settings.embedding.mkvmerge_path = Some(path.clone());
    }
    if cli.report {
        settings.renaming.report = true;
        settings.embedding.report = true;
    }

    let mut totals = MergeTotals::default();
    let mut failed_inputs = 0;
    for input in &cli.inputs {
        if !input.is_dir() {
            eprintln!("Error: Not a directory: {}", input.display());
            failed_inputs += 1;
            continue;
        }
        match process_directory(input, &cli, &settings) {
            Ok(merges) => totals.add(merges),
            Err(e) => {
                eprintln!("Error processing {}: {e:#}", input.display());
                failed_inputs += 1;
            }
        }
    }

    if failed_inputs > 0 && failed_inputs == cli.inputs.len() {
        bail!("No directory could be processed");
    }
    Ok(totals.exit_code())
}

#[derive(Debug, Default, Clone, Copy)]
struct MergeTotals {
    embedded: usize,
    failed: usize,
}

impl MergeTotals {
    fn add(&mut self, other: MergeTotals) {
        self.embedded += other.embedded;
        self.failed += other.failed;
    }

    fn exit_code(&self) -> i32 {
        match (self.embedded, self.failed) {
            (_, 0) => 0,
            (0, _) => EXIT_ALL_FAILED,
            _ => EXIT_PARTIAL_FAILURE,
        }
    }
}

fn process_directory(dir: &Path, cli: &Cli, settings: &Settings) -> Result<MergeTotals> {
    let started = Instant::now();
    println!("\nDIRECTORY: {}", dir.display());

    let listing = scan_directory(dir, settings)?;
    debug!(
        entries = listing.entries,
        videos = listing.videos.len(),
        subtitles = listing.subtitles.len(),
        "scanned directory"
    );
    let videos = match cli.mode {
        Mode::Embed => embedder::mkv_only(&listing.videos),
        _ => listing.videos.clone(),
    };
    if videos.is_empty() {
        println!("No video files found");
        return Ok(MergeTotals::default());
    }
    if listing.subtitles.is_empty() {
        println!("No subtitle files found");
        return Ok(MergeTotals::default());
    }
    println!(
        "FILES FOUND: {} videos | {} subtitles",
        videos.len(),
        listing.subtitles.len()
    );
    println!("{}\n", "=".repeat(60));

    let mut cache = EpisodeCache::with_capacity(listing.file_count());
    let pairing = pair(&videos, &listing.subtitles, &mut cache);
    let stats = cache.stats();
    debug!(
        hits = stats.hits,
        misses = stats.misses,
        entries = stats.entries,
        capacity = stats.capacity,
        "episode cache"
    );
    if pairing.movie_mode {
        println!("MOVIE MODE: matched the only video and subtitle by title\n");
    }

    let (report, write_report, merges) = match cli.mode {
        Mode::Embed => {
            let options = EmbedOptions {
                mkvmerge_path: settings.embedding.mkvmerge_path.clone(),
                language_code: settings.language_code().map(str::to_string),
                default_track: settings.embedding.default_flag,
                dry_run: cli.dry_run,
            };
            let entries = embedder::embed_subtitles(dir, &pairing, &options)?;
            let merges = MergeTotals {
                embedded: entries
                    .iter()
                    .filter(|e| e.status == EmbedStatus::Embedded)
                    .count(),
                failed: entries.iter().filter(|e| e.is_failed()).count(),
            };
            let report = Report::Embedding {
                entries,
                language_code: options.language_code,
                default_track: options.default_track,
            };
            (report, settings.embedding.report, merges)
        }
        _ => {
            let options = RenameOptions {
                language_suffix: settings.language_suffix().map(str::to_string),
                dry_run: cli.dry_run,
                skip_confirm: cli.no_confirm,
            };
            let entries = renamer::rename_subtitles(dir, &pairing, &options);
            let report = Report::Renaming {
                entries,
                language_suffix: options.language_suffix,
            };
            (report, settings.renaming.report, MergeTotals::default())
        }
    };

    let analysis = pairing.analysis();
    let ctx = ReportContext {
        directory: dir,
        analysis: &analysis,
        movie_mode: pairing.movie_mode,
        dry_run: cli.dry_run,
        elapsed: started.elapsed(),
    };
    report.print_summary(&ctx);
    if write_report {
        let path = report.write(&ctx)?;
        println!("Report written to {}", path.display());
    }

    Ok(merges)
}

#[derive(Debug, Serialize)]
struct Identification {
    file: String,
    episode: Option<EpisodeId>,
    rule: Option<&'static str>,
}

fn identify_files(inputs: &[PathBuf], json: bool) -> Result<()> {
    let rows: Vec<Identification> = inputs
        .iter()
        .map(|input| {
            let file = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| input.display().to_string());
            let found = matching::identify(&file);
            Identification {
                episode: found.map(|m| EpisodeId::new(m.season, m.episode)),
                rule: found.map(|m| m.rule),
                file,
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        match (&row.episode, row.rule) {
            (Some(episode), Some(rule)) => println!("{}: {episode} (rule {rule})", row.file),
            _ => println!("{}: no episode pattern", row.file),
        }
    }
    Ok(())
}
