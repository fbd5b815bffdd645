use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::pairing::Pairing;
use crate::domain::episode::EpisodeId;
use crate::domain::models::{MatchBasis, PairingResult};
use crate::media::language::{detect_language, language_name};
use crate::media::mkvmerge::{find_mkvmerge, merge_timeout, run_merge, MergeError, MergeJob};

pub const BACKUP_DIR: &str = "backups";

#[derive(Debug, Clone, Default)]
pub struct EmbedOptions {
    pub mkvmerge_path: Option<PathBuf>,
    pub language_code: Option<String>,
    pub default_track: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedStatus {
    Embedded,
    Planned,
    Failed(String),
    NoMatch,
}

/// What happened to one subtitle during an embed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedEntry {
    pub subtitle: String,
    pub video: Option<String>,
    pub episode: Option<EpisodeId>,
    pub basis: Option<MatchBasis>,
    pub language: Option<String>,
    pub status: EmbedStatus,
}

impl EmbedEntry {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, EmbedStatus::Failed(_))
    }
}

/// Only Matroska videos can take an extra track.
pub fn mkv_only(videos: &[String]) -> Vec<String> {
    videos
        .iter()
        .filter(|v| {
            Path::new(v)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("mkv"))
        })
        .cloned()
        .collect()
}

/// Merges every matched subtitle of `pairing` into its video.
///
/// A failed merge is recorded and the run goes on. Only a missing mkvmerge
/// aborts the run.
pub fn embed_subtitles(
    directory: &Path,
    pairing: &Pairing,
    options: &EmbedOptions,
) -> Result<Vec<EmbedEntry>> {
    let needs_tool = !options.dry_run && pairing.matched().next().is_some();
    let tool = if needs_tool {
        let tool = find_mkvmerge(options.mkvmerge_path.as_deref())?;
        info!(tool = %tool.display(), "using mkvmerge");
        Some(tool)
    } else {
        None
    };

    println!("PROCESSING EMBEDDINGS:");
    println!("{}", "-".repeat(40));

    let mut entries = Vec::with_capacity(pairing.results.len());
    for result in &pairing.results {
        let entry = match &result.video {
            Some(video) if result.is_matched() => {
                embed_one(directory, result, video, tool.as_deref(), options)
            }
            _ => {
                let episode = result
                    .episode
                    .as_ref()
                    .map_or("(undetected)".to_string(), ToString::to_string);
                println!("NO MATCH: '{}' -> episode {episode}", result.subtitle);
                EmbedEntry {
                    subtitle: result.subtitle.clone(),
                    video: None,
                    episode: result.episode.clone(),
                    basis: None,
                    language: None,
                    status: EmbedStatus::NoMatch,
                }
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

fn embed_one(
    directory: &Path,
    result: &PairingResult,
    video: &str,
    tool: Option<&Path>,
    options: &EmbedOptions,
) -> EmbedEntry {
    let language = detect_language(&result.subtitle, options.language_code.as_deref());

    println!("\nEMBEDDING: '{}' into '{video}'", result.subtitle);
    match &language {
        Some(code) => println!("  Language: {} ({code})", language_name(code).unwrap_or(code.as_str())),
        None => println!("  Language: (none detected)"),
    }

    let job = MergeJob::new(
        &directory.join(video),
        &directory.join(&result.subtitle),
        language.clone(),
        options.default_track,
    );

    let status = match tool {
        None => {
            println!("  Planned: {}", display_args(&job));
            EmbedStatus::Planned
        }
        Some(tool) => match merge_and_finalize(tool, &job) {
            Ok(()) => {
                println!("  SUCCESS");
                EmbedStatus::Embedded
            }
            Err(e) => {
                println!("  FAILED: {e}");
                warn!(subtitle = %result.subtitle, video, error = %e, "embedding failed");
                EmbedStatus::Failed(e.to_string())
            }
        },
    };

    EmbedEntry {
        subtitle: result.subtitle.clone(),
        video: Some(video.to_string()),
        episode: result.episode.clone(),
        basis: result.basis,
        language,
        status,
    }
}

fn display_args(job: &MergeJob) -> String {
    job.args()
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn merge_and_finalize(tool: &Path, job: &MergeJob) -> Result<(), MergeError> {
    let timeout = merge_timeout(job.input_bytes());
    if let Err(e) = run_merge(tool, job, timeout) {
        discard_output(job);
        return Err(e);
    }
    finalize_merge(job).map_err(|e| {
        discard_output(job);
        MergeError::Backup(e.to_string())
    })
}

/// Removes a partial merge output. Originals are never touched.
fn discard_output(job: &MergeJob) {
    if job.output.exists() {
        match fs::remove_file(&job.output) {
            Ok(()) => info!(file = %job.output.display(), "removed temporary file"),
            Err(e) => warn!(file = %job.output.display(), error = %e, "could not remove temporary file"),
        }
    }
}

/// Moves the originals into `backups/` and puts the merged file in place of
/// the video.
fn finalize_merge(job: &MergeJob) -> std::io::Result<()> {
    let directory = job.video.parent().unwrap_or(Path::new("."));
    let backups = directory.join(BACKUP_DIR);
    if !backups.exists() {
        fs::create_dir_all(&backups)?;
        info!(dir = %backups.display(), "created backups directory");
    }

    for original in [&job.video, &job.subtitle] {
        let Some(name) = original.file_name() else {
            continue;
        };
        let backup = backups.join(name);
        if backup.exists() {
            info!(file = %backup.display(), "backup already exists");
        } else {
            fs::rename(original, &backup)?;
        }
    }

    // The subtitle only leaves the working directory once it is safely backed up.
    if let Some(name) = job.subtitle.file_name() {
        if backups.join(name).exists() && job.subtitle.exists() {
            fs::remove_file(&job.subtitle)?;
        } else if !backups.join(name).exists() {
            warn!(file = %job.subtitle.display(), "subtitle not in backups, keeping it");
        }
    }

    fs::rename(&job.output, &job.video)
}
