use anyhow::{bail, Context, Result};
use regex::Regex;
use rustyline::DefaultEditor;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::warn;

use super::pairing::Pairing;
use crate::domain::episode::EpisodeId;
use crate::domain::models::{Outcome, PairingResult};

/// Generic "sub"/"subtitle" words dropped from a subtitle name before it is
/// reused in a unique target name.
static SUBTITLE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[._\-\s]*sub(?:title)?[._\-\s]*").expect("Invalid subtitle suffix regex")
});

#[derive(Debug, Clone, Default)]
pub struct RenameOptions {
    pub language_suffix: Option<String>,
    pub dry_run: bool,
    pub skip_confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameStatus {
    Renamed,
    /// Renamed to a unique variant because the preferred name was taken.
    ConflictResolved,
    AlreadyNamed,
    Planned,
    Declined,
    Failed(String),
}

/// What happened to one subtitle during a rename run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    pub subtitle: String,
    pub video: Option<String>,
    pub target: Option<String>,
    pub episode: Option<EpisodeId>,
    pub outcome: Outcome,
    pub status: Option<RenameStatus>,
}

impl RenameEntry {
    pub fn is_renamed(&self) -> bool {
        matches!(
            self.status,
            Some(RenameStatus::Renamed | RenameStatus::ConflictResolved)
        )
    }
}

fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// `<video stem>[.<suffix>]<ext>`.
pub fn build_subtitle_filename(video: &str, subtitle_ext: &str, language_suffix: Option<&str>) -> String {
    let (stem, _) = split_name(video);
    match language_suffix {
        Some(suffix) => format!("{stem}.{suffix}{subtitle_ext}"),
        None => format!("{stem}{subtitle_ext}"),
    }
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// Picks a free target name for `subtitle` in `directory`.
///
/// Names in `taken` count as occupied even if nothing exists on disk yet.
/// The subtitle's own path never counts as a collision. The counter is
/// bounded by the number of names that could possibly collide.
pub fn find_unique_filename(
    directory: &Path,
    subtitle: &str,
    video: &str,
    language_suffix: Option<&str>,
    taken: &HashSet<String>,
) -> Result<(String, bool)> {
    let old_path = directory.join(subtitle);
    let occupied = |name: &str| {
        if taken.contains(name) {
            return true;
        }
        let path = directory.join(name);
        path.exists() && path != old_path
    };

    let (subtitle_base, subtitle_ext) = split_name(subtitle);
    let preferred = build_subtitle_filename(video, subtitle_ext, language_suffix);
    if !occupied(&preferred) {
        return Ok((preferred, false));
    }

    let cleaned = SUBTITLE_SUFFIX.replace_all(subtitle_base, "");
    let cleaned: &str = if cleaned.is_empty() { subtitle_base } else { &cleaned };
    let (video_stem, _) = split_name(video);
    let prefix = language_suffix.map(|s| format!("{s}_")).unwrap_or_default();
    let specific = sanitize_filename(&format!("{video_stem}.{prefix}{cleaned}{subtitle_ext}"));
    if !occupied(&specific) {
        return Ok((specific, true));
    }

    let existing = fs::read_dir(directory)
        .with_context(|| format!("Failed to list {}", directory.display()))?
        .count();
    let bound = existing + taken.len() + 1;
    let (name_part, ext_part) = split_name(&specific);
    for counter in 1..=bound {
        let candidate = format!("{name_part}_{counter}{ext_part}");
        if !occupied(&candidate) {
            return Ok((candidate, true));
        }
    }
    bail!("No free name for {subtitle} after {bound} attempts")
}

pub fn confirm_rename(old_path: &Path, new_path: &Path) -> Result<bool> {
    println!(
        "Rename \"{}\" -> \"{}\"? [y/N] ",
        display_name(old_path),
        display_name(new_path)
    );

    let mut rl = DefaultEditor::new()?;
    loop {
        let input = rl.readline("").unwrap_or_default();
        let input = input.trim().to_lowercase();

        if input == "y" || input == "yes" {
            return Ok(true);
        } else if input == "n" || input == "no" || input.is_empty() {
            return Ok(false);
        } else {
            println!("Please enter 'y' or 'n'.");
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn rename_file(old_path: &Path, new_path: &Path, skip_confirm: bool) -> Result<bool> {
    if !skip_confirm && !confirm_rename(old_path, new_path)? {
        return Ok(false);
    }
    fs::rename(old_path, new_path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            old_path.display(),
            new_path.display()
        )
    })?;
    Ok(true)
}

/// Renames every matched subtitle of `pairing` inside `directory`.
///
/// A subtitle that cannot be named or renamed is recorded as failed and the
/// run goes on.
pub fn rename_subtitles(
    directory: &Path,
    pairing: &Pairing,
    options: &RenameOptions,
) -> Vec<RenameEntry> {
    let suffix = options.language_suffix.as_deref();
    let mut taken: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(pairing.results.len());

    println!("PROCESSING SUBTITLES:");
    println!("{}", "-".repeat(40));

    for result in &pairing.results {
        let entry = match &result.video {
            Some(video) if result.is_matched() => {
                rename_one(directory, result, video, suffix, options, &mut taken)
            }
            _ => {
                match (&result.outcome, &result.episode) {
                    (Outcome::NoMatchingVideo, Some(episode)) => println!(
                        "NO MATCH: '{}' -> episode {episode} has no matching video",
                        result.subtitle
                    ),
                    _ => println!(
                        "NO EPISODE: '{}' -> could not detect episode number",
                        result.subtitle
                    ),
                }
                RenameEntry {
                    subtitle: result.subtitle.clone(),
                    video: None,
                    target: None,
                    episode: result.episode.clone(),
                    outcome: result.outcome,
                    status: None,
                }
            }
        };
        entries.push(entry);
    }

    entries
}

fn rename_one(
    directory: &Path,
    result: &PairingResult,
    video: &str,
    suffix: Option<&str>,
    options: &RenameOptions,
    taken: &mut HashSet<String>,
) -> RenameEntry {
    let subtitle = &result.subtitle;
    let mut entry = RenameEntry {
        subtitle: subtitle.clone(),
        video: Some(video.to_string()),
        target: None,
        episode: result.episode.clone(),
        outcome: result.outcome,
        status: None,
    };

    let (target, conflict) = match find_unique_filename(directory, subtitle, video, suffix, taken) {
        Ok(found) => found,
        Err(e) => {
            println!("FAILED: '{subtitle}' -> {e:#}");
            warn!(subtitle = %subtitle, error = %e, "no target name");
            entry.status = Some(RenameStatus::Failed(format!("{e:#}")));
            return entry;
        }
    };
    taken.insert(target.clone());

    let old_path = directory.join(subtitle);
    let new_path: PathBuf = directory.join(&target);

    let status = if &target == subtitle {
        println!("ALREADY NAMED: '{subtitle}'");
        RenameStatus::AlreadyNamed
    } else if options.dry_run {
        println!("WOULD RENAME: '{subtitle}' -> '{target}'");
        RenameStatus::Planned
    } else {
        match rename_file(&old_path, &new_path, options.skip_confirm) {
            Ok(true) if conflict => {
                println!(
                    "CONFLICT RESOLVED: Multiple subtitles match '{video}' -> renamed '{subtitle}' to unique name '{target}'"
                );
                RenameStatus::ConflictResolved
            }
            Ok(true) => {
                println!("RENAMED: '{subtitle}' -> '{target}'");
                RenameStatus::Renamed
            }
            Ok(false) => {
                println!("Skipped.");
                RenameStatus::Declined
            }
            Err(e) => {
                warn!(subtitle = %subtitle, error = %e, "rename failed");
                RenameStatus::Failed(format!("{e:#}"))
            }
        }
    };

    entry.target = Some(target);
    entry.status = Some(status);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::cache::EpisodeCache;
    use crate::workflows::pairing::pair;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            File::create(dir.join(name)).unwrap();
        }
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn options(suffix: Option<&str>, dry_run: bool) -> RenameOptions {
        RenameOptions {
            language_suffix: suffix.map(String::from),
            dry_run,
            skip_confirm: true,
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Normal Name.srt"), "Normal Name.srt");
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_build_subtitle_filename() {
        assert_eq!(
            build_subtitle_filename("Show.S01E01.1080p.mkv", ".srt", Some("ar")),
            "Show.S01E01.1080p.ar.srt"
        );
        assert_eq!(
            build_subtitle_filename("Show.S01E01.mkv", ".ass", None),
            "Show.S01E01.ass"
        );
    }

    #[test]
    fn test_find_unique_filename_no_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        touch(dir, &["Show.S01E01.mkv", "episode1.srt"]);

        let (name, conflict) =
            find_unique_filename(dir, "episode1.srt", "Show.S01E01.mkv", Some("ar"), &HashSet::new())
                .unwrap();
        assert_eq!(name, "Show.S01E01.ar.srt");
        assert!(!conflict);
    }

    #[test]
    fn test_find_unique_filename_with_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        touch(dir, &["Show.S01E01.ar.srt", "Show 01 subtitle.srt"]);

        let (name, conflict) = find_unique_filename(
            dir,
            "Show 01 subtitle.srt",
            "Show.S01E01.mkv",
            Some("ar"),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(name, "Show.S01E01.ar_Show 01.srt");
        assert!(conflict);

        touch(dir, &["Show.S01E01.ar_Show 01.srt"]);
        let (name, _) = find_unique_filename(
            dir,
            "Show 01 subtitle.srt",
            "Show.S01E01.mkv",
            Some("ar"),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(name, "Show.S01E01.ar_Show 01_1.srt");
    }

    #[test]
    fn test_find_unique_filename_same_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        touch(dir, &["Show.S01E01.srt"]);

        let (name, conflict) =
            find_unique_filename(dir, "Show.S01E01.srt", "Show.S01E01.mkv", None, &HashSet::new())
                .unwrap();
        assert_eq!(name, "Show.S01E01.srt");
        assert!(!conflict);
    }

    #[test]
    fn test_taken_names_count_as_occupied() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let taken: HashSet<String> = ["Show.S01E01.srt".to_string()].into();

        let (name, conflict) =
            find_unique_filename(dir, "other.srt", "Show.S01E01.mkv", None, &taken).unwrap();
        assert_eq!(name, "Show.S01E01.other.srt");
        assert!(conflict);
    }

    #[test]
    fn test_two_subtitles_for_one_video_get_distinct_names() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let videos = ["Show.S01E01.mkv", "Show.S01E02.mkv"];
        let subtitles = ["Show.S01E01.ar.srt", "Show.S01E01.en.srt"];
        touch(dir, &videos);
        touch(dir, &subtitles);

        let mut cache = EpisodeCache::new();
        let pairing = pair(&strings(&videos), &strings(&subtitles), &mut cache);
        let entries = rename_subtitles(dir, &pairing, &options(None, false));

        let targets: Vec<_> = entries.iter().filter_map(|e| e.target.clone()).collect();
        assert_eq!(targets, ["Show.S01E01.srt", "Show.S01E01.Show.S01E01.en.srt"]);
        assert_eq!(entries[1].status, Some(RenameStatus::ConflictResolved));
        for target in &targets {
            assert!(dir.join(target).exists(), "{target}");
        }
        assert!(!dir.join("Show.S01E01.ar.srt").exists());
        assert!(!dir.join("Show.S01E01.en.srt").exists());
    }

    #[test]
    fn test_dry_run_reserves_names_without_touching_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let videos = ["Show.S01E01.mkv"];
        let subtitles = ["a.S01E01.srt", "b.S01E01.srt"];
        touch(dir, &videos);
        touch(dir, &subtitles);

        let mut cache = EpisodeCache::new();
        let pairing = pair(&strings(&videos), &strings(&subtitles), &mut cache);
        let entries = rename_subtitles(dir, &pairing, &options(Some("ar"), true));

        assert_eq!(entries[0].target.as_deref(), Some("Show.S01E01.ar.srt"));
        assert_eq!(entries[1].target.as_deref(), Some("Show.S01E01.ar_b.S01E01.srt"));
        assert!(entries.iter().all(|e| e.status == Some(RenameStatus::Planned)));
        assert!(dir.join("a.S01E01.srt").exists());
        assert!(!dir.join("Show.S01E01.ar.srt").exists());
    }

    #[test]
    fn test_already_named_subtitle_is_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        touch(dir, &["Show.S01E01.mkv", "Show.S01E01.srt", "Show.S01E09.srt"]);

        let mut cache = EpisodeCache::new();
        let pairing = pair(
            &strings(&["Show.S01E01.mkv"]),
            &strings(&["Show.S01E01.srt", "Show.S01E09.srt"]),
            &mut cache,
        );
        let entries = rename_subtitles(dir, &pairing, &options(None, false));
        assert_eq!(entries[0].status, Some(RenameStatus::AlreadyNamed));
        assert_eq!(entries[1].status, None);
        assert_eq!(entries[1].outcome, Outcome::NoMatchingVideo);
        assert!(!entries.iter().any(RenameEntry::is_renamed));
    }

    #[test]
    fn test_naming_failure_only_fails_that_subtitle() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("unlisted");
        // The last two share a cleaned name, so the third needs a counter,
        // which requires listing the directory.
        let subtitles = ["a.S01E01.srt", "b.S01E01.srt", "b.S01E01.sub.srt", "Show.S01E02.srt"];

        let mut cache = EpisodeCache::new();
        let pairing = pair(
            &strings(&["Show.S01E01.mkv", "Show.S01E02.mkv"]),
            &strings(&subtitles),
            &mut cache,
        );
        let entries = rename_subtitles(&dir, &pairing, &options(None, true));

        assert_eq!(entries.len(), 4);
        let by_name: std::collections::HashMap<_, _> =
            entries.iter().map(|e| (e.subtitle.as_str(), e)).collect();
        assert_eq!(by_name["a.S01E01.srt"].target.as_deref(), Some("Show.S01E01.srt"));
        assert_eq!(
            by_name["b.S01E01.srt"].target.as_deref(),
            Some("Show.S01E01.b.S01E01.srt")
        );
        let failed = by_name["b.S01E01.sub.srt"];
        assert!(matches!(failed.status, Some(RenameStatus::Failed(_))));
        assert_eq!(failed.target, None);
        assert_eq!(by_name["Show.S01E02.srt"].status, Some(RenameStatus::AlreadyNamed));
    }
}
