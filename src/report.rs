//! Plain-text run reports and console summaries.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workflows::embedder::{EmbedEntry, EmbedStatus};
use crate::workflows::pairing::Analysis;
use crate::workflows::renamer::{RenameEntry, RenameStatus};

/// Everything a report needs besides its own rows.
#[derive(Debug)]
pub struct ReportContext<'a> {
    pub directory: &'a Path,
    pub analysis: &'a Analysis,
    pub movie_mode: bool,
    pub dry_run: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub enum Report {
    Renaming {
        entries: Vec<RenameEntry>,
        language_suffix: Option<String>,
    },
    Embedding {
        entries: Vec<EmbedEntry>,
        language_code: Option<String>,
        default_track: bool,
    },
}

impl Report {
    pub fn file_name(&self) -> &'static str {
        match self {
            Report::Renaming { .. } => "renaming_report.txt",
            Report::Embedding { .. } => "embedding_report.txt",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Report::Renaming { .. } => "Subtitle renaming report",
            Report::Embedding { .. } => "Subtitle embedding report",
        }
    }

    /// Label and count pairs, in display order.
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        match self {
            Report::Renaming { entries, .. } => {
                let count = |f: fn(&RenameEntry) -> bool| entries.iter().filter(|e| f(e)).count();
                vec![
                    ("Subtitles", entries.len()),
                    ("Renamed", count(RenameEntry::is_renamed)),
                    ("Already named", count(|e| e.status == Some(RenameStatus::AlreadyNamed))),
                    ("Planned", count(|e| e.status == Some(RenameStatus::Planned))),
                    ("Skipped", count(|e| e.status == Some(RenameStatus::Declined))),
                    ("Failed", count(|e| matches!(e.status, Some(RenameStatus::Failed(_))))),
                    ("Unmatched", count(|e| e.status.is_none())),
                ]
            }
            Report::Embedding { entries, .. } => {
                let count = |f: fn(&EmbedEntry) -> bool| entries.iter().filter(|e| f(e)).count();
                vec![
                    ("Subtitles", entries.len()),
                    ("Embedded", count(|e| e.status == EmbedStatus::Embedded)),
                    ("Planned", count(|e| e.status == EmbedStatus::Planned)),
                    ("Failed", count(EmbedEntry::is_failed)),
                    ("Unmatched", count(|e| e.status == EmbedStatus::NoMatch)),
                ]
            }
        }
    }

    fn configuration(&self) -> Vec<String> {
        match self {
            Report::Renaming { language_suffix, .. } => vec![format!(
                "language_suffix = {}",
                language_suffix.as_deref().unwrap_or("(none)")
            )],
            Report::Embedding {
                language_code,
                default_track,
                ..
            } => vec![
                format!(
                    "language_code = {}",
                    language_code.as_deref().unwrap_or("(detect only)")
                ),
                format!("default_track = {default_track}"),
            ],
        }
    }

    fn table(&self) -> Table {
        match self {
            Report::Renaming { entries, .. } => {
                let mut table = Table::new(&["Subtitle", "Episode", "New name", "Status"]);
                for e in entries {
                    table.row(vec![
                        e.subtitle.clone(),
                        episode_cell(e.episode.as_ref().map(ToString::to_string)),
                        e.target.clone().unwrap_or_else(|| "-".into()),
                        rename_status(e),
                    ]);
                }
                table
            }
            Report::Embedding { entries, .. } => {
                let mut table = Table::new(&["Subtitle", "Video", "Episode", "Language", "Status"]);
                for e in entries {
                    table.row(vec![
                        e.subtitle.clone(),
                        e.video.clone().unwrap_or_else(|| "-".into()),
                        episode_cell(e.episode.as_ref().map(ToString::to_string)),
                        e.language.clone().unwrap_or_else(|| "N/A".into()),
                        embed_status(&e.status),
                    ]);
                }
                table
            }
        }
    }

    pub fn render(&self, ctx: &ReportContext, generated: DateTime<Local>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}", self.title());
        let _ = writeln!(out, "# Generated: {}", generated.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "# Directory: {}", ctx.directory.display());
        for line in self.configuration() {
            let _ = writeln!(out, "# {line}");
        }
        if ctx.dry_run {
            let _ = writeln!(out, "# Dry run: no files were changed");
        }
        if ctx.movie_mode {
            let _ = writeln!(out, "# Movie mode: matched by title");
        }
        out.push('\n');

        out.push_str("SUMMARY\n");
        for (label, count) in self.counts() {
            let _ = writeln!(out, "  {label:<14} {count}");
        }
        let _ = writeln!(out, "  {:<14} {}", "Elapsed", format_duration(ctx.elapsed));
        out.push('\n');

        out.push_str("FILES\n");
        out.push_str(&self.table().render());
        out.push('\n');

        render_analysis(&mut out, ctx.analysis);
        out
    }

    /// Writes the report into the processed directory.
    pub fn write(&self, ctx: &ReportContext) -> Result<PathBuf> {
        let path = ctx.directory.join(self.file_name());
        fs::write(&path, self.render(ctx, Local::now()))
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(path)
    }

    pub fn print_summary(&self, ctx: &ReportContext) {
        println!("\n{}", "=".repeat(60));
        let counts: Vec<String> = self
            .counts()
            .into_iter()
            .map(|(label, count)| format!("{count} {}", label.to_lowercase()))
            .collect();
        println!("COMPLETED: {}", counts.join(" | "));
        println!("Execution time: {}", format_duration(ctx.elapsed));
        println!("{}", "=".repeat(60));
        print_analysis(ctx.analysis);
    }
}

fn episode_cell(episode: Option<String>) -> String {
    episode.unwrap_or_else(|| "N/A".into())
}

fn rename_status(entry: &RenameEntry) -> String {
    match &entry.status {
        Some(RenameStatus::Renamed) => "renamed".into(),
        Some(RenameStatus::ConflictResolved) => "renamed (conflict)".into(),
        Some(RenameStatus::AlreadyNamed) => "already named".into(),
        Some(RenameStatus::Planned) => "planned".into(),
        Some(RenameStatus::Declined) => "skipped".into(),
        Some(RenameStatus::Failed(e)) => format!("failed: {e}"),
        None => serde_json::to_value(entry.outcome)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unmatched".into()),
    }
}

fn embed_status(status: &EmbedStatus) -> String {
    match status {
        EmbedStatus::Embedded => "embedded".into(),
        EmbedStatus::Planned => "planned".into(),
        EmbedStatus::Failed(e) => format!("failed: {e}"),
        EmbedStatus::NoMatch => "no match".into(),
    }
}

fn render_analysis(out: &mut String, analysis: &Analysis) {
    out.push_str("MATCHED EPISODES\n");
    if analysis.matched.is_empty() {
        out.push_str("  (none)\n");
    }
    for episode in &analysis.matched {
        let _ = writeln!(out, "  {episode}");
    }
    out.push('\n');

    out.push_str("MISSING MATCHES\n");
    let mut any = false;
    for (episode, video) in &analysis.videos_without_subtitle {
        let _ = writeln!(out, "  {episode}  no subtitle for {video}");
        any = true;
    }
    for (episode, subtitle) in &analysis.subtitles_without_video {
        let _ = writeln!(out, "  {episode}  no video for {subtitle}");
        any = true;
    }
    for name in &analysis.unidentified {
        let _ = writeln!(out, "  N/A     no episode pattern in {name}");
        any = true;
    }
    if !any {
        out.push_str("  (none)\n");
    }
}

fn print_analysis(analysis: &Analysis) {
    let matched: Vec<String> = analysis.matched.iter().map(ToString::to_string).collect();
    if !matched.is_empty() {
        println!("Matched episodes: {}", matched.join(", "));
    }
    if !analysis.videos_without_subtitle.is_empty() {
        let missing: Vec<String> = analysis
            .videos_without_subtitle
            .keys()
            .map(ToString::to_string)
            .collect();
        println!("Videos without subtitle: {}", missing.join(", "));
    }
    if !analysis.subtitles_without_video.is_empty() {
        let missing: Vec<String> = analysis
            .subtitles_without_video
            .keys()
            .map(ToString::to_string)
            .collect();
        println!("Subtitles without video: {}", missing.join(", "));
    }
    if !analysis.unidentified.is_empty() {
        println!("No episode pattern detected:");
        for name in &analysis.unidentified {
            println!("  {name}");
        }
    }
}

pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        let whole = elapsed.as_secs();
        format!("{}m {}s", whole / 60, whole % 60)
    }
}

/// Fixed-width text table with `+---+` borders.
#[derive(Debug, Default)]
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }

    fn render(&self) -> String {
        let widths = self.widths();
        let border: String = widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(w + 2)))
            .collect::<String>()
            + "+\n";
        let line = |cells: &[String]| {
            let mut s: String = widths
                .iter()
                .zip(cells)
                .map(|(w, cell)| {
                    let pad = w - cell.chars().count();
                    format!("| {cell}{} ", " ".repeat(pad))
                })
                .collect();
            s.push_str("|\n");
            s
        };

        let mut out = border.clone();
        out.push_str(&line(&self.headers));
        out.push_str(&border);
        for row in &self.rows {
            out.push_str(&line(row));
        }
        out.push_str(&border);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::episode::EpisodeId;
    use crate::domain::models::Outcome;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn rename_entries() -> Vec<RenameEntry> {
        vec![
            RenameEntry {
                subtitle: "a.S01E01.srt".into(),
                video: Some("Show.S01E01.mkv".into()),
                target: Some("Show.S01E01.ar.srt".into()),
                episode: Some(EpisodeId::new(1, 1)),
                outcome: Outcome::Matched,
                status: Some(RenameStatus::Renamed),
            },
            RenameEntry {
                subtitle: "notes.srt".into(),
                video: None,
                target: None,
                episode: None,
                outcome: Outcome::NoEpisodeDetected,
                status: None,
            },
        ]
    }

    fn analysis() -> Analysis {
        let mut analysis = Analysis::default();
        analysis.matched.insert(EpisodeId::new(1, 1));
        analysis
            .videos_without_subtitle
            .insert(EpisodeId::new(1, 2), "Show.S01E02.mkv".into());
        analysis.unidentified.push("notes.srt".into());
        analysis
    }

    #[test]
    fn test_table_borders_align() {
        let mut table = Table::new(&["A", "Long header"]);
        table.row(vec!["wide cell".into(), "x".into()]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "+-----------+-------------+");
        assert_eq!(lines[1], "| A         | Long header |");
        assert_eq!(lines[3], "| wide cell | x           |");
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
    }

    #[test]
    fn test_renaming_counts() {
        let report = Report::Renaming {
            entries: rename_entries(),
            language_suffix: Some("ar".into()),
        };
        let counts = report.counts();
        assert!(counts.contains(&("Subtitles", 2)));
        assert!(counts.contains(&("Renamed", 1)));
        assert!(counts.contains(&("Unmatched", 1)));
        assert_eq!(report.file_name(), "renaming_report.txt");
    }

    #[test]
    fn test_render_sections() {
        let report = Report::Renaming {
            entries: rename_entries(),
            language_suffix: Some("ar".into()),
        };
        let analysis = analysis();
        let ctx = ReportContext {
            directory: Path::new("/media/show"),
            analysis: &analysis,
            movie_mode: false,
            dry_run: false,
            elapsed: Duration::from_millis(1500),
        };
        let generated = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let text = report.render(&ctx, generated);

        assert!(text.starts_with("# Subtitle renaming report\n# Generated: 2024-05-01 12:30:00\n"));
        assert!(text.contains("# Directory: /media/show"));
        assert!(text.contains("# language_suffix = ar"));
        assert!(text.contains("Elapsed        1.50s"));
        assert!(text.contains("| notes.srt    | N/A     | -                  | no_episode_detected |"));
        assert!(text.contains("MATCHED EPISODES\n  S01E01\n"));
        assert!(text.contains("S01E02  no subtitle for Show.S01E02.mkv"));
        assert!(text.contains("no episode pattern in notes.srt"));
    }

    #[test]
    fn test_embedding_report_written_to_directory() {
        let temp_dir = TempDir::new().unwrap();
        let report = Report::Embedding {
            entries: vec![EmbedEntry {
                subtitle: "a.ar.srt".into(),
                video: Some("a.mkv".into()),
                episode: None,
                basis: None,
                language: Some("ara".into()),
                status: EmbedStatus::Failed("mkvmerge failed: bad input".into()),
            }],
            language_code: None,
            default_track: true,
        };
        let analysis = Analysis::default();
        let ctx = ReportContext {
            directory: temp_dir.path(),
            analysis: &analysis,
            movie_mode: true,
            dry_run: false,
            elapsed: Duration::from_secs(75),
        };

        let path = report.write(&ctx).unwrap();
        assert_eq!(path, temp_dir.path().join("embedding_report.txt"));
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("# Movie mode"));
        assert!(text.contains("failed: mkvmerge failed: bad input"));
        assert!(text.contains("Elapsed        1m 15s"));
        assert!(text.contains("MISSING MATCHES\n  (none)\n"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "0.25s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
