//! Pairs subtitles with videos in one directory listing.
//!
//! Videos are processed first to build the authoritative episode table; every
//! subtitle is then resolved against it. Both lists are handled in sorted
//! order so the outcome does not depend on directory iteration order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

use crate::domain::episode::{EpisodeId, EpisodeKey};
use crate::domain::models::{FileKind, FileRecord, MatchBasis, PairingResult};
use crate::infra::cache::EpisodeCache;
use crate::matching::{final_season, movie};

/// Canonical episode text per (season, episode) key, and the video chosen for
/// each canonical text. The first video in sorted order wins both.
#[derive(Debug, Default)]
pub struct EpisodeTable {
    canonical: HashMap<EpisodeKey, String>,
    videos: HashMap<String, String>,
}

impl EpisodeTable {
    pub fn build(videos: &[FileRecord]) -> Self {
        let mut table = Self::default();
        for video in videos {
            if let Some(episode) = &video.episode {
                table.record(episode, &video.name);
            }
        }
        table
    }

    fn record(&mut self, episode: &EpisodeId, video: &str) {
        let Some(key) = episode.key() else {
            return;
        };
        let text = episode.as_str().to_string();
        self.canonical.entry(key).or_insert_with(|| text.clone());
        self.videos.entry(text).or_insert_with(|| video.to_string());
    }

    pub fn canonical(&self, key: &EpisodeKey) -> Option<&str> {
        self.canonical.get(key).map(String::as_str)
    }

    pub fn video_for(&self, episode: &str) -> Option<&str> {
        self.videos.get(episode).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }
}

/// Result of pairing one directory listing.
#[derive(Debug)]
pub struct Pairing {
    pub table: EpisodeTable,
    pub videos: Vec<FileRecord>,
    pub subtitles: Vec<FileRecord>,
    pub results: Vec<PairingResult>,
    pub movie_mode: bool,
}

/// Episode-level breakdown of a pairing, for summaries and reports.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Analysis {
    pub matched: BTreeSet<EpisodeId>,
    pub videos_without_subtitle: BTreeMap<EpisodeId, String>,
    pub subtitles_without_video: BTreeMap<EpisodeId, String>,
    pub unidentified: Vec<String>,
}

fn records(names: &[String], kind: FileKind, cache: &mut EpisodeCache) -> Vec<FileRecord> {
    let mut names: Vec<&String> = names.iter().collect();
    names.sort();
    names.dedup();
    names
        .into_iter()
        .map(|name| FileRecord {
            name: name.clone(),
            kind,
            episode: cache.lookup(name),
        })
        .collect()
}

pub fn pair(videos: &[String], subtitles: &[String], cache: &mut EpisodeCache) -> Pairing {
    let videos = records(videos, FileKind::Video, cache);
    let table = EpisodeTable::build(&videos);
    debug!(videos = videos.len(), episodes = table.len(), "episode table built");
    let subtitles = records(subtitles, FileKind::Subtitle, cache);

    let mut results: Vec<PairingResult> = subtitles
        .iter()
        .map(|subtitle| resolve_subtitle(subtitle, &table, &videos))
        .collect();

    let movie_mode = try_movie_mode(&table, &videos, &subtitles, &mut results);

    Pairing {
        table,
        videos,
        subtitles,
        results,
        movie_mode,
    }
}

fn resolve_subtitle(
    subtitle: &FileRecord,
    table: &EpisodeTable,
    videos: &[FileRecord],
) -> PairingResult {
    let Some(raw) = &subtitle.episode else {
        info!(subtitle = %subtitle.name, "no episode detected");
        return PairingResult::unmatched(&subtitle.name, None);
    };

    // Look up through the videos' spelling of this episode when one exists.
    let working = raw
        .key()
        .and_then(|key| table.canonical(&key))
        .unwrap_or(raw.as_str());

    let direct = table
        .video_for(working)
        .or_else(|| table.video_for(raw.as_str()));
    if let Some(video) = direct {
        return PairingResult::matched(&subtitle.name, video, Some(raw.clone()), MatchBasis::Episode);
    }

    if let Some((video, episode)) = infer_final_season(&subtitle.name, videos) {
        info!(subtitle = %subtitle.name, video, episode = %episode, "matched through final season tag");
        return PairingResult::matched(&subtitle.name, video, Some(episode), MatchBasis::FinalSeason);
    }

    info!(subtitle = %subtitle.name, episode = %raw, "no video for episode");
    PairingResult::unmatched(&subtitle.name, Some(raw.clone()))
}

fn infer_final_season<'v>(
    subtitle: &str,
    videos: &'v [FileRecord],
) -> Option<(&'v str, EpisodeId)> {
    let subtitle_tagged = final_season::has_final_season_marker(subtitle);
    videos
        .iter()
        .filter(|v| v.episode.is_some())
        .filter(|v| subtitle_tagged || final_season::has_final_season_marker(&v.name))
        .find_map(|v| match final_season::resolve(subtitle, &v.name) {
            (Some(episode), Some(_)) => Some((v.name.as_str(), episode)),
            _ => None,
        })
}

/// Falls back to title matching when episode matching found nothing and a
/// single video and subtitle are left over.
fn try_movie_mode(
    table: &EpisodeTable,
    videos: &[FileRecord],
    subtitles: &[FileRecord],
    results: &mut [PairingResult],
) -> bool {
    if results.iter().any(PairingResult::is_matched) {
        return false;
    }

    let leftover_videos: Vec<&FileRecord> = if table.is_empty() {
        videos.iter().collect()
    } else {
        videos.iter().filter(|v| v.episode.is_none()).collect()
    };
    let leftover_subtitles: Vec<&FileRecord> = if table.is_empty() {
        subtitles.iter().collect()
    } else {
        subtitles.iter().filter(|s| s.episode.is_none()).collect()
    };

    let ([video], [subtitle]) = (leftover_videos.as_slice(), leftover_subtitles.as_slice()) else {
        return false;
    };
    if !movie::titles_match(&video.name, &subtitle.name) {
        info!(video = %video.name, subtitle = %subtitle.name, "movie titles do not match");
        return false;
    }

    info!(video = %video.name, subtitle = %subtitle.name, "matched as movie");
    if let Some(result) = results.iter_mut().find(|r| r.subtitle == subtitle.name) {
        *result = PairingResult::matched(&subtitle.name, &video.name, None, MatchBasis::Movie);
    }
    true
}

impl Pairing {
    pub fn matched(&self) -> impl Iterator<Item = &PairingResult> {
        self.results.iter().filter(|r| r.is_matched())
    }

    pub fn analysis(&self) -> Analysis {
        let mut analysis = Analysis::default();

        let mut subtitle_keys = BTreeSet::new();
        for (record, result) in self.subtitles.iter().zip(&self.results) {
            let Some(raw) = &record.episode else {
                continue;
            };
            if let Some(key) = raw.key() {
                subtitle_keys.insert(key);
            }
            match &result.episode {
                Some(episode) if result.is_matched() => {
                    analysis.matched.insert(episode.clone());
                    if let Some(key) = episode.key() {
                        subtitle_keys.insert(key);
                    }
                }
                _ => {
                    analysis
                        .subtitles_without_video
                        .entry(raw.clone())
                        .or_insert_with(|| record.name.clone());
                }
            }
        }

        for video in &self.videos {
            let Some(episode) = &video.episode else {
                continue;
            };
            let covered = episode.key().is_some_and(|key| subtitle_keys.contains(&key));
            if !covered {
                analysis
                    .videos_without_subtitle
                    .entry(episode.clone())
                    .or_insert_with(|| video.name.clone());
            }
        }

        if !self.movie_mode {
            analysis.unidentified = self
                .videos
                .iter()
                .chain(&self.subtitles)
                .filter(|r| r.episode.is_none())
                .map(|r| r.name.clone())
                .collect();
            analysis.unidentified.sort();
        }

        analysis
    }
}
