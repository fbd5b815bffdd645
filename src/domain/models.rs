use serde::Serialize;

use super::episode::EpisodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Video,
    Subtitle,
}

/// A scanned file and the episode detected in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub kind: FileKind,
    pub episode: Option<EpisodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Matched,
    NoEpisodeDetected,
    NoMatchingVideo,
}

/// How a matched subtitle found its video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    Episode,
    FinalSeason,
    Movie,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingResult {
    pub subtitle: String,
    pub video: Option<String>,
    pub episode: Option<EpisodeId>,
    pub outcome: Outcome,
    pub basis: Option<MatchBasis>,
}

impl PairingResult {
    pub fn matched(
        subtitle: &str,
        video: &str,
        episode: Option<EpisodeId>,
        basis: MatchBasis,
    ) -> Self {
        Self {
            subtitle: subtitle.to_string(),
            video: Some(video.to_string()),
            episode,
            outcome: Outcome::Matched,
            basis: Some(basis),
        }
    }

    pub fn unmatched(subtitle: &str, episode: Option<EpisodeId>) -> Self {
        let outcome = if episode.is_some() {
            Outcome::NoMatchingVideo
        } else {
            Outcome::NoEpisodeDetected
        };
        Self {
            subtitle: subtitle.to_string(),
            video: None,
            episode,
            outcome,
            basis: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.outcome == Outcome::Matched
    }
}
