use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::extract_episode_info;
use crate::domain::episode::EpisodeId;

static FINAL_SEASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)final[\s._-]+season").expect("Invalid final season regex"));

/// True when the name carries a "final season" tag instead of a number.
pub fn has_final_season_marker(filename: &str) -> bool {
    FINAL_SEASON.is_match(filename)
}

/// Pairs two files whose names may use a "final season" tag.
///
/// Such names carry no season number and are read as season 1. When exactly
/// one side is tagged, still on season 1, and the other side names a
/// different season, the tagged side takes that season. Both ids are returned
/// only if they agree afterwards.
pub fn resolve(file_a: &str, file_b: &str) -> (Option<EpisodeId>, Option<EpisodeId>) {
    let (Some((mut season_a, episode_a)), Some((mut season_b, episode_b))) =
        (extract_episode_info(file_a), extract_episode_info(file_b))
    else {
        return (None, None);
    };

    let a_tagged = has_final_season_marker(file_a);
    let b_tagged = has_final_season_marker(file_b);

    if a_tagged && season_a == 1 && season_b != 1 {
        debug!(file = file_a, season = season_b, "season inferred from final season tag");
        season_a = season_b;
    } else if b_tagged && season_b == 1 && season_a != 1 {
        debug!(file = file_b, season = season_a, "season inferred from final season tag");
        season_b = season_a;
    }

    let id_a = EpisodeId::new(season_a, episode_a);
    let id_b = EpisodeId::new(season_b, episode_b);
    if id_a == id_b {
        (Some(id_a), Some(id_b))
    } else {
        (None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(pair: (Option<EpisodeId>, Option<EpisodeId>)) -> (Option<String>, Option<String>) {
        (
            pair.0.map(|id| id.to_string()),
            pair.1.map(|id| id.to_string()),
        )
    }

    fn both(id: &str) -> (Option<String>, Option<String>) {
        (Some(id.to_string()), Some(id.to_string()))
    }

    #[test]
    fn test_marker_detection() {
        assert!(has_final_season_marker("Show FINAL SEASON - 01.ass"));
        assert!(has_final_season_marker("Show.Final.Season.E01.mkv"));
        assert!(has_final_season_marker("show_final-season_03.mkv"));
        assert!(has_final_season_marker("Show Final   Season 04.mkv"));
        assert!(!has_final_season_marker("Show Finalseason 04.mkv"));
        assert!(!has_final_season_marker("Show.S08E01.mkv"));
    }

    #[test]
    fn test_tagged_subtitle_takes_video_season() {
        assert_eq!(
            ids(resolve("Show FINAL SEASON - 01.ass", "Show.S08E01.mkv")),
            both("S08E01")
        );
        assert_eq!(
            ids(resolve(
                "[Heroacainarabic] Boku no Hero Academia FINAL SEASON - 02.ass",
                "My.Hero.Academia.S08E02.Toshinori.Yagi.Rising-Origin.1080p.mkv"
            )),
            both("S08E02")
        );
    }

    #[test]
    fn test_episode_mismatch_is_no_match() {
        assert_eq!(
            ids(resolve("Show FINAL SEASON - 01.ass", "Show.S08E02.mkv")),
            (None, None)
        );
    }

    #[test]
    fn test_tagged_video_takes_subtitle_season() {
        assert_eq!(
            ids(resolve("Boku no Hero Academia S08E01.ass", "My.Hero.Academia.FINAL.SEASON.E01.mkv")),
            both("S08E01")
        );
        assert_eq!(
            ids(resolve("Attack.on.Titan.S04E03.ass", "Attack.on.Titan.FINAL.SEASON - 03.mkv")),
            both("S04E03")
        );
    }

    #[test]
    fn test_both_tagged_is_left_alone() {
        assert_eq!(
            ids(resolve("Show.FINAL.SEASON - 01.ass", "Show.FINAL.SEASON.E01.mkv")),
            both("S01E01")
        );
    }

    #[test]
    fn test_undetectable_side_gives_nothing() {
        assert_eq!(
            ids(resolve("Show FINAL SEASON.ass", "Show.S08E01.mkv")),
            (None, None)
        );
    }
}
