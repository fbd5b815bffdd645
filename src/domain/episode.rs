use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static CANONICAL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^S(\d+)E(\d+)").expect("Invalid canonical id regex"));

/// Integer (season, episode) pair used as the lookup key for an episode.
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize)]
pub struct EpisodeKey {
    pub season: u64,
    pub episode: u64,
}

impl EpisodeKey {
    pub fn new(season: u64, episode: u64) -> Self {
        Self { season, episode }
    }
}

/// Formats a season/episode pair as `S##E##`, zero-padding each side to two
/// digits. Wider values are kept as-is (`S01E1015`).
pub fn normalize(season: u64, episode: u64) -> String {
    format!("S{season:02}E{episode:02}")
}

/// Splits a canonical identifier back into its textual season and episode
/// parts. Returns `None` when the text does not start with `S<digits>E<digits>`.
pub fn denormalize(text: &str) -> Option<(String, String)> {
    let caps = CANONICAL_ID.captures(text)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Canonical `S##E##` identifier.
///
/// The text is always produced by [`normalize`], so two ids are equal exactly
/// when their season and episode numbers are.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EpisodeId(String);

impl EpisodeId {
    pub fn new(season: u64, episode: u64) -> Self {
        Self(normalize(season, episode))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric key recovered from the canonical text.
    pub fn key(&self) -> Option<EpisodeKey> {
        let (season, episode) = denormalize(&self.0)?;
        Some(EpisodeKey::new(season.parse().ok()?, episode.parse().ok()?))
    }
}

impl From<EpisodeKey> for EpisodeId {
    fn from(key: EpisodeKey) -> Self {
        Self::new(key.season, key.episode)
    }
}

/// Numeric order, so `S01E99` sorts before `S01E100`.
impl Ord for EpisodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key()
            .cmp(&other.key())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for EpisodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pads_to_two_digits() {
        assert_eq!(normalize(1, 5), "S01E05");
        assert_eq!(normalize(12, 3), "S12E03");
        assert_eq!(normalize(0, 0), "S00E00");
    }

    #[test]
    fn test_normalize_never_truncates() {
        assert_eq!(normalize(1, 1015), "S01E1015");
        assert_eq!(normalize(100, 7), "S100E07");
        assert_eq!(normalize(1, 99_999_999_999), "S01E99999999999");
    }

    #[test]
    fn test_denormalize() {
        assert_eq!(
            denormalize("S01E05"),
            Some(("01".to_string(), "05".to_string()))
        );
        assert_eq!(
            denormalize("s2e10"),
            Some(("2".to_string(), "10".to_string()))
        );
        assert_eq!(denormalize(""), None);
        assert_eq!(denormalize("E05"), None);
        assert_eq!(denormalize("Movie"), None);
    }

    #[test]
    fn test_round_trip_through_integers() {
        for season in [1u64, 2, 9, 10, 42, 99, 100, 250] {
            for episode in [1u64, 7, 10, 99, 100, 1015] {
                let text = normalize(season, episode);
                let (s, e) = denormalize(&text).unwrap();
                assert_eq!(s, format!("{season:02}"));
                assert_eq!(e, format!("{episode:02}"));
                assert_eq!(s.parse::<u64>().unwrap(), season);
                assert_eq!(e.parse::<u64>().unwrap(), episode);
            }
        }
    }

    #[test]
    fn test_episode_id_key_and_equality() {
        let id = EpisodeId::new(8, 1);
        assert_eq!(id.as_str(), "S08E01");
        assert_eq!(id.key(), Some(EpisodeKey::new(8, 1)));
        assert_eq!(id, EpisodeId::from(EpisodeKey::new(8, 1)));
        assert_ne!(id, EpisodeId::new(8, 2));
    }

    #[test]
    fn test_episode_ids_sort_numerically() {
        let mut ids = vec![EpisodeId::new(1, 100), EpisodeId::new(2, 1), EpisodeId::new(1, 99)];
        ids.sort();
        let sorted: Vec<_> = ids.iter().map(EpisodeId::as_str).collect();
        assert_eq!(sorted, ["S01E99", "S01E100", "S02E01"]);
    }
}
