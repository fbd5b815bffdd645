//! Title-similarity fallback for a lone video and subtitle without episode
//! numbers.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:19|20)\d{2}").expect("Invalid year regex"));
static WORD_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[._\-]+").expect("Invalid separator regex"));

/// Release tags: resolution, source, codec, edition and language markers.
const TECHNICAL_INDICATORS: &[&str] = &[
    "1080p", "720p", "480p", "2160p", "4k", "bluray", "web", "dvd", "hd", "x264", "x265",
    "h264", "h265", "avc", "hevc", "aac", "ac3", "dts", "remux", "proper", "repack",
    "extended", "theatrical", "unrated", "directors", "cut", "multi", "sub", "eng", "en",
    "ara", "ar", "fre", "fr", "ger", "de", "ita", "es", "spa", "kor", "jpn", "ch", "chs",
    "cht", "internal", "limited", "xvid", "divx", "ntsc", "pal", "dc", "sync", "syncopated",
    "cc", "sdh", "hc", "real", "final", "post", "pre", "dub", "dubbed",
];

const FILLER_WORDS: &[&str] = &[
    // articles
    "a", "an", "the",
    // prepositions
    "of", "in", "on", "at", "to", "for", "with", "from", "by", "about", "as", "into",
    "through", "during", "before", "after", "above", "below", "between", "among", "under",
    "over",
    // conjunctions
    "and", "or", "but", "nor", "yet", "so",
    // pronouns
    "it", "its", "this", "that", "these", "those",
    // verbs
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
    "did",
    // other
    "not", "all", "no", "some", "more", "most", "very", "can", "will", "just", "should",
    "than", "also", "only", "one", "two", "three", "four", "five", "six", "seven", "eight",
    "nine", "ten",
];

/// First release-year-looking token anywhere in the name.
fn release_year(filename: &str) -> Option<&str> {
    YEAR.find(filename).map(|m| m.as_str())
}

/// Lowercased title words of the file stem, minus tags and filler.
pub fn significant_words(filename: &str) -> BTreeSet<String> {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    WORD_SEPARATORS
        .replace_all(stem, " ")
        .to_lowercase()
        .split_whitespace()
        .filter(|w| !TECHNICAL_INDICATORS.contains(w) && !FILLER_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Decides whether a video and a subtitle look like the same movie.
///
/// With a shared year, any shared title word is enough. Without one, both
/// names need title words and at least one in common.
pub fn titles_match(video: &str, subtitle: &str) -> bool {
    let video_words = significant_words(video);
    let subtitle_words = significant_words(subtitle);
    let shared = video_words.intersection(&subtitle_words).count();

    let same_year = matches!(
        (release_year(video), release_year(subtitle)),
        (Some(a), Some(b)) if a == b
    );
    if same_year {
        return shared > 0;
    }

    if video_words.is_empty() || subtitle_words.is_empty() {
        return false;
    }
    let smaller = video_words.len().min(subtitle_words.len());
    let ratio = shared as f64 / smaller as f64;
    ratio >= 0.3 || shared > 0
}
