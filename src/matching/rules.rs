use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Extra condition a candidate match must satisfy before its rule fires.
///
/// Used where a pattern needs look-around: the candidate is rejected and the
/// search resumes one character after its start.
type Guard = fn(&str, &Captures) -> bool;

/// Turns a successful match into a (season, episode) pair.
type Extractor = fn(&Captures) -> Option<(u64, u64)>;

pub struct Rule {
    pub name: &'static str,
    pattern: Regex,
    guard: Option<Guard>,
    extract: Extractor,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, extract: Extractor) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern)
                .unwrap_or_else(|e| panic!("Invalid regex for rule '{name}': {e}")),
            guard: None,
            extract,
        }
    }

    fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// First match of this rule anywhere in `text`.
    pub fn find<'h>(&self, text: &'h str) -> Option<Captures<'h>> {
        let Some(guard) = self.guard else {
            return self.pattern.captures(text);
        };

        let mut start = 0;
        while start <= text.len() {
            let caps = self.pattern.captures_at(text, start)?;
            if guard(text, &caps) {
                return Some(caps);
            }
            let from = caps.get(0)?.start();
            start = match text[from..].chars().next() {
                Some(c) => from + c.len_utf8(),
                None => break,
            };
        }
        None
    }

    pub fn extract(&self, caps: &Captures) -> Option<(u64, u64)> {
        (self.extract)(caps)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Ordered rule list. Earlier rules win, so the most specific patterns come
/// first and the bare-number fallbacks last.
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn standard() -> Self {
        let rules = vec![
            Rule::new("S##E##", r"[Ss](\d+)\s?[Ee](\d+)", season_episode),
            Rule::new("S## Episode ##", r"(?i)s(\d+)\s+episode\s+(\d+)", season_episode),
            Rule::new("##x##", r"(?:^|[._\s-])(\d+)[xX](\d+)", season_episode)
                .guarded(short_season_then_separator),
            Rule::new("S## - ##", r"(?i)s(\d{1,2})\s*-\s*(\d+)", season_episode),
            Rule::new("S## - E##", r"(?i)s(\d{1,2})\s*-\s*e(\d+)", season_episode),
            Rule::new("S##.E##", r"(?i)s(\d{1,2})\.e(\d+)", season_episode),
            Rule::new("S##_E##", r"(?i)s(\d{1,2})_e(\d+)", season_episode),
            Rule::new("S## - EP##", r"(?i)s(\d{1,2})\s*-\s*ep(\d+)", season_episode),
            Rule::new("S## EP##", r"(?i)s(\d{1,2})\s+ep\s*(\d+)", season_episode),
            Rule::new("S##.EP##", r"(?i)s(\d{1,2})\.ep(\d+)", season_episode),
            Rule::new(
                "1st Season - ##",
                r"(?i)(\d{1,2})(?:st|nd|rd|th)\s+season\s*-\s*(\d+)",
                season_episode,
            ),
            Rule::new(
                "1st Season Episode ##",
                r"(?i)(\d{1,2})(?:st|nd|rd|th)\s+season\s+episode\s+(\d+)",
                season_episode,
            ),
            Rule::new(
                "1st Season E##",
                r"(?i)(\d{1,2})(?:st|nd|rd|th)\s+season\s+e\s*(\d+)",
                season_episode,
            ),
            Rule::new(
                "1st Season EP##",
                r"(?i)(\d{1,2})(?:st|nd|rd|th)\s+season\s+ep\s*(\d+)",
                season_episode,
            ),
            Rule::new("Season ## - ##", r"(?i)season\s+(\d{1,2})\s*-\s*(\d+)", season_episode),
            Rule::new("Season## - ##", r"(?i)season(\d{1,2})\s*-\s*(\d+)", season_episode),
            Rule::new(
                "Season.#.Episode.#",
                r"(?i)season\.(\d+)[\s._-]*episode\.(\d+)",
                season_episode,
            ),
            Rule::new("S#.Ep.#", r"(?i)s(\d+)[\s._-]*ep(?:isode)?\.(\d+)", season_episode),
            Rule::new("S#Ep#", r"(?i)s(\d+)ep(?:isode)?(\d+)", season_episode),
            Rule::new(
                "Season # Episode #",
                r"(?i)season\s+(\d+)\s+episode\s+(\d+)",
                season_episode,
            ),
            Rule::new(
                "Season##_Episode##",
                r"(?i)season\s*(\d+)[\s_]+episode\s*(\d+)",
                season_episode,
            ),
            Rule::new("Season#Episode#", r"(?i)season(\d+)episode(\d+)", season_episode),
            Rule::new("Season# Episode#", r"(?i)season(\d+)\s+episode(\d+)", season_episode),
            Rule::new("Season# Ep#", r"(?i)season(\d+)\s+ep(?:isode)?(\d+)", season_episode),
            Rule::new("Season#Ep#", r"(?i)season(\d+)ep(?:isode)?(\d+)", season_episode),
            Rule::new("Season# E#", r"(?i)season(\d+)\s+e(\d+)", season_episode),
            Rule::new(
                "Season #.Ep #",
                r"(?i)season\s+(\d+)[\s._-]*ep(?:isode)?\s*(\d+)",
                season_episode,
            ),
            Rule::new(
                "Season#.Ep#",
                r"(?i)season(\d+)[\s._-]*ep(?:isode)?(\d+)",
                season_episode,
            ),
            Rule::new(
                "Season # Ep #",
                r"(?i)season\s+(\d+)\s+ep(?:isode)?\s*(\d+)",
                season_episode,
            ),
            // Season defaults to 1 from here on.
            Rule::new("Ep##", r"(?i)(?:^|[._\s-])ep(?:isode)?\s*(\d+)", episode_only)
                .guarded(separator_follows),
            Rule::new("E##", r"(?:^|[._\s-])[Ee](\d+)", episode_only).guarded(separator_follows),
            Rule::new("## - ##", r"(\d+)\s*-\s*(\d+)", season_episode).guarded(isolated_pair),
            Rule::new("- ##", r"-\s*(\d+)", episode_only).guarded(bare_number),
            Rule::new("[##]", r"\[(\d{1,2})\]", episode_only).guarded(not_followed_by_alnum),
            Rule::new("_##", r"_(\d+)", episode_only).guarded(bare_number),
        ];
        Self { rules }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}

/// Built once on first use; never modified afterwards.
pub static RULES: LazyLock<RuleTable> = LazyLock::new(RuleTable::standard);

static DECIMAL_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d$").expect("Invalid decimal digit regex"));

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0; 4];
    c.is_ascii_digit() || DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
}

/// Value of any Unicode decimal digit (`٣` is 3).
///
/// Decimal digits are allocated in contiguous runs of ten starting at zero,
/// so the value is the distance to the start of the run modulo ten.
fn digit_value(c: char) -> Option<u64> {
    if let Some(d) = c.to_digit(10) {
        return Some(d.into());
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut start = u32::from(c);
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }
    Some(u64::from((u32::from(c) - start) % 10))
}

/// Parses a run of decimal digits from any script. `None` on overflow.
fn parse_number(digits: &str) -> Option<u64> {
    digits.chars().try_fold(0u64, |acc, c| {
        acc.checked_mul(10)?.checked_add(digit_value(c)?)
    })
}

fn season_episode(caps: &Captures) -> Option<(u64, u64)> {
    let season = parse_number(caps.get(1)?.as_str())?;
    let episode = parse_number(caps.get(2)?.as_str())?;
    Some((season, episode))
}

fn episode_only(caps: &Captures) -> Option<(u64, u64)> {
    let episode = parse_number(caps.get(1)?.as_str())?;
    Some((1, episode))
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '-') || c.is_whitespace()
}

fn char_after(text: &str, index: usize) -> Option<char> {
    text[index..].chars().next()
}

fn char_before(text: &str, index: usize) -> Option<char> {
    text[..index].chars().next_back()
}

fn digit_count(caps: &Captures, group: usize) -> usize {
    caps.get(group).map_or(0, |m| m.as_str().chars().count())
}

fn separator_follows(text: &str, caps: &Captures) -> bool {
    let Some(m) = caps.get(0) else {
        return false;
    };
    char_after(text, m.end()).map_or(true, is_separator)
}

fn short_season_then_separator(text: &str, caps: &Captures) -> bool {
    digit_count(caps, 1) <= 2 && separator_follows(text, caps)
}

fn not_followed_by_alnum(text: &str, caps: &Captures) -> bool {
    let Some(m) = caps.get(0) else {
        return false;
    };
    !char_after(text, m.end()).is_some_and(|c| c.is_ascii_alphanumeric())
}

// Two short numbers around a dash, not glued to other digits or letters.
fn isolated_pair(text: &str, caps: &Captures) -> bool {
    let Some(m) = caps.get(0) else {
        return false;
    };
    !char_before(text, m.start()).is_some_and(|c| c.is_ascii_digit())
        && digit_count(caps, 1) <= 2
        && digit_count(caps, 2) <= 2
        && not_followed_by_alnum(text, caps)
}

// 1-3 digits, or 1000-1899. Rejects years and tags like 1080p.
fn bare_number(text: &str, caps: &Captures) -> bool {
    let Some(digits) = caps.get(1).map(|m| m.as_str()) else {
        return false;
    };
    let plausible = match digits.chars().count() {
        1..=3 => true,
        4 => {
            let mut chars = digits.chars();
            chars.next() == Some('1') && chars.next().is_some_and(|c| ('0'..='8').contains(&c))
        }
        _ => false,
    };
    plausible && not_followed_by_alnum(text, caps)
}
