//! Episode detection from file names.
//!
//! Rules are tried strictly in table order; the first rule whose pattern
//! matches and whose extractor succeeds decides the result.

use tracing::debug;

pub mod final_season;
pub mod movie;
pub mod rules;

use rules::{RuleTable, RULES};

/// Which rule identified a file name, and what it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: &'static str,
    pub season: u64,
    pub episode: u64,
}

/// Runs `table` over `filename`.
pub fn identify_with(table: &RuleTable, filename: &str) -> Option<RuleMatch> {
    for rule in table.iter() {
        let Some(caps) = rule.find(filename) else {
            continue;
        };
        match rule.extract(&caps) {
            Some((season, episode)) => {
                debug!(rule = rule.name, filename, season, episode, "rule matched");
                return Some(RuleMatch {
                    rule: rule.name,
                    season,
                    episode,
                });
            }
            None => {
                debug!(rule = rule.name, filename, "extractor failed, trying next rule");
            }
        }
    }
    None
}

pub fn identify(filename: &str) -> Option<RuleMatch> {
    identify_with(&RULES, filename)
}

/// Season and episode numbers for `filename`, if any rule recognises it.
pub fn extract_episode_info(filename: &str) -> Option<(u64, u64)> {
    identify(filename).map(|m| (m.season, m.episode))
}
