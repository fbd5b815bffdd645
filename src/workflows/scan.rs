use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::Settings;
use crate::domain::models::FileKind;

/// File names found directly inside one directory, split by kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    pub videos: Vec<String>,
    pub subtitles: Vec<String>,
    /// Total entries in the directory, classified or not.
    pub entries: usize,
}

impl Listing {
    pub fn file_count(&self) -> usize {
        self.videos.len() + self.subtitles.len()
    }
}

/// Lists `dir_path` without descending into subdirectories.
pub fn scan_directory(dir_path: &Path, settings: &Settings) -> Result<Listing> {
    let entries = fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read directory {}", dir_path.display()))?;

    let mut listing = Listing::default();
    for entry in entries {
        let entry = entry?;
        listing.entries += 1;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        match settings.classify(&path) {
            Some(FileKind::Video) => listing.videos.push(name.to_string()),
            Some(FileKind::Subtitle) => listing.subtitles.push(name.to_string()),
            None => {}
        }
    }

    listing.videos.sort();
    listing.subtitles.sort();
    Ok(listing)
}
