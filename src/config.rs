use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::models::FileKind;

pub const CONFIG_ENV_VAR: &str = "SUBTITLE_MATCHER_CONFIG";

const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4"];
const DEFAULT_SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass"];

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub general: General,
    pub renaming: Renaming,
    pub embedding: Embedding,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct General {
    pub video_extensions: Vec<String>,
    pub subtitle_extensions: Vec<String>,
}

impl Default for General {
    fn default() -> Self {
        Self {
            video_extensions: to_owned(DEFAULT_VIDEO_EXTENSIONS),
            subtitle_extensions: to_owned(DEFAULT_SUBTITLE_EXTENSIONS),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Renaming {
    /// Tag inserted before the subtitle extension, e.g. `ar`. Empty for none.
    pub language_suffix: String,
    pub report: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Embedding {
    pub mkvmerge_path: Option<PathBuf>,
    /// ISO 639-2 code used when the subtitle name carries none.
    pub language_code: String,
    pub default_flag: bool,
    pub report: bool,
}

impl Default for Embedding {
    fn default() -> Self {
        Self {
            mkvmerge_path: None,
            language_code: String::new(),
            default_flag: true,
            report: false,
        }
    }
}

fn to_owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Normalises an extension list; falls back to `default` if nothing usable is left.
fn clean_extensions(list: &[String], default: &[&str]) -> Vec<String> {
    let mut cleaned: Vec<String> = list
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .filter(|ext| ext.chars().all(|c| c.is_alphanumeric() || c == '_'))
        .collect();
    cleaned.dedup();
    if cleaned.is_empty() {
        to_owned(default)
    } else {
        cleaned
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings.cleaned())
    }

    fn cleaned(mut self) -> Self {
        self.general.video_extensions =
            clean_extensions(&self.general.video_extensions, DEFAULT_VIDEO_EXTENSIONS);
        self.general.subtitle_extensions =
            clean_extensions(&self.general.subtitle_extensions, DEFAULT_SUBTITLE_EXTENSIONS);
        self.renaming.language_suffix = self.renaming.language_suffix.trim().to_string();
        self.embedding.language_code = self.embedding.language_code.trim().to_lowercase();
        self
    }

    pub fn language_suffix(&self) -> Option<&str> {
        Some(self.renaming.language_suffix.as_str()).filter(|s| !s.is_empty())
    }

    pub fn language_code(&self) -> Option<&str> {
        Some(self.embedding.language_code.as_str()).filter(|s| !s.is_empty())
    }

    /// Classifies a file by its extension, ignoring case.
    pub fn classify(&self, path: &Path) -> Option<FileKind> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if self.general.video_extensions.contains(&ext) {
            Some(FileKind::Video)
        } else if self.general.subtitle_extensions.contains(&ext) {
            Some(FileKind::Subtitle)
        } else {
            None
        }
    }
}

/// Loads settings from `explicit`, the environment override, or the default
/// location. Only the default location may be absent.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match env::var_os(CONFIG_ENV_VAR) {
            Some(path) => (PathBuf::from(path), true),
            None => (get_config_path(), false),
        },
    };

    if !path.exists() {
        if required {
            bail!("Config file not found: {}", path.display());
        }
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    Settings::from_toml(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("subtitle-matcher"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

pub fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}
