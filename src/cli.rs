use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Mode {
    /// Rename subtitles after their videos
    Rename,
    /// Mux subtitles into their MKV videos with mkvmerge
    Embed,
    /// Print the episode detected in each given file name
    Identify,
}

#[derive(Parser, Debug)]
#[command(name = "subtitle-matcher")]
#[command(about = "Match subtitle files to video episodes, then rename or embed them")]
pub struct Cli {
    /// Directories to process (file names in identify mode)
    #[arg(default_value = ".")]
    pub inputs: Vec<PathBuf>,

    /// What to do with matched subtitles
    #[arg(long, value_enum, default_value = "rename")]
    pub mode: Mode,

    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Language tag inserted into renamed subtitles, e.g. "ar"
    #[arg(long)]
    pub language_suffix: Option<String>,

    /// Path to the mkvmerge executable
    #[arg(long)]
    pub mkvmerge: Option<PathBuf>,

    /// Write a report file into each processed directory
    #[arg(long)]
    pub report: bool,

    /// Show what would happen without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompts
    #[arg(long)]
    pub no_confirm: bool,

    /// Print identify results as JSON
    #[arg(long)]
    pub json: bool,
}
