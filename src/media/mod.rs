pub mod language;
pub mod mkvmerge;
