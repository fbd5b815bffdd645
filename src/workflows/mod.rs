pub mod embedder;
pub mod pairing;
pub mod renamer;
pub mod scan;
