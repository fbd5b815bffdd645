use std::ffi::OsString;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const TIMEOUT_BASE_SECS: u64 = 300;
const TIMEOUT_PER_GIB_SECS: f64 = 120.0;
const TIMEOUT_MAX_SECS: u64 = 1800;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("mkvmerge not found. Install MKVToolNix or set embedding.mkvmerge_path")]
    ToolNotFound,

    #[error("Failed to run mkvmerge: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("mkvmerge timed out after {0} seconds")]
    TimedOut(u64),

    #[error("mkvmerge failed: {0}")]
    Failed(String),

    #[error("Backup workflow failed: {0}")]
    Backup(String),
}

/// Uses `configured` when it points at a file, else searches `PATH`.
pub fn find_mkvmerge(configured: Option<&Path>) -> Result<PathBuf, MergeError> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        warn!(path = %path.display(), "configured mkvmerge not found, searching PATH");
    }
    which::which("mkvmerge").map_err(|_| MergeError::ToolNotFound)
}

/// 300 s plus 120 s per GiB of input, clamped to 300..=1800 s.
pub fn merge_timeout(total_bytes: u64) -> Duration {
    let gib = total_bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    let secs = TIMEOUT_BASE_SECS + (gib * TIMEOUT_PER_GIB_SECS) as u64;
    Duration::from_secs(secs.clamp(TIMEOUT_BASE_SECS, TIMEOUT_MAX_SECS))
}

/// Temporary output written next to `video` before it replaces it.
pub fn embedded_output_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video.with_file_name(format!("{stem}.embedded.mkv"))
}

/// One subtitle track muxed into one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeJob {
    pub video: PathBuf,
    pub subtitle: PathBuf,
    pub output: PathBuf,
    pub language: Option<String>,
    pub default_track: bool,
}

impl MergeJob {
    pub fn new(video: &Path, subtitle: &Path, language: Option<String>, default_track: bool) -> Self {
        Self {
            video: video.to_path_buf(),
            subtitle: subtitle.to_path_buf(),
            output: embedded_output_path(video),
            language,
            default_track,
        }
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-o".into(),
            self.output.clone().into(),
            self.video.clone().into(),
        ];
        if let Some(language) = &self.language {
            args.push("--language".into());
            args.push(format!("0:{language}").into());
        }
        args.push("--default-track".into());
        args.push((if self.default_track { "0:yes" } else { "0:no" }).into());
        args.push(self.subtitle.clone().into());
        args
    }

    pub fn input_bytes(&self) -> u64 {
        [&self.video, &self.subtitle]
            .iter()
            .filter_map(|p| p.metadata().ok())
            .map(|m| m.len())
            .sum()
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut source) = source {
            let _ = source.read_to_string(&mut buf);
        }
        buf
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<Option<bool>, MergeError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status.success()));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Runs `tool` for `job`, killing it once `timeout` has passed.
pub fn run_merge(tool: &Path, job: &MergeJob, timeout: Duration) -> Result<(), MergeError> {
    debug!(tool = %tool.display(), args = ?job.args(), timeout = timeout.as_secs(), "running mkvmerge");

    let mut child = Command::new(tool)
        .args(job.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => MergeError::ToolNotFound,
            _ => MergeError::Spawn(e),
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let finished = wait_with_deadline(&mut child, timeout)?;
    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    match finished {
        Some(true) => Ok(()),
        Some(false) => {
            // mkvmerge reports most errors on stdout.
            let message = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or("Unknown mkvmerge error")
                .to_string();
            Err(MergeError::Failed(message))
        }
        None => Err(MergeError::TimedOut(timeout.as_secs())),
    }
}
