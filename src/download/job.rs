//! One location's capture attempt within a cycle.

use std::{
    path::{Path, PathBuf},
    process::ExitStatus,
};

use chrono::{DateTime, Utc};
use tokio::process::Child;

/// Exit code recorded when a tool could not be started at all.
pub const SPAWN_FAILED: i32 = 127;

/// Exit code recorded when a finished clip could not be moved out of the
/// temp directory (`EX_IOERR`).
pub const SAVE_FAILED: i32 = 74;

/// Longest location prefix kept in a clip name, in bytes.
const MAX_LOCATION_LEN: usize = 100;

#[derive(Debug)]
pub enum JobState {
    Running(Child),
    Finished(i32),
}

#[derive(Debug)]
pub struct DownloadJob {
    pub location: String,
    pub weather: String,
    pub url: String,
    pub video_path: PathBuf,
    pub log_path: PathBuf,
    pub state: JobState,
}

impl DownloadJob {
    pub fn exit_code(&self) -> Option<i32> {
        match self.state {
            JobState::Finished(code) => Some(code),
            JobState::Running(_) => None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code() == Some(0)
    }
}

/// `<location>_<YYYY-MM-DD_HH-MM-SS>[_<weather>]`, without extension.
pub fn clip_stem(location: &str, weather: Option<&str>, at: DateTime<Utc>) -> String {
    let mut location = location.replace(['/', '\\'], "-");
    if location.len() > MAX_LOCATION_LEN {
        let cut = (0..=MAX_LOCATION_LEN)
            .rev()
            .find(|&i| location.is_char_boundary(i))
            .unwrap_or(0);
        location.truncate(cut);
    }
    let stamp = at.format("%Y-%m-%d_%H-%M-%S");

    match weather {
        Some(weather) => format!("{}_{}_{}", location, stamp, weather),
        None => format!("{}_{}", location, stamp),
    }
}

pub fn clip_paths(tmp_dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
    (
        tmp_dir.join(format!("{}.mp4", stem)),
        tmp_dir.join(format!("{}.log", stem)),
    )
}

/// Killed processes report `-signal`, like Python's `returncode`.
pub fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    status.code().unwrap_or(-1)
}

// -- Tests -------------------------------------------------------------------
