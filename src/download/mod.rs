//! Supervises the concurrent capture jobs of one cycle.
//!
//! Every eligible location gets its own resolver + capture process. Captures
//! run in parallel and are awaited against one deadline, counted from the
//! moment the last job was dispatched. Live streams occasionally make the
//! capture tool hang forever, so anything still running then is killed.
//! Clips from successful jobs are moved into a dated folder.

pub mod job;
pub mod tools;

use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use chrono::Utc;
use futures::future::join_all;
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use tokio::time::{timeout, timeout_at, Instant};

use crate::{
    cli::create_progress_bar,
    error::{RaincamError, Result},
    selector::{CandidateEntry, Candidates},
};
use job::{clip_paths, clip_stem, exit_code, DownloadJob, JobState, SAVE_FAILED, SPAWN_FAILED};
pub use tools::{ToolCommand, Tools};

/// Deadline for a capture of `length`: `1.25 × length + 60 s`.
pub fn capture_deadline(length: Duration) -> Duration {
    length.mul_f64(1.25) + Duration::from_secs(60)
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Clip length requested from the capture tool.
    pub length: Duration,
    /// Where clips are written while they are being captured.
    pub tmp_dir: PathBuf,
    /// Root of the dated output folders.
    pub final_dir: PathBuf,
    /// Deadline for the cycle's captures; `None` waits for every job however long it takes.
    pub timeout: Option<Duration>,
    /// File clips under a weather subfolder and suffix them with the weather.
    pub weather_folders: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadReport {
    /// One per dispatched job, in dispatch order.
    pub exit_codes: Vec<i32>,
    pub folder: PathBuf,
}

impl DownloadReport {
    pub fn any_succeeded(&self) -> bool {
        self.exit_codes.contains(&0)
    }
}

pub struct Supervisor {
    tools: Tools,
    options: DownloadOptions,
}

impl Supervisor {
    pub fn new(tools: Tools, options: DownloadOptions) -> Self {
        Supervisor { tools, options }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Captures one clip per place and returns the exit codes and the dated
    /// output folder.
    pub async fn download(&self, places: &Candidates) -> Result<DownloadReport> {
        let now = Utc::now();
        ensure_dir(&self.options.tmp_dir)?;
        let folder = self.options.final_dir.join(now.format("%Y-%m-%d").to_string());
        ensure_dir(&folder)?;

        // Sorted so exit codes come back in a stable order
        let mut places: Vec<(&String, &CandidateEntry)> = places.iter().collect();
        places.sort_by(|a, b| a.0.cmp(b.0));

        let mut jobs = Vec::with_capacity(places.len());
        for (location, entry) in places {
            jobs.push(self.dispatch(location, entry).await);
        }

        info!("Attempting download of {} video(s).", jobs.len());

        let deadline = self.options.timeout.map(|limit| Instant::now() + limit);
        let progress = create_progress_bar(jobs.len() as u64, "Capturing clips".to_string());
        join_all(jobs.iter_mut().map(|job| self.finish(job, deadline, &progress))).await;
        progress.finish_and_clear();

        for job in &mut jobs {
            if job.succeeded() {
                let dir = if self.options.weather_folders {
                    folder.join(&job.weather)
                } else {
                    folder.clone()
                };
                match relocate(&job.video_path, &dir).await {
                    Ok(path) => info!("{}: saved {}", job.location, path.display()),
                    Err(e) => {
                        error!("{}: {:#}", job.location, anyhow::Error::from(e));
                        job.state = JobState::Finished(SAVE_FAILED);
                    }
                }
            } else {
                discard(&job.video_path).await;
            }
        }

        let exit_codes: Vec<i32> = jobs.iter().map(|j| j.exit_code().unwrap_or(-1)).collect();
        info!("Exit codes: {:?}", exit_codes);

        Ok(DownloadReport { exit_codes, folder })
    }

    /// Resolves the manifest and starts the capture without waiting for it.
    /// Failures are recorded in the returned job's exit code.
    async fn dispatch(&self, location: &str, entry: &CandidateEntry) -> DownloadJob {
        let weather = self.options.weather_folders.then_some(entry.weather.as_str());
        let stem = clip_stem(location, weather, Utc::now());
        let (video_path, log_path) = clip_paths(&self.options.tmp_dir, &stem);

        let mut job = DownloadJob {
            location: location.to_string(),
            weather: entry.weather.clone(),
            url: entry.url.clone(),
            video_path,
            log_path,
            state: JobState::Finished(SPAWN_FAILED),
        };

        let log = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&job.log_path)
        {
            Ok(log) => log,
            Err(e) => {
                error!(
                    "{}: cannot open log {} for {}: {}",
                    job.location,
                    job.log_path.display(),
                    job.url,
                    e
                );
                return job;
            }
        };

        let manifest = match self.resolve(&job, entry, &log).await {
            Ok(manifest) => manifest,
            Err(code) => {
                let failure = RaincamError::ResolutionFailure {
                    location: job.location.clone(),
                    url: job.url.clone(),
                };
                error!("{} (see {})", failure, job.log_path.display());
                job.state = JobState::Finished(code);
                return job;
            }
        };

        let args = tools::capture_args(
            &manifest,
            self.options.length,
            &job.video_path.to_string_lossy(),
        );
        info!("Downloading to: {}", job.video_path.display());
        debug!("Command: {} {}", self.tools.capture, args.join(" "));

        let stdout = match log.try_clone() {
            Ok(stdout) => stdout,
            Err(e) => {
                error!("{}: cannot write log {}: {}", job.location, job.log_path.display(), e);
                return job;
            }
        };

        let spawned = self
            .tools
            .capture
            .command()
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(log))
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => job.state = JobState::Running(child),
            Err(e) => error!(
                "{}: could not start capture tool '{}': {}",
                job.location, self.tools.capture, e
            ),
        }

        job
    }

    /// First manifest printed by the resolver, or the exit code to record.
    async fn resolve(
        &self,
        job: &DownloadJob,
        entry: &CandidateEntry,
        log: &File,
    ) -> std::result::Result<String, i32> {
        let stderr = log.try_clone().map_err(|e| {
            error!("{}: cannot write log {}: {}", job.location, job.log_path.display(), e);
            SPAWN_FAILED
        })?;

        let child = self
            .tools
            .resolver
            .command()
            .args(tools::resolver_args(&entry.quality, &entry.url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!(
                    "{}: could not start stream resolver '{}': {}",
                    job.location, self.tools.resolver, e
                );
                SPAWN_FAILED
            })?;

        let output = match self.options.timeout {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    warn!("{}: stream resolver timed out after {:?}", job.location, limit);
                    return Err(-1);
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| {
            error!("{}: stream resolver failed: {}", job.location, e);
            -1
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.split_whitespace().next() {
            Some(manifest) => Ok(manifest.to_string()),
            None => match exit_code(output.status) {
                0 => Err(1),
                code => Err(code),
            },
        }
    }

    /// Waits for a running job, killing it once the cycle's deadline passes.
    async fn finish(
        &self,
        job: &mut DownloadJob,
        deadline: Option<Instant>,
        progress: &ProgressBar,
    ) {
        let JobState::Running(child) = &mut job.state else {
            progress.inc(1);
            return;
        };

        let status = match deadline {
            Some(deadline) => match timeout_at(deadline, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    let timed_out = RaincamError::CaptureTimeout {
                        location: job.location.clone(),
                    };
                    warn!("{}, url {}", timed_out, job.url);
                    if let Err(e) = child.kill().await {
                        error!("{}: failed to kill capture: {}", job.location, e);
                    }
                    discard(&job.video_path).await;
                    child.wait().await
                }
            },
            None => child.wait().await,
        };

        let code = match status {
            Ok(status) => exit_code(status),
            Err(e) => {
                error!("{}: failed waiting for capture: {}", job.location, e);
                -1
            }
        };

        if code != 0 {
            warn!(
                "{}: capture exited with {} (see {})",
                job.location,
                code,
                job.log_path.display()
            );
        }

        job.state = JobState::Finished(code);
        progress.inc(1);
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| RaincamError::DirCreation(dir.to_path_buf(), e))
}

/// Moves a finished clip into `dir`, copying when a rename is not possible.
async fn relocate(from: &Path, dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let file_name = from.file_name().unwrap_or(from.as_os_str());
    let to = dir.join(file_name);

    if tokio::fs::rename(from, &to).await.is_ok() {
        return Ok(to);
    }

    let moved = async {
        tokio::fs::copy(from, &to).await?;
        tokio::fs::remove_file(from).await
    };
    moved.await.map_err(|source| RaincamError::Relocation {
        from: from.to_path_buf(),
        to: to.clone(),
        source,
    })?;

    Ok(to)
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(all(test, unix))]
mod test {
    use super::*;
    use tempfile::TempDir;

    const RESOLVER: &str = r#"
for last; do :; done
case "$last" in
  *missing*) echo "ERROR: video unavailable" >&2; exit 1 ;;
  *silent*) exit 0 ;;
esac
echo "https://manifests.test/$(basename "$last").m3u8"
"#;

    const CAPTURE: &str = r#"
for last; do :; done
case "$(basename "$last")" in
  Hang_*) echo partial > "$last"; exec sleep 30 ;;
  Broken_*) echo partial > "$last"; echo "Invalid data found" >&2; exit 1 ;;
esac
echo "frames" > "$last"
"#;

    struct Fixture {
        root: TempDir,
        tools: Tools,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let resolver = root.path().join("resolver.sh");
            let capture = root.path().join("capture.sh");
            std::fs::write(&resolver, RESOLVER).unwrap();
            std::fs::write(&capture, CAPTURE).unwrap();

            let tools = Tools {
                resolver: ToolCommand::new("sh").with_args([resolver.to_string_lossy()]),
                capture: ToolCommand::new("sh").with_args([capture.to_string_lossy()]),
            };

            Fixture { root, tools }
        }

        fn options(&self, timeout: Option<Duration>, weather_folders: bool) -> DownloadOptions {
            DownloadOptions {
                length: Duration::from_secs(10),
                tmp_dir: self.root.path().join("tmp"),
                final_dir: self.root.path().join("downloads"),
                timeout,
                weather_folders,
            }
        }

        fn files(dir: &Path) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                        .collect()
                })
                .unwrap_or_default();
            names.sort();
            names
        }
    }

    fn places(entries: &[(&str, &str)]) -> Candidates {
        entries
            .iter()
            .map(|(name, url)| {
                (
                    name.to_string(),
                    CandidateEntry {
                        url: url.to_string(),
                        quality: "best".to_string(),
                        weather: "rain".to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn should_compute_deadline() {
        assert_eq!(capture_deadline(Duration::from_secs(10)), Duration::from_millis(72_500));
        assert_eq!(capture_deadline(Duration::from_secs(120)), Duration::from_secs(210));
    }

    #[tokio::test]
    async fn should_kill_hung_job_and_keep_finished_one() {
        let fixture = Fixture::new();
        let supervisor = Supervisor::new(
            fixture.tools.clone(),
            fixture.options(Some(Duration::from_secs(3)), false),
        );

        let report = supervisor
            .download(&places(&[("Alpha", "https://cams/alpha"), ("Hang", "https://cams/hang")]))
            .await
            .unwrap();

        assert_eq!(report.exit_codes.len(), 2);
        assert_eq!(report.exit_codes[0], 0);
        assert_ne!(report.exit_codes[1], 0);

        let saved = Fixture::files(&report.folder);
        assert_eq!(saved.len(), 1);
        assert!(saved[0].starts_with("Alpha_") && saved[0].ends_with(".mp4"));

        let tmp = Fixture::files(&fixture.root.path().join("tmp"));
        assert!(tmp.iter().all(|f| f.ends_with(".log")));
        assert_eq!(tmp.len(), 2);
    }

    #[tokio::test]
    async fn should_record_resolution_failure() {
        let fixture = Fixture::new();
        let supervisor = Supervisor::new(fixture.tools.clone(), fixture.options(None, false));

        let report = supervisor
            .download(&places(&[
                ("Gone", "https://cams/missing"),
                ("Quiet", "https://cams/silent"),
            ]))
            .await
            .unwrap();

        assert_eq!(report.exit_codes, vec![1, 1]);
        assert!(!report.any_succeeded());
        assert!(Fixture::files(&report.folder).is_empty());

        let logs = Fixture::files(&fixture.root.path().join("tmp"));
        let gone_log = logs.iter().find(|f| f.starts_with("Gone_")).unwrap();
        let text = std::fs::read_to_string(fixture.root.path().join("tmp").join(gone_log)).unwrap();
        assert!(text.contains("video unavailable"));
    }

    #[tokio::test]
    async fn should_discard_failed_capture() {
        let fixture = Fixture::new();
        let supervisor = Supervisor::new(
            fixture.tools.clone(),
            fixture.options(Some(Duration::from_secs(30)), false),
        );

        let report = supervisor
            .download(&places(&[("Broken", "https://cams/broken")]))
            .await
            .unwrap();

        assert_eq!(report.exit_codes, vec![1]);
        let tmp = Fixture::files(&fixture.root.path().join("tmp"));
        assert_eq!(tmp.len(), 1);
        assert!(tmp[0].ends_with(".log"));
    }

    #[tokio::test]
    async fn should_file_clips_by_weather_without_timeout() {
        let fixture = Fixture::new();
        let supervisor = Supervisor::new(fixture.tools.clone(), fixture.options(None, true));

        let report = supervisor
            .download(&places(&[("Alpha", "https://cams/a"), ("Beta", "https://cams/b")]))
            .await
            .unwrap();

        assert_eq!(report.exit_codes, vec![0, 0]);
        let saved = Fixture::files(&report.folder.join("rain"));
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|f| f.ends_with("_rain.mp4")));
    }

    #[tokio::test]
    async fn should_survive_missing_capture_tool() {
        let fixture = Fixture::new();
        let tools = Tools {
            resolver: fixture.tools.resolver.clone(),
            capture: ToolCommand::new("/nonexistent/raincam/ffmpeg"),
        };
        let supervisor = Supervisor::new(tools, fixture.options(Some(Duration::from_secs(5)), false));

        let report = supervisor
            .download(&places(&[("Alpha", "https://cams/a")]))
            .await
            .unwrap();

        assert_eq!(report.exit_codes, vec![SPAWN_FAILED]);
    }

    #[tokio::test]
    async fn should_save_good_clip_when_another_log_cannot_open() {
        let fixture = Fixture::new();
        let supervisor = Supervisor::new(
            fixture.tools.clone(),
            fixture.options(Some(Duration::from_secs(30)), false),
        );

        let report = supervisor
            .download(&places(&[("Alpha", "https://cams/a"), ("Bad\0Name", "https://cams/b")]))
            .await
            .unwrap();

        assert_eq!(report.exit_codes, vec![0, SPAWN_FAILED]);
        let saved = Fixture::files(&report.folder);
        assert_eq!(saved.len(), 1);
        assert!(saved[0].starts_with("Alpha_"));
    }

    #[tokio::test]
    async fn should_capture_location_with_overlong_name() {
        let fixture = Fixture::new();
        let supervisor = Supervisor::new(
            fixture.tools.clone(),
            fixture.options(Some(Duration::from_secs(30)), false),
        );
        let long_name = "Z".repeat(300);

        let report = supervisor
            .download(&places(&[("Alpha", "https://cams/a"), (long_name.as_str(), "https://cams/z")]))
            .await
            .unwrap();

        assert_eq!(report.exit_codes, vec![0, 0]);
        assert_eq!(Fixture::files(&report.folder).len(), 2);
    }

    #[tokio::test]
    async fn should_fail_job_whose_clip_cannot_be_saved() {
        let fixture = Fixture::new();
        let supervisor = Supervisor::new(fixture.tools.clone(), fixture.options(None, true));

        // A plain file where the weather folder should go
        let folder = fixture
            .root
            .path()
            .join("downloads")
            .join(Utc::now().format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("rain"), "not a folder").unwrap();

        let report = supervisor
            .download(&places(&[("Alpha", "https://cams/a")]))
            .await
            .unwrap();

        assert_eq!(report.exit_codes, vec![SAVE_FAILED]);
        assert!(!report.any_succeeded());
    }

    #[tokio::test]
    async fn should_return_empty_report_without_places() {
        let fixture = Fixture::new();
        let supervisor = Supervisor::new(fixture.tools.clone(), fixture.options(None, false));

        let report = supervisor.download(&Candidates::new()).await.unwrap();

        assert!(report.exit_codes.is_empty());
        assert!(report.folder.is_dir());
    }
}
