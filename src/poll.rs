//! The acquisition loop: list, select, retain, capture, repeat.

use std::time::Duration;

use chrono::Utc;
use log::{error, info};
use tokio::time::sleep;

use crate::{
    daylight::DaylightGate,
    download::{DownloadReport, Supervisor},
    error::Result,
    locations::LocationSource,
    retention::RetentionTracker,
    selector::{CandidateSelector, SelectionMode},
    weather::WeatherOracle,
};

/// Pauses between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// After a failed cycle.
    pub cool_down: Duration,
    /// After a cycle that captured nothing.
    pub idle: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            cool_down: Duration::from_secs(30),
            idle: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was eligible.
    NoJobs,
    /// Jobs ran but none exited cleanly.
    AllFailed,
    /// At least one clip was saved.
    Captured(usize),
}

impl CycleOutcome {
    pub fn pause(&self, backoff: &Backoff) -> Option<Duration> {
        match self {
            CycleOutcome::NoJobs | CycleOutcome::AllFailed => Some(backoff.idle),
            CycleOutcome::Captured(_) => None,
        }
    }
}

impl From<&DownloadReport> for CycleOutcome {
    fn from(report: &DownloadReport) -> Self {
        let saved = report.exit_codes.iter().filter(|&&code| code == 0).count();

        match (report.exit_codes.len(), saved) {
            (0, _) => CycleOutcome::NoJobs,
            (_, 0) => CycleOutcome::AllFailed,
            (_, saved) => CycleOutcome::Captured(saved),
        }
    }
}

pub struct PollLoop<S, O, D> {
    source: S,
    oracle: O,
    daylight: Option<D>,
    mode: SelectionMode,
    retention: RetentionTracker,
    supervisor: Supervisor,
    backoff: Backoff,
}

impl<S, O, D> PollLoop<S, O, D>
where
    S: LocationSource,
    O: WeatherOracle,
    D: DaylightGate,
{
    pub fn new(
        source: S,
        oracle: O,
        daylight: Option<D>,
        mode: SelectionMode,
        retention: RetentionTracker,
        supervisor: Supervisor,
    ) -> Self {
        PollLoop {
            source,
            oracle,
            daylight,
            mode,
            retention,
            supervisor,
            backoff: Backoff::default(),
        }
    }

    /// Runs one cycle. Retention only advances once selection succeeded.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let locations = self.source.list_locations().await?;
        info!("Loaded {} location(s)", locations.len());

        let selector = CandidateSelector::new(&self.oracle, self.daylight.as_ref(), self.mode);
        let candidates = selector.select(&locations, Utc::now()).await?;

        let to_download = self.retention.advance(candidates);
        let report = self.supervisor.download(to_download).await?;

        Ok(CycleOutcome::from(&report))
    }

    /// Cycles until the process is stopped.
    pub async fn run_forever(&mut self) {
        loop {
            let pause = match self.run_cycle().await {
                Ok(outcome) => {
                    let pause = outcome.pause(&self.backoff);
                    match (outcome, pause) {
                        (CycleOutcome::NoJobs, Some(p)) => {
                            info!("No locations to capture, sleeping {}s", p.as_secs())
                        }
                        (CycleOutcome::AllFailed, Some(p)) => {
                            info!("All downloads failed, sleeping {}s", p.as_secs())
                        }
                        (CycleOutcome::Captured(saved), _) => info!("Saved {} clip(s)", saved),
                        _ => {}
                    }
                    pause
                }
                Err(e) => {
                    error!("{:#}", anyhow::Error::from(e));
                    info!("Retrying in {}s", self.backoff.cool_down.as_secs());
                    Some(self.backoff.cool_down)
                }
            };

            if let Some(pause) = pause {
                sleep(pause).await;
            }
        }
    }
}

// -- Tests -------------------------------------------------------------------
