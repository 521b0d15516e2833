//! Capture clips from rainy locations until the process is stopped.

use anyhow::Result;
use log::info;

use crate::{
    cli::{DownloadArgs, SelectionArgs},
    download::Supervisor,
    locations::CsvTables,
    poll::PollLoop,
    retention::RetentionTracker,
};

pub async fn watch(selection: &SelectionArgs, download: &DownloadArgs, extra: u32) -> Result<()> {
    let oracle = selection.oracle()?;
    let source = CsvTables::new(selection.locations.clone());
    let supervisor = Supervisor::new(download.tools(), download.options(selection.mode.tags_weather()));

    let options = supervisor.options();
    info!(
        "Capturing {}s clips into {}",
        options.length.as_secs(),
        options.final_dir.display()
    );
    match options.timeout {
        Some(limit) => info!("Timeout ENABLED ({}s per clip)", limit.as_secs()),
        None => info!("Timeout DISABLED"),
    }
    info!(
        "Mode {:?}, daylight gate {}, {} extra cycle(s)",
        selection.mode,
        if selection.no_daylight { "off" } else { "on" },
        extra
    );

    let mut poll = PollLoop::new(
        source,
        oracle,
        selection.daylight(),
        selection.mode,
        RetentionTracker::new(extra),
        supervisor,
    );
    poll.run_forever().await;

    Ok(())
}
