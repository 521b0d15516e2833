//! Capture a single clip from one stream.

use anyhow::{bail, Result};

use crate::{
    cli::DownloadArgs,
    download::Supervisor,
    selector::{CandidateEntry, Candidates, DEFAULT_QUALITY},
};

/// Returns the path of the saved clip's folder.
pub async fn capture(name: &str, url: &str, download: &DownloadArgs) -> Result<String> {
    let supervisor = Supervisor::new(download.tools(), download.options(false));

    let mut places = Candidates::new();
    places.insert(
        name.to_string(),
        CandidateEntry {
            url: url.to_string(),
            quality: DEFAULT_QUALITY.to_string(),
            weather: "unknown".to_string(),
        },
    );

    let report = supervisor.download(&places).await?;
    if !report.any_succeeded() {
        bail!("Capture of {} failed with exit code {:?}", name, report.exit_codes);
    }

    Ok(report.folder.to_string_lossy().to_string())
}
