//! One selection pass without downloading anything.

use anyhow::Result;
use chrono::Utc;

use crate::{
    cli::{create_spinner, SelectionArgs},
    locations::{CsvTables, LocationSource},
    selector::{CandidateEntry, CandidateSelector},
};

/// Candidates for right now, sorted by location name.
pub async fn scan(selection: &SelectionArgs) -> Result<Vec<(String, CandidateEntry)>> {
    let oracle = selection.oracle()?;
    let source = CsvTables::new(selection.locations.clone());
    let daylight = selection.daylight();

    let bar = create_spinner("Reading location tables...".to_string());
    let locations = source.list_locations().await?;
    bar.set_message(format!("Checking weather at {} location(s)...", locations.len()));

    let selector = CandidateSelector::new(&oracle, daylight.as_ref(), selection.mode);
    let candidates = selector.select(&locations, Utc::now()).await?;
    bar.finish_and_clear();

    let mut candidates: Vec<(String, CandidateEntry)> = candidates.into_iter().collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(candidates)
}
