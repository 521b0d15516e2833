//! Camera locations, read fresh from one or more CSV tables every cycle.
//!
//! Each table is one region. Columns, in order: name, latitude, longitude,
//! stream URL and an optional "not usable" marker. The first row is a header.

use std::path::Path;

use anyhow::{anyhow, Context};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};

use crate::error::{RaincamError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub region: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub url: String,
    pub not_usable: bool,
}

impl Location {
    pub fn from_record(region: &str, record: &StringRecord) -> Self {
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let name = field(0).to_string();
        let latitude = parse_coordinate(&name, "latitude", field(1));
        let longitude = parse_coordinate(&name, "longitude", field(2));
        let url = field(3).to_string();
        let not_usable = field(4).eq_ignore_ascii_case("x");

        Location {
            region: region.to_string(),
            name,
            latitude,
            longitude,
            url,
            not_usable,
        }
    }

    /// Both coordinates, if the row has them.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// Anything that can produce the candidate locations for a cycle.
pub trait LocationSource {
    async fn list_locations(&self) -> Result<Vec<Location>>;
}

/// Local CSV files and/or `http(s)://` CSV exports, one region per table.
#[derive(Debug, Clone)]
pub struct CsvTables {
    tables: Vec<String>,
}

impl CsvTables {
    pub fn new(tables: Vec<String>) -> Self {
        CsvTables { tables }
    }
}

impl LocationSource for CsvTables {
    async fn list_locations(&self) -> Result<Vec<Location>> {
        let mut locations = Vec::new();

        for table in &self.tables {
            let region = region_name(table);
            let text = read_table(table)
                .await
                .map_err(|source| RaincamError::SourceAccess {
                    source_name: table.clone(),
                    source,
                })?;

            let rows = parse_table(&region, &text).map_err(|source| RaincamError::SourceAccess {
                source_name: table.clone(),
                source,
            })?;

            debug!("Region {}: {} location(s)", region, rows.len());
            locations.extend(rows);
        }

        Ok(locations)
    }
}

async fn read_table(table: &str) -> anyhow::Result<String> {
    if is_url(table) {
        let response = reqwest::get(table)
            .await
            .with_context(|| format!("Failed to download {}", table))?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to download {}: {}", table, response.status()));
        }

        Ok(response.text().await?)
    } else {
        tokio::fs::read_to_string(table)
            .await
            .with_context(|| format!("Failed to read {}", table))
    }
}

pub fn parse_table(region: &str, text: &str) -> anyhow::Result<Vec<Location>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut locations = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        locations.push(Location::from_record(region, &record));
    }

    Ok(locations)
}

fn is_url(table: &str) -> bool {
    table.starts_with("http://") || table.starts_with("https://")
}

// Region name: file stem for paths, last path segment for URLs
fn region_name(table: &str) -> String {
    if is_url(table) {
        let path = table.split(['?', '#']).next().unwrap_or(table);
        return path
            .trim_end_matches('/')
            .split('/')
            .last()
            .unwrap_or(table)
            .to_string();
    }

    Path::new(table)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| table.to_string())
}

fn parse_coordinate(name: &str, axis: &str, s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }

    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!("{}: ignoring unparseable {} '{}'", name, axis, s);
            None
        }
    }
}

// -- Tests -------------------------------------------------------------------
