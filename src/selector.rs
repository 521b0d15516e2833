//! Picks the locations worth capturing this cycle.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::{debug, info, warn};

use crate::{
    daylight::DaylightGate,
    error::Result,
    locations::Location,
    weather::WeatherOracle,
};

/// Format selector handed to the stream resolver.
pub const DEFAULT_QUALITY: &str = "best";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    pub url: String,
    pub quality: String,
    pub weather: String,
}

/// Candidates keyed by location name.
pub type Candidates = HashMap<String, CandidateEntry>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SelectionMode {
    /// Capture only locations where it is raining.
    #[default]
    Rain,
    /// Capture every location and tag the clip with its weather.
    Weather,
}

impl SelectionMode {
    /// Clips are filed (and named) by weather category.
    pub fn tags_weather(&self) -> bool {
        matches!(self, SelectionMode::Weather)
    }
}

#[derive(Debug, PartialEq)]
enum Skip {
    Forced,
    NoCoordinates,
    Dark,
    Daylight(String),
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::Forced => write!(f, "SKIP - forced"),
            Skip::NoCoordinates => write!(f, "SKIP - latitude or longitude not specified"),
            Skip::Dark => write!(f, "SKIP - dark"),
            Skip::Daylight(e) => write!(f, "SKIP - daylight unknown ({})", e),
        }
    }
}

pub struct CandidateSelector<'a, O, D> {
    oracle: &'a O,
    daylight: Option<&'a D>,
    mode: SelectionMode,
}

impl<'a, O: WeatherOracle, D: DaylightGate> CandidateSelector<'a, O, D> {
    /// `daylight: None` disables daylight gating.
    pub fn new(oracle: &'a O, daylight: Option<&'a D>, mode: SelectionMode) -> Self {
        CandidateSelector {
            oracle,
            daylight,
            mode,
        }
    }

    /// Fails as a whole when the weather oracle is unavailable.
    pub async fn select(&self, locations: &[Location], now: DateTime<Utc>) -> Result<Candidates> {
        let mut candidates = Candidates::new();
        let mut region = None;

        for location in locations {
            if region != Some(&location.region) {
                debug!("Region: {}", location.region);
                region = Some(&location.region);
            }

            let (lat, lon) = match self.screen(location, now) {
                Ok(coords) => coords,
                Err(Skip::Daylight(e)) => {
                    warn!("{}: {}", location.name, Skip::Daylight(e));
                    continue;
                }
                Err(skip) => {
                    debug!("{}: {}", location.name, skip);
                    continue;
                }
            };

            let weather = match self.mode {
                SelectionMode::Rain => match self.oracle.is_precipitating(lat, lon).await? {
                    true => "rain".to_string(),
                    false => {
                        debug!("{}: SKIP - weather API indicates no rain", location.name);
                        continue;
                    }
                },
                SelectionMode::Weather => self.oracle.classify(lat, lon).await?,
            };

            info!("{}: DOWNLOAD - weather API indicates {}", location.name, weather);
            candidates.insert(
                location.name.clone(),
                CandidateEntry {
                    url: location.url.clone(),
                    quality: DEFAULT_QUALITY.to_string(),
                    weather,
                },
            );
        }

        Ok(candidates)
    }

    fn screen(&self, location: &Location, now: DateTime<Utc>) -> std::result::Result<(f64, f64), Skip> {
        if location.not_usable {
            return Err(Skip::Forced);
        }

        let (lat, lon) = location.coordinates().ok_or(Skip::NoCoordinates)?;

        if let Some(daylight) = self.daylight {
            match daylight.is_daylight(lat, lon, now) {
                Ok(true) => {}
                Ok(false) => return Err(Skip::Dark),
                Err(e) => return Err(Skip::Daylight(e.to_string())),
            }
        }

        Ok((lat, lon))
    }
}

// -- Tests -------------------------------------------------------------------
