//! Current-weather lookups against the OpenWeatherMap API.
//!
//! Several API keys can be configured. They are tried in order for every
//! request and the first successful answer wins.

use anyhow::Context;
use log::warn;
use serde::Deserialize;

use crate::error::{RaincamError, Result};

pub const OPENWEATHERMAP_URL: &str = "https://api.openweathermap.org";

/// What the oracle saw at a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub precipitating: bool,
    /// Lowercased weather group, e.g. `rain`, `clouds`, `clear`.
    pub category: String,
}

pub trait WeatherOracle {
    async fn observe(&self, lat: f64, lon: f64) -> Result<Observation>;

    async fn classify(&self, lat: f64, lon: f64) -> Result<String> {
        Ok(self.observe(lat, lon).await?.category)
    }

    async fn is_precipitating(&self, lat: f64, lon: f64) -> Result<bool> {
        Ok(self.observe(lat, lon).await?.precipitating)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    weather: Vec<Condition>,
    rain: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    main: String,
}

impl From<CurrentWeather> for Observation {
    fn from(current: CurrentWeather) -> Self {
        let category = current
            .weather
            .first()
            .map(|c| c.main.to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());

        Observation {
            precipitating: current.rain.is_some(),
            category,
        }
    }
}

pub struct OpenWeatherMap {
    client: reqwest::Client,
    base_url: String,
    api_keys: Vec<String>,
}

impl OpenWeatherMap {
    pub fn new(api_keys: Vec<String>) -> Result<Self> {
        let api_keys: Vec<String> = api_keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if api_keys.is_empty() {
            return Err(RaincamError::MissingCredentials);
        }

        Ok(OpenWeatherMap {
            client: reqwest::Client::new(),
            base_url: OPENWEATHERMAP_URL.to_string(),
            api_keys,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn observe_with_key(&self, lat: f64, lon: f64, api_key: &str) -> anyhow::Result<Observation> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await
            .context("Weather request failed")?
            .error_for_status()?;

        let current: CurrentWeather = response
            .json()
            .await
            .context("Unexpected weather response")?;

        Ok(current.into())
    }
}

impl WeatherOracle for OpenWeatherMap {
    async fn observe(&self, lat: f64, lon: f64) -> Result<Observation> {
        for (i, api_key) in self.api_keys.iter().enumerate() {
            match self.observe_with_key(lat, lon, api_key).await {
                Ok(observation) => return Ok(observation),
                Err(e) => warn!(
                    "Weather credential #{} failed for ({}, {}): {:#}",
                    i + 1,
                    lat,
                    lon,
                    e
                ),
            }
        }

        Err(RaincamError::OracleUnavailable {
            lat,
            lon,
            keys: self.api_keys.len(),
        })
    }
}

// -- Tests -------------------------------------------------------------------
