//! Error types shared by the acquisition pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RaincamError {
    /// Every weather credential was tried and none produced a usable answer.
    #[error("Weather oracle unavailable for ({lat}, {lon}): all {keys} credential(s) failed")]
    OracleUnavailable { lat: f64, lon: f64, keys: usize },

    #[error("No weather credentials configured")]
    MissingCredentials,

    #[error("Stream resolver produced no manifest for {location} ({url})")]
    ResolutionFailure { location: String, url: String },

    #[error("Capture for {location} exceeded its deadline and was killed")]
    CaptureTimeout { location: String },

    #[error("Failed to read location table '{source_name}'")]
    SourceAccess {
        source_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not resolve timezone for ({lat}, {lon}): {reason}")]
    Timezone { lat: f64, lon: f64, reason: String },

    #[error("Failed to create directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to move '{from}' to '{to}'")]
    Relocation {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RaincamError>;
