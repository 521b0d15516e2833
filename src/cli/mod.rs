//! Command line interface.

pub mod command;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{command, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    daylight::SolarDaylight,
    download::{
        capture_deadline,
        tools::{DEFAULT_CAPTURE, DEFAULT_RESOLVER},
        DownloadOptions, ToolCommand, Tools,
    },
    error::Result,
    selector::SelectionMode,
    weather::{OpenWeatherMap, OPENWEATHERMAP_URL},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Records livestream clips from outdoor cameras while it rains
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture clips from rainy locations, cycle after cycle
    Watch {
        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        download: DownloadArgs,

        /// Number of extra clips to capture after the weather API says it stopped raining
        #[arg(short, long, default_value_t = 1)]
        extra: u32,
    },
    /// List the locations that would be captured right now
    Scan {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Capture a single clip from one stream
    Capture {
        /// Location name used for the clip file
        name: String,
        /// Livestream page URL
        url: String,

        #[command(flatten)]
        download: DownloadArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Location tables (CSV files or URLs), one per region
    #[arg(short, long, env = "RAINCAM_LOCATIONS", value_delimiter = ',', required = true)]
    pub locations: Vec<String>,

    /// OpenWeatherMap API keys, tried in order
    #[arg(long, env = "API_KEYS", value_delimiter = ',', hide_env_values = true)]
    pub api_keys: Vec<String>,

    /// Don't skip locations where it is currently dark
    #[arg(long)]
    pub no_daylight: bool,

    /// Which locations to capture
    #[arg(long, value_enum, default_value_t = SelectionMode::Rain)]
    pub mode: SelectionMode,

    /// Weather API root
    #[arg(long, env = "OPENWEATHERMAP_URL", default_value = OPENWEATHERMAP_URL, hide = true)]
    pub weather_url: String,
}

impl SelectionArgs {
    /// Fails when no API key is configured.
    pub fn oracle(&self) -> Result<OpenWeatherMap> {
        Ok(OpenWeatherMap::new(self.api_keys.clone())?.with_base_url(&self.weather_url))
    }

    pub fn daylight(&self) -> Option<SolarDaylight> {
        (!self.no_daylight).then(SolarDaylight::new)
    }
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Folder to download videos to
    #[arg(short, long, default_value = "./downloads/")]
    pub downloads_folder: String,

    /// Folder for clips still being captured
    #[arg(long, default_value = "./tmp")]
    pub tmp_dir: PathBuf,

    /// Don't time out and kill the capture tool
    #[arg(short, long)]
    pub no_timeout: bool,

    /// Clip length in seconds
    #[arg(short = 's', long, default_value_t = 120)]
    pub duration: u64,

    /// Stream resolver command
    #[arg(long, env = "RAINCAM_RESOLVER", default_value = DEFAULT_RESOLVER)]
    pub resolver: ToolCommand,

    /// Capture tool command
    #[arg(long, env = "RAINCAM_CAPTURE", default_value = DEFAULT_CAPTURE)]
    pub capture: ToolCommand,
}

impl DownloadArgs {
    pub fn options(&self, weather_folders: bool) -> DownloadOptions {
        let length = Duration::from_secs(self.duration);

        DownloadOptions {
            length,
            tmp_dir: self.tmp_dir.clone(),
            final_dir: expand_home(&self.downloads_folder),
            timeout: (!self.no_timeout).then(|| capture_deadline(length)),
            weather_folders,
        }
    }

    pub fn tools(&self) -> Tools {
        Tools {
            resolver: self.resolver.clone(),
            capture: self.capture.clone(),
        }
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => Path::new(path).to_path_buf(),
    }
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size).with_message(message).with_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("##-"),
    )
}

// -- Tests -------------------------------------------------------------------
