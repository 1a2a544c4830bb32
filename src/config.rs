use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid ticker interval '{0}' (expected e.g. 90s, 30m, 1h30m)")]
    InvalidTicker(String),
    #[error("{0}")]
    Invalid(String),
}

/// How the links of one cycle are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    #[default]
    Serial,
    Parallel,
}

impl ListMode {
    /// Parse a mode name, falling back to serial for anything unrecognized.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "serial" => ListMode::Serial,
            "parallel" => ListMode::Parallel,
            other => {
                warn!("Unknown list mode '{}', falling back to serial", other);
                ListMode::Serial
            }
        }
    }
}

impl fmt::Display for ListMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListMode::Serial => write!(f, "serial"),
            ListMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Where the downloader keeps its record of already fetched items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveMode {
    /// One ledger shared by every link.
    #[default]
    Shared,
    /// One ledger per link, named after the link's md5 digest.
    PerLink,
}

/// Raw, layered settings. Every field is optional so that a settings file
/// and the command line can each fill in only what they care about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dir: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub cookies: Option<PathBuf>,
    pub limit: Option<u32>,
    pub list_mode: Option<String>,
    pub run_once: Option<bool>,
    pub ticker: Option<String>,
    pub limit_rate: Option<String>,
    pub archive: Option<ArchiveMode>,
    pub downloader: Option<String>,
    pub ffmpeg: Option<String>,
    pub self_update: Option<bool>,
}

fn default_dir() -> PathBuf {
    PathBuf::from("./dl-youtuberr")
}
fn default_input() -> PathBuf {
    PathBuf::from("links.txt")
}
fn default_cookies() -> PathBuf {
    PathBuf::from("cookies.txt")
}
fn default_ticker() -> Duration {
    Duration::from_secs(60 * 60)
}
fn default_limit_rate() -> String {
    "2M".to_string()
}
fn default_downloader() -> String {
    "yt-dlp".to_string()
}
fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

impl Settings {
    /// Default location of the settings file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "youtuberr").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load settings from an explicit file, or from the default location.
    ///
    /// An explicitly named file must exist. The default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No settings file found, using built-in defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Layer `other` on top of `self`; values present in `other` win.
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            dir: other.dir.or(self.dir),
            input: other.input.or(self.input),
            cookies: other.cookies.or(self.cookies),
            limit: other.limit.or(self.limit),
            list_mode: other.list_mode.or(self.list_mode),
            run_once: other.run_once.or(self.run_once),
            ticker: other.ticker.or(self.ticker),
            limit_rate: other.limit_rate.or(self.limit_rate),
            archive: other.archive.or(self.archive),
            downloader: other.downloader.or(self.downloader),
            ffmpeg: other.ffmpeg.or(self.ffmpeg),
            self_update: other.self_update.or(self.self_update),
        }
    }

    /// Fill in defaults and produce the immutable configuration for a run.
    pub fn resolve(self) -> Result<RunConfig, ConfigError> {
        let ticker = match self.ticker.as_deref() {
            Some(raw) => parse_duration(raw)?,
            None => default_ticker(),
        };

        let config = RunConfig {
            output_dir: self.dir.unwrap_or_else(default_dir),
            input: self.input.unwrap_or_else(default_input),
            cookies: self.cookies.unwrap_or_else(default_cookies),
            limit: self.limit.unwrap_or(0),
            list_mode: self
                .list_mode
                .as_deref()
                .map(ListMode::parse_lenient)
                .unwrap_or_default(),
            run_once: self.run_once.unwrap_or(true),
            ticker,
            limit_rate: self.limit_rate.unwrap_or_else(default_limit_rate),
            archive: self.archive.unwrap_or_default(),
            downloader: self.downloader.unwrap_or_else(default_downloader),
            ffmpeg: self.ffmpeg.unwrap_or_else(default_ffmpeg),
            self_update: self.self_update.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Options resolved once at startup and shared read-only by every job.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    pub input: PathBuf,
    pub cookies: PathBuf,
    /// Maximum items per channel or playlist, 0 for no cap.
    pub limit: u32,
    pub list_mode: ListMode,
    pub run_once: bool,
    pub ticker: Duration,
    pub limit_rate: String,
    pub archive: ArchiveMode,
    pub downloader: String,
    pub ffmpeg: String,
    pub self_update: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: default_dir(),
            input: default_input(),
            cookies: default_cookies(),
            limit: 0,
            list_mode: ListMode::Serial,
            run_once: true,
            ticker: default_ticker(),
            limit_rate: default_limit_rate(),
            archive: ArchiveMode::Shared,
            downloader: default_downloader(),
            ffmpeg: default_ffmpeg(),
            self_update: true,
        }
    }
}

impl RunConfig {
    /// The ffmpeg program when it is not the one found on PATH.
    pub fn custom_ffmpeg(&self) -> Option<&str> {
        (self.ffmpeg != default_ffmpeg()).then_some(self.ffmpeg.as_str())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticker.is_zero() {
            return Err(ConfigError::InvalidTicker("0".to_string()));
        }
        if self.limit_rate.trim().is_empty() {
            return Err(ConfigError::Invalid("limit-rate cannot be empty".to_string()));
        }
        if self.downloader.trim().is_empty() {
            return Err(ConfigError::Invalid("downloader program cannot be empty".to_string()));
        }
        if self.ffmpeg.trim().is_empty() {
            return Err(ConfigError::Invalid("ffmpeg program cannot be empty".to_string()));
        }
        Ok(())
    }
}

static DURATION_FULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+(?:\.\d+)?(?:ms|h|m|s))+$").expect("valid regex"));
static DURATION_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)(ms|h|m|s)").expect("valid regex"));

/// Parse a Go-style duration such as `90s`, `30m`, `1h30m` or `1.5h`.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    let value = raw.trim();
    if !DURATION_FULL.is_match(value) {
        return Err(ConfigError::InvalidTicker(raw.to_string()));
    }

    let mut secs = 0f64;
    for part in DURATION_PART.captures_iter(value) {
        let amount: f64 = part[1]
            .parse()
            .map_err(|_| ConfigError::InvalidTicker(raw.to_string()))?;
        secs += match &part[2] {
            "h" => amount * 3600.0,
            "m" => amount * 60.0,
            "s" => amount,
            _ => amount / 1000.0,
        };
    }

    let duration = Duration::try_from_secs_f64(secs)
        .map_err(|_| ConfigError::InvalidTicker(raw.to_string()))?;
    if duration.is_zero() {
        return Err(ConfigError::InvalidTicker(raw.to_string()));
    }
    Ok(duration)
}
