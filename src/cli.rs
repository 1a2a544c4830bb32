use clap::Parser;
use std::path::PathBuf;
use youtuberr::{ArchiveMode, Settings};

#[derive(Parser, Debug)]
#[command(name = "youtuberr")]
#[command(about = "Download every channel and playlist in a link list with yt-dlp")]
#[command(long_about = "
youtuberr reads a list of links (one per line) and runs yt-dlp on each of them
with a fixed set of options: best video+audio remuxed to mkv, embedded metadata,
subtitles and chapters, and a download archive so finished items are skipped
on later runs. It can run once or keep re-running on an interval.

Examples:
  youtuberr                                   # one pass over links.txt
  youtuberr --list-mode parallel --limit 20
  youtuberr --run-once=false --ticker 6h      # re-run every six hours
")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Max items per channel or playlist (0 = unlimited)
    #[arg(long, value_name = "N")]
    pub limit: Option<u32>,

    /// Base directory to download into
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// File to read links from
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Cookie file passed to the downloader
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// How to process the list: serial or parallel
    #[arg(long, value_name = "MODE")]
    pub list_mode: Option<String>,

    /// Run a single cycle and exit
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub run_once: Option<bool>,

    /// Interval between cycles when not running once (e.g. 30m, 1h)
    #[arg(long, value_name = "DURATION")]
    pub ticker: Option<String>,

    /// Download rate cap per job (e.g. 2M, 500K)
    #[arg(long, value_name = "RATE")]
    pub limit_rate: Option<String>,

    /// Keep a separate download archive for every link
    #[arg(long)]
    pub archive_per_link: bool,

    /// Skip the downloader self-update at startup
    #[arg(long)]
    pub no_update: bool,

    /// Downloader program
    #[arg(long, value_name = "PATH")]
    pub downloader: Option<String>,

    /// ffmpeg program
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Validate CLI arguments and show helpful error messages
    pub fn validate(&self) -> Result<(), String> {
        if let Some(rate) = &self.limit_rate {
            if rate.trim().is_empty() {
                return Err("--limit-rate cannot be empty".to_string());
            }
        }
        if let Some(ticker) = &self.ticker {
            if ticker.trim().is_empty() {
                return Err("--ticker cannot be empty".to_string());
            }
        }
        Ok(())
    }

    /// Settings given on the command line, to be layered over the settings file.
    pub fn settings(&self) -> Settings {
        Settings {
            dir: self.dir.clone(),
            input: self.input.clone(),
            cookies: self.cookies.clone(),
            limit: self.limit,
            list_mode: self.list_mode.clone(),
            run_once: self.run_once,
            ticker: self.ticker.clone(),
            limit_rate: self.limit_rate.clone(),
            archive: self.archive_per_link.then_some(ArchiveMode::PerLink),
            downloader: self.downloader.clone(),
            ffmpeg: self.ffmpeg.clone(),
            self_update: self.no_update.then_some(false),
        }
    }
}
