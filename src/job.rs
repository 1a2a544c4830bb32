use crate::config::{ArchiveMode, ListMode, RunConfig};
use crate::links::Link;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Ledger name used when every link shares one download archive.
pub const SHARED_ARCHIVE: &str = "download-archive.txt";

/// Output template, relative to the output directory.
pub const OUTPUT_TEMPLATE: &str =
    "%(uploader)s [%(channel_id)s]/%(upload_date)s - %(title)s [%(id)s].%(ext)s";

/// Subdirectory of the output directory used for partial downloads.
pub const TEMP_SUBDIR: &str = ".tmp";

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("downloader exited with {0}")]
    Exit(ExitStatus),
    #[error("job task aborted: {0}")]
    Aborted(String),
}

pub type JobOutcome = Result<(), JobError>;

/// Whether the downloader should draw its progress output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    Show,
    Hide,
}

impl ProgressMode {
    /// Concurrent jobs would interleave their progress lines, so progress is
    /// hidden only when several links run in parallel.
    pub fn for_cycle(mode: ListMode, link_count: usize) -> Self {
        match mode {
            ListMode::Parallel if link_count > 1 => ProgressMode::Hide,
            _ => ProgressMode::Show,
        }
    }

    fn flag(self) -> &'static str {
        match self {
            ProgressMode::Show => "--progress",
            ProgressMode::Hide => "--no-progress",
        }
    }
}

/// Runs the download for a single link.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, link: &Link, progress: ProgressMode) -> JobOutcome;
}

/// File name of the download archive used for `link`.
pub fn archive_file_name(mode: ArchiveMode, link: &Link) -> String {
    match mode {
        ArchiveMode::Shared => SHARED_ARCHIVE.to_string(),
        ArchiveMode::PerLink => format!("dl-{:x}.txt", md5::compute(link.as_str().as_bytes())),
    }
}

/// Invokes the external downloader with the fixed option set.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    config: Arc<RunConfig>,
}

impl DownloadJob {
    pub fn new(config: Arc<RunConfig>) -> Self {
        Self { config }
    }

    pub fn archive_path(&self, link: &Link) -> PathBuf {
        self.config
            .output_dir
            .join(archive_file_name(self.config.archive, link))
    }

    /// Arguments passed to the downloader for `link`.
    pub fn args(&self, link: &Link, progress: ProgressMode) -> Vec<OsString> {
        let config = &self.config;
        let mut args: Vec<OsString> = [
            "-i",
            "--restrict-filenames",
            "--add-metadata",
            "--write-info-json",
            "--write-description",
            "--write-playlist-metafiles",
            "--video-multistreams",
            "--audio-multistreams",
            "--write-subs",
            "--embed-subs",
            "--embed-chapters",
            "--embed-info-json",
            "--sub-format",
            "best",
            "--sub-langs",
            "all",
            "--remux-video",
            "mkv",
            "-f",
            "bestvideo+bestaudio",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        args.push("--cookies".into());
        args.push(config.cookies.clone().into_os_string());

        args.push("--download-archive".into());
        args.push(self.archive_path(link).into_os_string());

        args.push("--limit-rate".into());
        args.push(config.limit_rate.clone().into());

        if config.limit > 0 {
            args.push("--max-downloads".into());
            args.push(config.limit.to_string().into());
        }

        if let Some(ffmpeg) = config.custom_ffmpeg() {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.into());
        }

        let mut home = OsString::from("home:");
        home.push(config.output_dir.as_os_str());
        let mut temp = OsString::from("temp:");
        temp.push(config.output_dir.join(TEMP_SUBDIR).as_os_str());
        args.extend(["-P".into(), home, "-P".into(), temp]);

        args.push("-o".into());
        args.push(OUTPUT_TEMPLATE.into());

        args.push(progress.flag().into());
        args.push("--".into());
        args.push(link.as_str().into());
        args
    }
}

#[async_trait]
impl JobRunner for DownloadJob {
    async fn run(&self, link: &Link, progress: ProgressMode) -> JobOutcome {
        info!("{} => {}", self.archive_path(link).display(), link);

        let args = self.args(link, progress);
        debug!("{} {:?}", self.config.downloader, args);

        let status = Command::new(&self.config.downloader)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| JobError::Spawn {
                program: self.config.downloader.clone(),
                source,
            })?;

        if !status.success() {
            return Err(JobError::Exit(status));
        }
        Ok(())
    }
}

/// Run one job and log its failure, if any. Failures never propagate.
pub async fn run_logged(runner: &dyn JobRunner, link: &Link, progress: ProgressMode) -> bool {
    match runner.run(link, progress).await {
        Ok(()) => {
            debug!("Finished {}", link);
            true
        }
        Err(e) => {
            error!("Error downloading {}: {}", link, e);
            false
        }
    }
}
