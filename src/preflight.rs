use crate::config::RunConfig;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("required binary '{binary}' could not be started")]
    Missing {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("required binary '{binary}' failed its version probe ({status})")]
    ProbeFailed { binary: String, status: ExitStatus },
    #[error("self-update of '{binary}' failed: {reason}")]
    UpdateFailed { binary: String, reason: String },
}

fn version_flag_for(binary: &str) -> &'static str {
    let name = std::path::Path::new(binary)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(binary);
    match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    }
}

async fn probe(binary: &str) -> Result<(), PreflightError> {
    let flag = version_flag_for(binary);
    debug!("Probing {} {}", binary, flag);

    let status = Command::new(binary)
        .arg(flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|source| PreflightError::Missing {
            binary: binary.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(PreflightError::ProbeFailed {
            binary: binary.to_string(),
            status,
        });
    }
    Ok(())
}

/// Run the downloader's own updater with its output shown live.
async fn self_update(binary: &str) -> Result<(), PreflightError> {
    info!("Updating {}", binary);

    let status = Command::new(binary)
        .arg("-U")
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| PreflightError::UpdateFailed {
            binary: binary.to_string(),
            reason: e.to_string(),
        })?;

    if !status.success() {
        return Err(PreflightError::UpdateFailed {
            binary: binary.to_string(),
            reason: status.to_string(),
        });
    }
    Ok(())
}

/// Make sure ffmpeg and the downloader can be run, then update the downloader.
pub async fn check(config: &RunConfig) -> Result<(), PreflightError> {
    probe(&config.ffmpeg).await?;
    probe(&config.downloader).await?;

    if config.self_update {
        self_update(&config.downloader).await?;
    } else {
        debug!("Self-update disabled, skipping");
    }

    Ok(())
}
